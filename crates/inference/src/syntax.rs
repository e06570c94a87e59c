//! Clause model and parser for the rule-file syntax.
//!
//! ```text
//! 0.9::likes(U, M) :- prefers(U, G), has_genre(M, G), has_1_genre(M).
//! 0.5::prefers(U, romance) :- prefers(U, comedy).
//! prefers(user1, comedy).
//! 0.3::rated(user1, movie7).
//! query(likes(user1, movie7)).
//! % comment
//! ```
//!
//! Identifiers starting with an uppercase letter or `_` are variables,
//! everything else is a constant. Clauses may span several lines; a clause
//! ends at a `.` that is not inside parentheses and not part of a number.

use crate::error::{InferenceError, Result};
use std::collections::HashMap;
use std::fmt;

/// A term inside an atom
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Var(String),
    Const(String),
}

impl Term {
    fn parse(s: &str) -> Term {
        let s = s.trim();
        match s.chars().next() {
            Some(c) if c.is_ascii_uppercase() || c == '_' => Term::Var(s.to_string()),
            _ => Term::Const(s.to_string()),
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, Term::Const(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => f.write_str(v),
            Term::Const(c) => f.write_str(c),
        }
    }
}

/// Variable bindings built up during unification
pub type Substitution = HashMap<String, Term>;

/// A predicate applied to a list of terms, e.g. `has_genre(movie1, comedy)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    pub predicate: String,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    /// Shorthand for an atom whose arguments are all constants
    pub fn ground(predicate: impl Into<String>, args: &[&str]) -> Self {
        Self::new(
            predicate,
            args.iter().map(|a| Term::Const(a.to_string())).collect(),
        )
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }

    /// Replace every bound variable by its value
    pub fn substitute(&self, subst: &Substitution) -> Atom {
        Atom {
            predicate: self.predicate.clone(),
            args: self.args.iter().map(|t| resolve(t, subst)).collect(),
        }
    }

    /// Copy of this atom with every variable renamed by `suffix`
    pub fn rename(&self, suffix: &str) -> Atom {
        Atom {
            predicate: self.predicate.clone(),
            args: self
                .args
                .iter()
                .map(|t| match t {
                    Term::Var(v) => Term::Var(format!("{}{}", v, suffix)),
                    c => c.clone(),
                })
                .collect(),
        }
    }

    fn parse(text: &str, line: usize) -> Result<Atom> {
        let text = text.trim();
        let parse_err = |reason: &str| InferenceError::Parse {
            line,
            reason: format!("{} in `{}`", reason, text),
        };

        let Some(open) = text.find('(') else {
            if text.is_empty() || !is_identifier(text) {
                return Err(parse_err("expected an atom"));
            }
            return Ok(Atom::new(text, Vec::new()));
        };
        if !text.ends_with(')') {
            return Err(parse_err("unbalanced parentheses"));
        }
        let predicate = text[..open].trim();
        if !is_identifier(predicate) {
            return Err(parse_err("invalid predicate name"));
        }
        let inner = &text[open + 1..text.len() - 1];
        let args = split_top_level(inner, ',')
            .into_iter()
            .map(|arg| {
                if arg.trim().is_empty() || arg.contains('(') {
                    Err(parse_err("invalid argument"))
                } else {
                    Ok(Term::parse(arg))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Atom::new(predicate, args))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.predicate)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

/// Follow variable bindings until reaching a constant or an unbound variable
pub fn resolve(term: &Term, subst: &Substitution) -> Term {
    let mut current = term;
    while let Term::Var(v) = current {
        match subst.get(v) {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }
    current.clone()
}

/// Unify two atoms under an existing substitution.
///
/// Returns the extended substitution, or `None` if the atoms do not unify.
pub fn unify(a: &Atom, b: &Atom, mut subst: Substitution) -> Option<Substitution> {
    if a.predicate != b.predicate || a.arity() != b.arity() {
        return None;
    }
    for (x, y) in a.args.iter().zip(&b.args) {
        match (resolve(x, &subst), resolve(y, &subst)) {
            (Term::Const(c1), Term::Const(c2)) => {
                if c1 != c2 {
                    return None;
                }
            }
            (Term::Var(v1), Term::Var(v2)) if v1 == v2 => {}
            (Term::Var(v), t) | (t, Term::Var(v)) => {
                subst.insert(v, t);
            }
        }
    }
    Some(subst)
}

/// A weighted rule or fact. Facts have an empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub weight: f64,
    pub head: Atom,
    pub body: Vec<Atom>,
}

impl Clause {
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

/// A parsed program: clauses plus any `query(...)` directives it contains
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub clauses: Vec<Clause>,
    pub queries: Vec<Atom>,
}

impl Program {
    /// Parse program text into clauses and query directives
    pub fn parse(text: &str) -> Result<Program> {
        let mut program = Program::default();
        for (line, statement) in statements(text)? {
            if let Some(inner) = statement
                .strip_prefix("query(")
                .and_then(|s| s.strip_suffix(')'))
            {
                program.queries.push(Atom::parse(inner, line)?);
                continue;
            }
            program.clauses.push(parse_clause(&statement, line)?);
        }
        Ok(program)
    }
}

fn parse_clause(statement: &str, line: usize) -> Result<Clause> {
    let (weight, rest) = match statement.split_once("::") {
        Some((w, rest)) => {
            let weight: f64 = w.trim().parse().map_err(|_| InferenceError::Parse {
                line,
                reason: format!("invalid weight `{}`", w.trim()),
            })?;
            if !(0.0..=1.0).contains(&weight) {
                return Err(InferenceError::InvalidProbability {
                    line,
                    value: weight,
                });
            }
            (weight, rest)
        }
        None => (1.0, statement),
    };

    let (head, body) = match rest.split_once(":-") {
        Some((head, body)) => {
            let body = split_top_level(body, ',')
                .into_iter()
                .map(|a| Atom::parse(a, line))
                .collect::<Result<Vec<_>>>()?;
            if body.is_empty() {
                return Err(InferenceError::Parse {
                    line,
                    reason: "rule with empty body".to_string(),
                });
            }
            (Atom::parse(head, line)?, body)
        }
        None => (Atom::parse(rest, line)?, Vec::new()),
    };

    if body.is_empty() && !head.is_ground() {
        return Err(InferenceError::Parse {
            line,
            reason: format!("fact `{}` is not ground", head),
        });
    }
    Ok(Clause { weight, head, body })
}

/// Split program text into `(line, statement)` pairs with the final `.`
/// removed. `line` is where the statement starts. Text after the last `.`
/// is an unterminated statement and fails the parse.
fn statements(text: &str) -> Result<Vec<(usize, String)>> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut start_line = 1;
    let mut depth = 0usize;

    for (idx, raw) in text.lines().enumerate() {
        let line = match raw.find('%') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let chars: Vec<char> = line.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '.' if depth == 0 => {
                    let next_is_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                    let prev_is_digit = i > 0 && chars[i - 1].is_ascii_digit();
                    if !(prev_is_digit && next_is_digit) && !(current.trim().is_empty() && next_is_digit) {
                        let statement = current.trim().to_string();
                        if !statement.is_empty() {
                            out.push((start_line, statement));
                        }
                        current.clear();
                        continue;
                    }
                }
                _ => {}
            }
            if current.trim().is_empty() && !c.is_whitespace() {
                start_line = idx + 1;
            }
            current.push(c);
        }
        current.push(' ');
    }

    let rest = current.trim();
    if !rest.is_empty() {
        return Err(InferenceError::Parse {
            line: start_line,
            reason: format!("unterminated statement `{}`", rest),
        });
    }
    Ok(out)
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if !s[start..].trim().is_empty() {
        parts.push(&s[start..]);
    }
    parts
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}
