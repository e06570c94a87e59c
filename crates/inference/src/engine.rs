//! The `InferenceEngine` seam and the default in-process engine.
//!
//! `TopDownEngine` evaluates ground queries by backward chaining under the
//! independence assumption:
//!
//! 1. **Conjunction**: P(A ∧ B) = P(A) × P(B)
//! 2. **Alternatives**: every fact and every ground rule instance deriving a
//!    goal is an independent choice, combined as P(A ∨ B) = P(A) + P(B) - P(A)P(B)
//! 3. **Rule weight**: a ground instance contributes weight × P(body)
//!
//! Variables that occur only in a rule body are enumerated from the facts
//! and rule heads that match them. A goal that is already being proved
//! contributes only its fact probability (cycle cut), so mutually derived
//! preferences such as `a :- b` and `b :- a` still see each other's
//! observed evidence.
//!
//! Rules are looked up through an index on the constants of their heads.
//! Goals derived by rules are grouped by subject, their first argument
//! (the user of `prefers(user1, comedy)`): the first query touching a
//! subject solves all of that subject's rule-derived goals in sorted order
//! and tables them for the rest of the batch. Everything else is memoised
//! per query. A query's result therefore never depends on which other
//! queries share its batch, or on their order.

use crate::error::{InferenceError, Result};
use crate::query::{ProbabilisticResult, Query};
use crate::syntax::{Atom, Clause, Program, Substitution, Term, unify};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument};

/// Evaluates a compiled program against a batch of queries.
///
/// Implementations must be shareable across worker threads. Results may
/// come back in any order and may omit queries; callers join on
/// (user, movie).
pub trait InferenceEngine: Send + Sync {
    /// Returns the name of this engine (for logging/debugging)
    fn name(&self) -> &str;

    /// Evaluate `queries` against `program` text.
    ///
    /// # Returns
    /// * `Ok(results)` - one entry per query the engine looked at
    /// * `Err` - the program or the evaluation failed as a whole
    fn evaluate(&self, program: &str, queries: &[Query]) -> Result<Vec<ProbabilisticResult>>;
}

/// Combine two independent alternatives
fn noisy_or(a: f64, b: f64) -> f64 {
    a + b - a * b
}

/// Rule head key: predicate plus, per argument, its constant or `None`
/// for a variable
type HeadKey = (String, Vec<Option<String>>);

/// Heads with more arguments than this are looked up by predicate only
const MAX_INDEXED_ARITY: usize = 8;

fn head_key(predicate: &str, args: impl Iterator<Item = Option<String>>) -> HeadKey {
    (predicate.to_string(), args.collect())
}

/// The first argument of an atom when it is a constant (a user for
/// `prefers` and `likes`)
fn subject_of(atom: &Atom) -> Option<&str> {
    match atom.args.first() {
        Some(Term::Const(c)) => Some(c.as_str()),
        _ => None,
    }
}

/// Indexed, read-only view of a parsed program
pub struct KnowledgeBase {
    /// Ground facts with their probability
    facts: HashMap<Atom, f64>,
    /// Facts grouped by (predicate, arity, first argument)
    facts_by_key: HashMap<(String, usize, Option<String>), Vec<Atom>>,
    rules: Vec<Clause>,
    /// Rule positions grouped by the constants of their head
    rules_by_head: HashMap<HeadKey, Vec<usize>>,
    /// Rule positions grouped by (predicate, arity) of their head
    rules_by_predicate: HashMap<(String, usize), Vec<usize>>,
    /// Distinct rule heads per (predicate, arity), sorted
    heads: HashMap<(String, usize), Vec<Atom>>,
}

impl KnowledgeBase {
    pub fn new(program: Program) -> Self {
        let mut kb = Self {
            facts: HashMap::new(),
            facts_by_key: HashMap::new(),
            rules: Vec::new(),
            rules_by_head: HashMap::new(),
            rules_by_predicate: HashMap::new(),
            heads: HashMap::new(),
        };

        let mut heads: HashMap<(String, usize), BTreeSet<Atom>> = HashMap::new();
        for clause in program.clauses {
            if clause.is_fact() {
                kb.add_fact(clause.head, clause.weight);
                continue;
            }
            let idx = kb.rules.len();
            let head = &clause.head;
            let key = head_key(
                &head.predicate,
                head.args.iter().map(|t| match t {
                    Term::Const(c) => Some(c.clone()),
                    Term::Var(_) => None,
                }),
            );
            kb.rules_by_head.entry(key).or_default().push(idx);
            kb.rules_by_predicate
                .entry((head.predicate.clone(), head.arity()))
                .or_default()
                .push(idx);
            heads
                .entry((head.predicate.clone(), head.arity()))
                .or_default()
                .insert(head.clone());
            kb.rules.push(clause);
        }
        kb.heads = heads
            .into_iter()
            .map(|(key, set)| (key, set.into_iter().collect()))
            .collect();
        kb
    }

    fn add_fact(&mut self, fact: Atom, weight: f64) {
        match self.facts.get_mut(&fact) {
            // Repeated probabilistic facts are independent alternatives
            Some(existing) => *existing = noisy_or(*existing, weight),
            None => {
                for key in Self::fact_keys(&fact) {
                    self.facts_by_key.entry(key).or_default().push(fact.clone());
                }
                self.facts.insert(fact, weight);
            }
        }
    }

    /// A fact is indexed under its first argument and under "any"
    fn fact_keys(fact: &Atom) -> [(String, usize, Option<String>); 2] {
        let first = subject_of(fact).map(str::to_string);
        [
            (fact.predicate.clone(), fact.arity(), first),
            (fact.predicate.clone(), fact.arity(), None),
        ]
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Positions of the rules whose head can match the ground `goal`, in
    /// program order
    fn rules_matching(&self, goal: &Atom) -> Vec<usize> {
        let arity = goal.arity();
        if arity > MAX_INDEXED_ARITY {
            return self
                .rules_by_predicate
                .get(&(goal.predicate.clone(), arity))
                .cloned()
                .unwrap_or_default();
        }

        // Every head that matches has, at each position, either a variable
        // or the goal's constant
        let mut out = Vec::new();
        for mask in 0..(1usize << arity) {
            let key = head_key(
                &goal.predicate,
                goal.args.iter().enumerate().map(|(i, t)| match t {
                    Term::Const(c) if mask & (1 << i) != 0 => Some(c.clone()),
                    _ => None,
                }),
            );
            if let Some(indices) = self.rules_by_head.get(&key) {
                out.extend_from_slice(indices);
            }
        }
        out.sort_unstable();
        out
    }

    fn has_rules_for(&self, goal: &Atom) -> bool {
        self.heads.contains_key(&(goal.predicate.clone(), goal.arity()))
    }

    /// Ground atoms that could match a partially bound pattern
    fn candidates(&self, pattern: &Atom) -> Vec<Atom> {
        let first = subject_of(pattern).map(str::to_string);
        let key = (pattern.predicate.clone(), pattern.arity(), first);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for fact in self.facts_by_key.get(&key).into_iter().flatten() {
            if unify(pattern, fact, Substitution::new()).is_some() && seen.insert(fact.clone()) {
                out.push(fact.clone());
            }
        }
        let heads = self.heads.get(&(pattern.predicate.clone(), pattern.arity()));
        for head in heads.into_iter().flatten() {
            let head = head.rename("'");
            if let Some(subst) = unify(pattern, &head, Substitution::new()) {
                let instance = head.substitute(&subst);
                if instance.is_ground() && seen.insert(instance.clone()) {
                    out.push(instance);
                }
            }
        }
        out
    }

    /// Ground instances of the rule heads once their first argument is
    /// bound to `subject`, sorted
    fn subject_goals(&self, subject: &str) -> Vec<Atom> {
        let mut goals = BTreeSet::new();
        for head in self.heads.values().flatten() {
            let bound = match head.args.first() {
                Some(Term::Const(c)) if c == subject => head.clone(),
                Some(Term::Var(v)) => {
                    let mut subst = Substitution::new();
                    subst.insert(v.clone(), Term::Const(subject.to_string()));
                    head.substitute(&subst)
                }
                _ => continue,
            };
            if bound.is_ground() {
                goals.insert(bound);
            }
        }
        goals.into_iter().collect()
    }
}

/// Rule-derived goals already solved, grouped by subject.
///
/// The first time a query needs a rule-derived goal of some subject, every
/// rule-derived goal of that subject is solved in sorted order with one
/// shared memo, and the results are kept for the lifetime of the
/// knowledge base. Those values depend only on the program and the
/// subject, never on the queries that happened to come first.
#[derive(Default)]
struct Table {
    values: HashMap<Atom, f64>,
    closed: HashSet<String>,
}

impl Table {
    fn lookup(&mut self, kb: &KnowledgeBase, goal: &Atom, max_depth: usize) -> Result<Option<f64>> {
        if let Some(&p) = self.values.get(goal) {
            return Ok(Some(p));
        }
        let Some(subject) = subject_of(goal) else {
            return Ok(None);
        };
        if self.closed.contains(subject) || !kb.has_rules_for(goal) {
            return Ok(None);
        }

        self.close(kb, subject, max_depth)?;
        Ok(self.values.get(goal).copied())
    }

    fn close(&mut self, kb: &KnowledgeBase, subject: &str, max_depth: usize) -> Result<()> {
        self.closed.insert(subject.to_string());

        let goals = kb.subject_goals(subject);
        let mut solver = Solver::new(kb, max_depth, None);
        for goal in &goals {
            solver.probability(goal)?;
        }
        for (atom, p) in solver.memo {
            if subject_of(&atom) == Some(subject) {
                self.values.insert(atom, p);
            }
        }
        debug!("Tabled {} goals for {}", goals.len(), subject);
        Ok(())
    }
}

/// Proof search state for one query (or for closing one subject)
struct Solver<'kb, 't> {
    kb: &'kb KnowledgeBase,
    memo: HashMap<Atom, f64>,
    stack: HashSet<Atom>,
    max_depth: usize,
    table: Option<&'t mut Table>,
}

impl<'kb, 't> Solver<'kb, 't> {
    fn new(kb: &'kb KnowledgeBase, max_depth: usize, table: Option<&'t mut Table>) -> Self {
        Self {
            kb,
            memo: HashMap::new(),
            stack: HashSet::new(),
            max_depth,
            table,
        }
    }

    /// Probability of a ground goal
    fn probability(&mut self, goal: &Atom) -> Result<f64> {
        if let Some(&p) = self.memo.get(goal) {
            return Ok(p);
        }
        if let Some(table) = self.table.as_deref_mut() {
            if let Some(p) = table.lookup(self.kb, goal, self.max_depth)? {
                return Ok(p);
            }
        }
        if self.stack.contains(goal) {
            return Ok(self.kb.facts.get(goal).copied().unwrap_or(0.0));
        }
        if self.stack.len() >= self.max_depth {
            return Err(InferenceError::DepthExceeded(self.max_depth));
        }

        self.stack.insert(goal.clone());
        let mut total = self.kb.facts.get(goal).copied().unwrap_or(0.0);

        let kb = self.kb;
        for idx in kb.rules_matching(goal) {
            let rule = &kb.rules[idx];
            let Some(subst) = unify(&rule.head, goal, Substitution::new()) else {
                continue;
            };
            let mut instances = Vec::new();
            self.solve_body(&rule.body, subst, 1.0, &mut instances)?;
            for body_probability in instances {
                total = noisy_or(total, rule.weight * body_probability);
            }
        }

        self.stack.remove(goal);
        self.memo.insert(goal.clone(), total);
        Ok(total)
    }

    /// Enumerate ground instances of `body`, pushing the probability of each
    /// complete instance into `out`.
    fn solve_body(
        &mut self,
        body: &[Atom],
        subst: Substitution,
        acc: f64,
        out: &mut Vec<f64>,
    ) -> Result<()> {
        let Some((first, rest)) = body.split_first() else {
            out.push(acc);
            return Ok(());
        };

        let atom = first.substitute(&subst);
        if atom.is_ground() {
            let p = self.probability(&atom)?;
            if p > 0.0 {
                self.solve_body(rest, subst, acc * p, out)?;
            }
            return Ok(());
        }

        for candidate in self.kb.candidates(&atom) {
            let Some(extended) = unify(&atom, &candidate, subst.clone()) else {
                continue;
            };
            let p = self.probability(&candidate)?;
            if p > 0.0 {
                self.solve_body(rest, extended, acc * p, out)?;
            }
        }
        Ok(())
    }
}

/// Default in-process engine (see module docs for the semantics)
#[derive(Debug, Clone)]
pub struct TopDownEngine {
    max_depth: usize,
}

impl TopDownEngine {
    pub fn new() -> Self {
        Self { max_depth: 64 }
    }

    /// Configure the maximum proof depth (default: 64)
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Probability of one ground goal against an already indexed program
    pub fn query_probability(&self, kb: &KnowledgeBase, goal: &Atom) -> Result<Option<f64>> {
        self.solve(kb, &mut Table::default(), goal)
    }

    fn solve(&self, kb: &KnowledgeBase, table: &mut Table, goal: &Atom) -> Result<Option<f64>> {
        if !goal.is_ground() {
            return Ok(None);
        }
        Solver::new(kb, self.max_depth, Some(table))
            .probability(goal)
            .map(Some)
    }
}

impl Default for TopDownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for TopDownEngine {
    fn name(&self) -> &str {
        "TopDownEngine"
    }

    #[instrument(skip(self, program, queries), fields(queries = queries.len()))]
    fn evaluate(&self, program: &str, queries: &[Query]) -> Result<Vec<ProbabilisticResult>> {
        let kb = KnowledgeBase::new(Program::parse(program)?);
        debug!(
            "Loaded program with {} facts and {} rules",
            kb.fact_count(),
            kb.rule_count()
        );

        let mut table = Table::default();
        queries
            .iter()
            .map(|query| {
                let result = match self.solve(&kb, &mut table, &query.to_atom())? {
                    Some(p) => ProbabilisticResult::resolved(*query, p),
                    None => ProbabilisticResult::unresolved(*query),
                };
                Ok(result)
            })
            .collect()
    }
}
