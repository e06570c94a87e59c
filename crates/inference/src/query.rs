//! Queries, their results, and the `query.pl` artifact.
//!
//! Users and movies appear in programs as the constants `user<ID>` and
//! `movie<ID>`; a query asks for the probability of `likes(user<ID>, movie<ID>)`.

use crate::error::{InferenceError, Result};
use crate::syntax::{Atom, Program, Term};
use data_loader::{MovieId, UserId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Predicate every query asks about
pub const LIKES: &str = "likes";

/// File name of the query artifact
pub const QUERY_FILE: &str = "query.pl";

/// Program constant naming a user
pub fn user_term(id: UserId) -> String {
    format!("user{}", id)
}

/// Program constant naming a movie
pub fn movie_term(id: MovieId) -> String {
    format!("movie{}", id)
}

fn parse_id(term: &Term, prefix: &str) -> Option<u32> {
    match term {
        Term::Const(c) => c.strip_prefix(prefix)?.parse().ok(),
        Term::Var(_) => None,
    }
}

/// A (user, item) pair to be scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Query {
    pub user_id: UserId,
    pub movie_id: MovieId,
}

impl Query {
    pub fn new(user_id: UserId, movie_id: MovieId) -> Self {
        Self { user_id, movie_id }
    }

    /// The goal atom `likes(user<ID>, movie<ID>)`
    pub fn to_atom(&self) -> Atom {
        let user = user_term(self.user_id);
        let movie = movie_term(self.movie_id);
        Atom::ground(LIKES, &[user.as_str(), movie.as_str()])
    }

    /// The directive `query(likes(user<ID>, movie<ID>)).`
    pub fn to_clause(&self) -> String {
        format!("query({}).", self.to_atom())
    }

    /// Recover a query from a `likes(user<ID>, movie<ID>)` atom
    pub fn from_atom(atom: &Atom) -> Option<Query> {
        if atom.predicate != LIKES || atom.arity() != 2 {
            return None;
        }
        Some(Query {
            user_id: parse_id(&atom.args[0], "user")?,
            movie_id: parse_id(&atom.args[1], "movie")?,
        })
    }
}

/// Probability returned by an engine for one query.
///
/// `probability` is `None` when the engine could not resolve the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilisticResult {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub probability: Option<f64>,
}

impl ProbabilisticResult {
    pub fn resolved(query: Query, probability: f64) -> Self {
        Self {
            user_id: query.user_id,
            movie_id: query.movie_id,
            probability: Some(probability),
        }
    }

    pub fn unresolved(query: Query) -> Self {
        Self {
            user_id: query.user_id,
            movie_id: query.movie_id,
            probability: None,
        }
    }

    pub fn query(&self) -> Query {
        Query::new(self.user_id, self.movie_id)
    }
}

/// Write one `query(...)` directive per line to `<dir>/query.pl`
pub fn write_query_file(dir: &Path, queries: &[Query]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut text = String::with_capacity(queries.len() * 36);
    for query in queries {
        text.push_str(&query.to_clause());
        text.push('\n');
    }
    fs::write(dir.join(QUERY_FILE), text)
}

/// Parse query directives from text, keeping their order.
///
/// Any non-query clause, or a query that is not a `likes(user, movie)`
/// atom, is an error.
pub fn parse_queries(text: &str) -> Result<Vec<Query>> {
    let program = Program::parse(text)?;
    if let Some(clause) = program.clauses.first() {
        return Err(InferenceError::Parse {
            line: 0,
            reason: format!("expected only query directives, found `{}`", clause.head),
        });
    }
    program
        .queries
        .iter()
        .map(|atom| {
            Query::from_atom(atom).ok_or_else(|| InferenceError::Parse {
                line: 0,
                reason: format!("`{}` is not a likes(user, movie) query", atom),
            })
        })
        .collect()
}
