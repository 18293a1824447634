//! The knowledge base: one fact set per declared term, and pattern
//! queries over it.

use std::collections::btree_set;
use std::collections::{BTreeMap, BTreeSet};

use acs_core::Policy;

use crate::error::EvalError;
use crate::value::Value;

/// One concrete fact: a tuple whose length is the term's arity.
pub type Fact = Vec<Value>;

/// One position of a query pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Matches facts holding exactly this value.
    Value(Value),
    /// Matches anything and reports the matched value (`_`).
    Placeholder,
    /// Matches anything without reporting it (`X`).
    Wildcard,
}

impl Slot {
    fn admits(&self, v: &Value) -> bool {
        match self {
            Slot::Value(expected) => expected == v,
            Slot::Placeholder | Slot::Wildcard => true,
        }
    }
}

/// The outcome of asking a term about a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer<M> {
    /// The pattern had no placeholders: does any fact match?
    Holds(bool),
    /// The pattern had placeholders: the reported values.
    Matches(M),
}

/// A declared relation and its facts.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    name: String,
    arity: usize,
    facts: BTreeSet<Fact>,
}

impl Term {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Term {
            name: name.into(),
            arity,
            facts: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn facts(&self) -> &BTreeSet<Fact> {
        &self.facts
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn contains(&self, fact: &[Value]) -> bool {
        self.facts.contains(fact)
    }

    fn check_arity(&self, actual: usize) -> Result<(), EvalError> {
        if actual != self.arity {
            return Err(EvalError::ArityMismatch {
                name: self.name.clone(),
                expected: self.arity,
                actual,
            });
        }
        Ok(())
    }

    /// Insert a fact. Returns `false` if it was already known.
    pub fn insert(&mut self, fact: Fact) -> Result<bool, EvalError> {
        self.check_arity(fact.len())?;
        Ok(self.facts.insert(fact))
    }

    /// Lazily match `pattern` against every fact.
    pub fn query(&self, pattern: &[Slot]) -> Result<QueryResult<'_>, EvalError> {
        self.check_arity(pattern.len())?;
        let placeholders = pattern
            .iter()
            .filter(|s| matches!(s, Slot::Placeholder))
            .count();
        Ok(QueryResult {
            facts: self.facts.iter(),
            pattern: pattern.to_vec(),
            placeholders,
        })
    }

    /// Membership test when the pattern has no placeholders, otherwise a
    /// query.
    pub fn ask(&self, pattern: &[Slot]) -> Result<Answer<QueryResult<'_>>, EvalError> {
        let mut result = self.query(pattern)?;
        if result.placeholders > 0 {
            return Ok(Answer::Matches(result));
        }
        let concrete: Option<Vec<Value>> = pattern
            .iter()
            .map(|s| match s {
                Slot::Value(v) => Some(v.clone()),
                _ => None,
            })
            .collect();
        Ok(Answer::Holds(match concrete {
            Some(fact) => self.contains(&fact),
            None => result.next().is_some(),
        }))
    }
}

/// Lazy sequence of query matches.
///
/// With one placeholder each item is the matched value; with several it
/// is a `List` of the matched values in pattern order. A pattern without
/// placeholders yields an empty list per matching fact.
#[derive(Debug, Clone)]
pub struct QueryResult<'a> {
    facts: btree_set::Iter<'a, Fact>,
    pattern: Vec<Slot>,
    placeholders: usize,
}

impl QueryResult<'_> {
    fn project(&self, fact: &[Value]) -> Value {
        let mut reported = fact
            .iter()
            .zip(&self.pattern)
            .filter(|(_, slot)| matches!(slot, Slot::Placeholder))
            .map(|(v, _)| v.clone());
        if self.placeholders == 1 {
            reported.next().unwrap_or(Value::Null)
        } else {
            Value::List(reported.collect())
        }
    }

    pub fn into_set(self) -> BTreeSet<Value> {
        self.collect()
    }

    /// `<=`: every match is in `other`.
    pub fn is_subset_of<I: IntoIterator<Item = Value>>(self, other: I) -> bool {
        let other: BTreeSet<Value> = other.into_iter().collect();
        self.into_set().is_subset(&other)
    }

    /// `<`: subset, and `other` has something more.
    pub fn is_proper_subset_of<I: IntoIterator<Item = Value>>(self, other: I) -> bool {
        let other: BTreeSet<Value> = other.into_iter().collect();
        let mine = self.into_set();
        mine.len() < other.len() && mine.is_subset(&other)
    }

    /// `>=`: every item of `other` is a match.
    pub fn is_superset_of<I: IntoIterator<Item = Value>>(self, other: I) -> bool {
        let mine = self.into_set();
        other.into_iter().all(|v| mine.contains(&v))
    }

    /// `>`: superset, and some match is not in `other`.
    pub fn is_proper_superset_of<I: IntoIterator<Item = Value>>(self, other: I) -> bool {
        let other: BTreeSet<Value> = other.into_iter().collect();
        let mine = self.into_set();
        mine.len() > other.len() && mine.is_superset(&other)
    }
}

impl Iterator for QueryResult<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        loop {
            let fact = self.facts.next()?;
            if fact.iter().zip(&self.pattern).all(|(v, slot)| slot.admits(v)) {
                return Some(self.project(fact));
            }
        }
    }
}

/// Term name -> term, for every term the policy declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    terms: BTreeMap<String, Term>,
}

impl KnowledgeBase {
    /// An empty fact set for each declared term.
    pub fn from_policy(policy: &Policy) -> Self {
        let terms = policy
            .term_templates()
            .iter()
            .map(|(name, tpl)| (name.clone(), Term::new(name.clone(), tpl.arity())))
            .collect();
        KnowledgeBase { terms }
    }

    pub fn term(&self, name: &str) -> Result<&Term, EvalError> {
        self.terms.get(name).ok_or_else(|| EvalError::UnknownTermType {
            name: name.to_string(),
        })
    }

    fn term_mut(&mut self, name: &str) -> Result<&mut Term, EvalError> {
        self.terms.get_mut(name).ok_or_else(|| EvalError::UnknownTermType {
            name: name.to_string(),
        })
    }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.values()
    }

    /// Add one fact. Returns whether it was new.
    pub fn add_fact(&mut self, term: &str, fact: Fact) -> Result<bool, EvalError> {
        self.term_mut(term)?.insert(fact)
    }

    /// Add a batch of facts to one term. Every fact is checked before any
    /// is inserted. Returns how many were new.
    pub fn add_facts(&mut self, term: &str, facts: Vec<Fact>) -> Result<usize, EvalError> {
        let target = self.term_mut(term)?;
        for fact in &facts {
            target.check_arity(fact.len())?;
        }
        let mut added = 0;
        for fact in facts {
            if target.facts.insert(fact) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn facts(&self, term: &str) -> Result<&BTreeSet<Fact>, EvalError> {
        Ok(self.term(term)?.facts())
    }

    pub fn query(&self, term: &str, pattern: &[Slot]) -> Result<QueryResult<'_>, EvalError> {
        self.term(term)?.query(pattern)
    }

    pub fn ask(&self, term: &str, pattern: &[Slot]) -> Result<Answer<QueryResult<'_>>, EvalError> {
        self.term(term)?.ask(pattern)
    }

    /// Total number of facts across all terms.
    pub fn len(&self) -> usize {
        self.terms.values().map(Term::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
