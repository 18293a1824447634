//! The live model: a validated policy plus its knowledge base.

use std::collections::{BTreeMap, BTreeSet};

use acs_core::{load_policy, LoadError, Limits, Policy, RESERVED_NAMES};

use crate::enforce;
use crate::error::EvalError;
use crate::knowledge::{Answer, Fact, KnowledgeBase, QueryResult, Slot};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    policy: Policy,
    knowledge: KnowledgeBase,
}

impl Model {
    /// A model over `policy` with no facts yet.
    pub fn new(policy: Policy) -> Self {
        let knowledge = KnowledgeBase::from_policy(&policy);
        Model { policy, knowledge }
    }

    /// Parse, validate and build a model from text.
    pub fn load(source: &str, limits: &Limits) -> Result<Model, LoadError> {
        let policy = load_policy(source, limits)?;
        for (request_type, names) in undefined_names(&policy) {
            for name in names {
                tracing::warn!(
                    request_type = %request_type,
                    name = %name,
                    "matcher references a name that is never defined"
                );
            }
        }
        tracing::info!(
            requests = policy.request_templates().len(),
            terms = policy.term_templates().len(),
            matchers = policy.matchers().len(),
            "model loaded"
        );
        Ok(Model::new(policy))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Announce a fact. Returns whether it was new.
    pub fn add_fact(&mut self, term: &str, fact: Fact) -> Result<bool, EvalError> {
        let added = self.knowledge.add_fact(term, fact)?;
        tracing::debug!(term = %term, new = added, "fact announced");
        Ok(added)
    }

    /// Announce several facts for one term, all or none.
    pub fn add_facts(&mut self, term: &str, facts: Vec<Fact>) -> Result<usize, EvalError> {
        let total = facts.len();
        let added = self.knowledge.add_facts(term, facts)?;
        tracing::debug!(term = %term, total, added, "facts announced");
        Ok(added)
    }

    pub fn facts(&self, term: &str) -> Result<&BTreeSet<Fact>, EvalError> {
        self.knowledge.facts(term)
    }

    pub fn query(&self, term: &str, pattern: &[Slot]) -> Result<QueryResult<'_>, EvalError> {
        self.knowledge.query(term, pattern)
    }

    pub fn ask(&self, term: &str, pattern: &[Slot]) -> Result<Answer<QueryResult<'_>>, EvalError> {
        self.knowledge.ask(term, pattern)
    }

    /// Decide a request against the current facts.
    pub fn enforce(&self, request_type: &str, values: &[Value]) -> Result<bool, EvalError> {
        let result = enforce::enforce(&self.policy, &self.knowledge, request_type, values);
        match &result {
            Ok(verdict) => {
                tracing::debug!(request_type = %request_type, allowed = *verdict, "request enforced");
            }
            Err(err @ EvalError::Enforcement { .. }) => {
                tracing::error!(request_type = %request_type, error = %err, "defective matcher");
            }
            Err(err) => {
                tracing::debug!(request_type = %request_type, error = %err, "request rejected");
            }
        }
        result
    }
}

/// Names a matcher uses that no scope can resolve: not a field of its own
/// request type, not the request type, not a term, not a constant.
fn undefined_names(policy: &Policy) -> BTreeMap<String, BTreeSet<String>> {
    let mut undefined: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (request_type, expr) in policy.matchers() {
        let fields = policy.request_fields(request_type).unwrap_or_default();
        for name in expr.names() {
            let known = fields.iter().any(|f| f == name)
                || name == request_type
                || policy.term(name).is_some()
                || RESERVED_NAMES.contains(&name);
            if !known {
                undefined
                    .entry(request_type.clone())
                    .or_default()
                    .insert(name.to_string());
            }
        }
    }
    undefined
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "\
[requests]
delete_data = usr, data
[terms]
data_owner = data, usr
[matchers]
delete_data = data_owner(data, usr)
";

    #[test]
    fn new_model_has_empty_terms() {
        let model = Model::load(SRC, &Limits::default()).unwrap();
        assert!(model.facts("data_owner").unwrap().is_empty());
        assert!(model.knowledge().is_empty());
    }

    #[test]
    fn announce_then_enforce() {
        let mut model = Model::load(SRC, &Limits::default()).unwrap();
        let fact = vec![Value::str("d1"), Value::str("alice")];
        assert!(model.add_fact("data_owner", fact.clone()).unwrap());
        assert!(!model.add_fact("data_owner", fact).unwrap());

        let allow = [Value::str("alice"), Value::str("d1")];
        let deny = [Value::str("bob"), Value::str("d1")];
        assert!(model.enforce("delete_data", &allow).unwrap());
        assert!(!model.enforce("delete_data", &deny).unwrap());
    }

    #[test]
    fn undefined_names_are_found_per_matcher() {
        let src = "\
[requests]
r = a
s = b
[terms]
t = x
[matchers]
r = t(a) and b and true
s = s.b == X and nowhere
";
        let model = Model::load(src, &Limits::default()).unwrap();
        let undefined = undefined_names(model.policy());
        assert_eq!(undefined.len(), 2);
        assert_eq!(undefined["r"], BTreeSet::from(["b".to_string()]));
        assert_eq!(undefined["s"], BTreeSet::from(["nowhere".to_string()]));
    }

    #[test]
    fn undefined_names_warn_but_load() {
        let src = "\
[requests]
r = a
[terms]
t = x
[matchers]
r = t(a) and b and c
";
        let mut model = Model::load(src, &Limits::default()).unwrap();
        model.add_fact("t", vec![Value::Int(1)]).unwrap();
        assert!(model.enforce("r", &[Value::Int(1)]).is_err());
    }
}
