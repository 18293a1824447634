//! Structural validation: turns a parsed [`RawModel`] into an immutable
//! [`Policy`].
//!
//! Checks run in a fixed order and the first failing check is reported.
//! Within a check every offending identifier is listed, sorted.

use crate::ast::{Expr, RawDeclaration, RawModel};
use crate::error::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

/// Names with a fixed meaning inside matcher expressions.
pub const RESERVED_NAMES: [&str; 5] = ["true", "false", "null", "_", "X"];

const REQUESTS: &str = "[requests]";
const TERMS: &str = "[terms]";

/// A declared relation: its field names, and so its arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermTemplate {
    pub fields: Vec<String>,
}

impl TermTemplate {
    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

/// A validated model. Every request type has exactly one matcher and no
/// identifier names both a request type and a term.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    request_templates: BTreeMap<String, Vec<String>>,
    term_templates: BTreeMap<String, TermTemplate>,
    matchers: BTreeMap<String, Expr>,
}

impl Policy {
    /// Ordered field names of a request type.
    pub fn request_fields(&self, request_type: &str) -> Option<&[String]> {
        self.request_templates.get(request_type).map(Vec::as_slice)
    }

    pub fn term(&self, name: &str) -> Option<&TermTemplate> {
        self.term_templates.get(name)
    }

    pub fn matcher(&self, request_type: &str) -> Option<&Expr> {
        self.matchers.get(request_type)
    }

    pub fn request_templates(&self) -> &BTreeMap<String, Vec<String>> {
        &self.request_templates
    }

    pub fn term_templates(&self) -> &BTreeMap<String, TermTemplate> {
        &self.term_templates
    }

    pub fn matchers(&self) -> &BTreeMap<String, Expr> {
        &self.matchers
    }
}

pub fn validate(raw: RawModel) -> Result<Policy, ValidationError> {
    check_unique_in_section(REQUESTS, &raw.requests)?;
    check_unique_in_section(TERMS, &raw.terms)?;
    check_disjoint_sections(&raw)?;
    check_reserved(&raw)?;
    check_fields(&raw)?;
    check_matchers(&raw)?;

    let request_templates = raw
        .requests
        .into_iter()
        .map(|d| (d.name, d.fields))
        .collect();
    let term_templates = raw
        .terms
        .into_iter()
        .map(|d| (d.name, TermTemplate { fields: d.fields }))
        .collect();
    let matchers = raw
        .matchers
        .into_iter()
        .map(|m| (m.request_type, m.expr))
        .collect();

    Ok(Policy {
        request_templates,
        term_templates,
        matchers,
    })
}

fn check_unique_in_section(section: &str, decls: &[RawDeclaration]) -> Result<(), ValidationError> {
    let identifiers = repeated(decls.iter().map(|d| d.name.as_str()));
    if identifiers.is_empty() {
        return Ok(());
    }
    Err(ValidationError::DuplicateInSection {
        section: section.to_owned(),
        identifiers,
    })
}

fn check_disjoint_sections(raw: &RawModel) -> Result<(), ValidationError> {
    let requests: BTreeSet<&str> = raw.requests.iter().map(|d| d.name.as_str()).collect();
    let identifiers: Vec<String> = raw
        .terms
        .iter()
        .map(|d| d.name.as_str())
        .filter(|name| requests.contains(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect();
    if identifiers.is_empty() {
        return Ok(());
    }
    Err(ValidationError::DuplicateIdentifier {
        identifiers,
        sections: (REQUESTS.to_owned(), TERMS.to_owned()),
    })
}

fn check_reserved(raw: &RawModel) -> Result<(), ValidationError> {
    let declared = raw.requests.iter().chain(&raw.terms).map(|d| d.name.as_str());
    let request_fields = raw
        .requests
        .iter()
        .flat_map(|d| d.fields.iter().map(String::as_str));
    let identifiers: BTreeSet<&str> = declared
        .chain(request_fields)
        .filter(|name| RESERVED_NAMES.contains(name))
        .collect();
    if identifiers.is_empty() {
        return Ok(());
    }
    Err(ValidationError::ReservedIdentifier {
        identifiers: identifiers.into_iter().map(str::to_owned).collect(),
    })
}

fn check_fields(raw: &RawModel) -> Result<(), ValidationError> {
    for decl in raw.requests.iter().chain(&raw.terms) {
        let fields = repeated(decl.fields.iter().map(String::as_str));
        if !fields.is_empty() {
            return Err(ValidationError::DuplicateField {
                declaration: decl.name.clone(),
                fields,
            });
        }
    }

    let terms: BTreeSet<&str> = raw.terms.iter().map(|d| d.name.as_str()).collect();
    for decl in &raw.requests {
        let fields: BTreeSet<&str> = decl
            .fields
            .iter()
            .map(String::as_str)
            .filter(|f| terms.contains(f))
            .collect();
        if !fields.is_empty() {
            return Err(ValidationError::FieldShadowsTerm {
                request_type: decl.name.clone(),
                fields: fields.into_iter().map(str::to_owned).collect(),
            });
        }
    }
    Ok(())
}

fn check_matchers(raw: &RawModel) -> Result<(), ValidationError> {
    let request_types = repeated(raw.matchers.iter().map(|m| m.request_type.as_str()));
    if !request_types.is_empty() {
        return Err(ValidationError::DuplicateMatcher { request_types });
    }

    let declared: BTreeSet<&str> = raw.requests.iter().map(|d| d.name.as_str()).collect();
    let matched: BTreeSet<&str> = raw
        .matchers
        .iter()
        .map(|m| m.request_type.as_str())
        .collect();

    let missing: Vec<String> = declared.difference(&matched).map(|s| s.to_string()).collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingMatchers {
            request_types: missing,
        });
    }

    let unknown: Vec<String> = matched.difference(&declared).map(|s| s.to_string()).collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownMatchers {
            request_types: unknown,
        });
    }
    Ok(())
}

/// Names occurring more than once, sorted and deduplicated.
fn repeated<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut repeats = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            repeats.insert(name);
        }
    }
    repeats.into_iter().map(str::to_owned).collect()
}
