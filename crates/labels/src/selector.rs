//! Selector parsing and evaluation.

use crate::error::ParseError;
use crate::Labels;
use std::fmt;
use std::str::FromStr;

/// A single term of a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// `key=value`
    Equals { key: String, value: String },
    /// `key!=value`
    NotEquals { key: String, value: String },
    /// `key`
    Exists(String),
    /// `!key`
    NotExists(String),
}

impl Requirement {
    /// Evaluates this term against a key/value source.
    pub fn matches<L: Labels + ?Sized>(&self, labels: &L) -> bool {
        match self {
            Requirement::Equals { key, value } => labels.get(key).unwrap_or("") == value,
            Requirement::NotEquals { key, value } => labels.get(key).unwrap_or("") != value,
            Requirement::Exists(key) => labels.get(key).is_some(),
            Requirement::NotExists(key) => labels.get(key).is_none(),
        }
    }

    /// The key this term constrains.
    pub fn key(&self) -> &str {
        match self {
            Requirement::Equals { key, .. }
            | Requirement::NotEquals { key, .. }
            | Requirement::Exists(key)
            | Requirement::NotExists(key) => key,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Equals { key, value } => write!(f, "{key}={value}"),
            Requirement::NotEquals { key, value } => write!(f, "{key}!={value}"),
            Requirement::Exists(key) => write!(f, "{key}"),
            Requirement::NotExists(key) => write!(f, "!{key}"),
        }
    }
}

/// Parsed predicate over key/value pairs.
///
/// The empty selector matches everything. `Display` renders the canonical
/// text form, which parses back to an equal selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// A selector that matches every resource.
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    /// Parses a label selector. Blank text yields [`Selector::everything`].
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_terms(text, true)
    }

    /// Parses a field selector. Same grammar as labels, minus existence terms.
    pub fn parse_fields(text: &str) -> Result<Self, ParseError> {
        parse_terms(text, false)
    }

    /// Builds a selector requiring every one of `pairs` to match exactly.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let requirements = pairs
            .into_iter()
            .map(|(key, value)| Requirement::Equals {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect();
        Self { requirements }
    }

    /// True if every term matches.
    pub fn matches<L: Labels + ?Sized>(&self, labels: &L) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    /// True if this selector places no constraint.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// The parsed terms, in source order.
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

impl FromStr for Selector {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{requirement}")?;
        }
        Ok(())
    }
}

fn parse_terms(text: &str, allow_existence: bool) -> Result<Selector, ParseError> {
    if text.trim().is_empty() {
        return Ok(Selector::everything());
    }

    let mut requirements = Vec::new();
    for (position, raw) in text.split(',').enumerate() {
        let term = raw.trim();
        if term.is_empty() {
            return Err(ParseError::EmptyTerm(position));
        }
        let requirement = parse_term(term)?;
        if !allow_existence
            && matches!(requirement, Requirement::Exists(_) | Requirement::NotExists(_))
        {
            return Err(ParseError::ExistenceNotAllowed(term.to_string()));
        }
        requirements.push(requirement);
    }
    Ok(Selector { requirements })
}

fn parse_term(term: &str) -> Result<Requirement, ParseError> {
    let (key, value, negated) = if let Some(idx) = term.find("!=") {
        (&term[..idx], &term[idx + 2..], true)
    } else if let Some(idx) = term.find("==") {
        (&term[..idx], &term[idx + 2..], false)
    } else if let Some(idx) = term.find('=') {
        (&term[..idx], &term[idx + 1..], false)
    } else if let Some(rest) = term.strip_prefix('!') {
        let key = validate_key(rest.trim(), term)?;
        return Ok(Requirement::NotExists(key));
    } else {
        let key = validate_key(term, term)?;
        return Ok(Requirement::Exists(key));
    };

    let key = validate_key(key.trim(), term)?;
    let value = value.trim();
    if value.contains('=') || value.contains('!') {
        return Err(ParseError::UnbalancedOperator(term.to_string()));
    }
    let value = value.to_string();
    Ok(if negated {
        Requirement::NotEquals { key, value }
    } else {
        Requirement::Equals { key, value }
    })
}

fn validate_key(key: &str, term: &str) -> Result<String, ParseError> {
    if key.is_empty() {
        return Err(ParseError::EmptyKey(term.to_string()));
    }
    if key.chars().any(|c| c == '=' || c == '!' || c.is_whitespace()) {
        return Err(ParseError::InvalidKey {
            key: key.to_string(),
            term: term.to_string(),
        });
    }
    Ok(key.to_string())
}
