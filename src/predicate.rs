//! Request predicates attached to a location.
//!
//! A location only applies when every one of its predicates holds. Each
//! predicate names a request attribute (see [`Request::lookup`]) and the value
//! expected there: either a literal compared for equality, or a regex the live
//! value must match. An attribute the request does not carry fails the
//! predicate; it is never an error.

use std::fmt;

use regex::Regex;

use crate::error::Error;
use crate::request::Request;

/// Expected value of a single predicate.
#[derive(Clone)]
pub enum PredicateValue {
    Literal(String),
    Pattern(Regex),
}

impl PredicateValue {
    /// Compiles `pattern` into a [`PredicateValue::Pattern`].
    pub fn regex(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|source| Error::InvalidPattern { pattern: pattern.to_owned(), source })
    }

    pub fn accepts(&self, actual: &str) -> bool {
        match self {
            Self::Literal(expected) => expected == actual,
            Self::Pattern(re) => re.is_match(actual),
        }
    }
}

impl fmt::Debug for PredicateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v:?}"),
            Self::Pattern(re) => write!(f, "~{:?}", re.as_str()),
        }
    }
}

impl From<&str> for PredicateValue {
    fn from(v: &str) -> Self { Self::Literal(v.to_owned()) }
}

impl From<String> for PredicateValue {
    fn from(v: String) -> Self { Self::Literal(v) }
}

impl From<http::Method> for PredicateValue {
    fn from(m: http::Method) -> Self { Self::Literal(m.as_str().to_owned()) }
}

impl From<Regex> for PredicateValue {
    fn from(re: Regex) -> Self { Self::Pattern(re) }
}

/// Ordered set of predicates; all must hold.
#[derive(Clone, Debug, Default)]
pub struct Predicates(Vec<(String, PredicateValue)>);

impl Predicates {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a predicate on `key`. A later predicate on the same key replaces
    /// the earlier one in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PredicateValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PredicateValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when every predicate holds for `req`. An empty set admits all.
    pub fn admit(&self, req: &Request) -> bool {
        self.0.iter().all(|(key, expected)| {
            req.lookup(key).is_some_and(|actual| expected.accepts(actual))
        })
    }
}
