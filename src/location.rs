//! Location patterns and the nginx directive syntax that places them in a tier.
//!
//! ```text
//! "= /login"         → Exact        "/login"
//! "^~ /static/"      → StringBreak  "/static/"
//! "~ \.php$"         → Regex        \.php$
//! "~* \.(png|gif)$"  → Regex        (?i)\.(png|gif)$
//! "/docs/"           → String       "/docs/"
//! Regex::new(..)     → Regex
//! ```

use std::fmt;

use regex::Regex;

use crate::error::Error;
use crate::predicate::{PredicateValue, Predicates};
use crate::tier::Tier;

/// The path side of a location: a literal or a compiled regex.
#[derive(Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    /// Compiles `pattern` into a [`Pattern::Regex`].
    pub fn regex(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|source| Error::InvalidPattern { pattern: pattern.to_owned(), source })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(re) => re.as_str(),
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            Self::Regex(_) => None,
        }
    }

    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            Self::Literal(_) => None,
            Self::Regex(re) => Some(re),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }

    /// Length used to order literal tiers, longest first.
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s:?}"),
            Self::Regex(re) => write!(f, "~{:?}", re.as_str()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self { Self::Literal(s.to_owned()) }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self { Self::Literal(s) }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self { Self::Regex(re) }
}

// ── LocationOptions ──────────────────────────────────────────────────────────

/// Options for [`RouteTable::location`](crate::RouteTable::location).
///
/// Tier selection, strongest first: [`tier`](Self::tier), then
/// [`exact`](Self::exact), then [`prefix`](Self::prefix), then the directive
/// written in front of the pattern. Everything else is a predicate.
///
/// ```rust
/// use waypost::{LocationOptions, PredicateValue};
///
/// let opts = LocationOptions::new()
///     .prefix("^~")
///     .method(http::Method::POST)
///     .when("accept", PredicateValue::regex("^application/json").unwrap());
/// ```
#[derive(Clone, Debug, Default)]
pub struct LocationOptions {
    exact: bool,
    prefix: Option<String>,
    tier: Option<Tier>,
    predicates: Predicates,
}

impl LocationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` makes the location an exact match, like `location = /path`.
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// nginx modifier: `"^~"` for a regex-stopping prefix, `"="` for exact.
    /// Any other value is rejected at registration.
    pub fn prefix(mut self, modifier: impl Into<String>) -> Self {
        self.prefix = Some(modifier.into());
        self
    }

    /// Explicit tier; must still agree with the kind of pattern.
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Only match requests with this method.
    pub fn method(self, method: impl Into<PredicateValue>) -> Self {
        self.when("method", method)
    }

    /// Only match requests whose attribute or header `key` satisfies `value`.
    pub fn when(mut self, key: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        self.predicates.insert(key, value);
        self
    }

    pub fn predicates(&self) -> &Predicates {
        &self.predicates
    }

    pub(crate) fn into_predicates(self) -> Predicates {
        self.predicates
    }

    /// Places `pattern` in a tier and strips its directive.
    pub(crate) fn resolve(&self, pattern: Pattern) -> Result<(Pattern, Tier), Error> {
        let modifier = self.prefix.as_deref().map(modifier_tier).transpose()?;

        let (pattern, inferred) = match pattern {
            Pattern::Regex(re) => (Pattern::Regex(re), Tier::Regex),
            Pattern::Literal(raw) => parse_directive(&raw)?,
        };

        let tier = self.tier
            .or(self.exact.then_some(Tier::Exact))
            .or(modifier)
            .unwrap_or(inferred);
        Ok((pattern, tier))
    }
}

fn modifier_tier(modifier: &str) -> Result<Tier, Error> {
    match modifier {
        "^~" => Ok(Tier::StringBreak),
        "=" => Ok(Tier::Exact),
        other => Err(Error::InvalidTier(other.to_owned())),
    }
}

/// Splits an nginx directive off a literal pattern.
pub(crate) fn parse_directive(raw: &str) -> Result<(Pattern, Tier), Error> {
    if let Some(rest) = raw.strip_prefix("^~") {
        return literal(raw, rest.trim_start(), Tier::StringBreak);
    }
    if let Some(rest) = raw.strip_prefix('=') {
        return literal(raw, rest.trim_start(), Tier::Exact);
    }
    if let Some(rest) = raw.strip_prefix("~*") {
        return Ok((Pattern::regex(&format!("(?i){}", rest.trim_start()))?, Tier::Regex));
    }
    if let Some(rest) = raw.strip_prefix('~') {
        return Ok((Pattern::regex(rest.trim_start())?, Tier::Regex));
    }
    literal(raw, raw, Tier::String)
}

fn literal(raw: &str, path: &str, tier: Tier) -> Result<(Pattern, Tier), Error> {
    if !path.starts_with('/') {
        return Err(Error::InvalidPath(raw.to_owned()));
    }
    Ok((Pattern::Literal(path.to_owned()), tier))
}
