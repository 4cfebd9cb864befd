//! Request context handed to every handler.

use std::collections::HashMap;

/// Captures from the regex location that won the request.
///
/// `get(0)` is the whole match, `get(n)` the n-th group. Groups that did not
/// take part in the match are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Matches {
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl Matches {
    pub(crate) fn from_captures(re: &regex::Regex, caps: &regex::Captures<'_>) -> Self {
        let groups = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_owned()))
            .collect();
        let named = re
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
            .collect();
        Self { groups, named }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index)?.as_deref()
    }

    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Number of groups, including the implicit whole-match group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.groups.iter().map(Option::as_deref)
    }
}

/// An incoming HTTP request.
///
/// Besides the wire-level method, path, headers and body, a request carries a
/// string-keyed attribute bag that location predicates can test, and the
/// regex [`Matches`] written by the matcher before the handler runs.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) attributes: HashMap<String, String>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) matches: Option<Matches>,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: Vec::new(),
            attributes: HashMap::new(),
            params: HashMap::new(),
            matches: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Returns a named capture group from the winning regex location.
    ///
    /// For `(?P<name>[^/]+)` matched against `/users/ada`, `req.param("name")`
    /// returns `Some("ada")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Captures of the regex location that matched this request, if any.
    ///
    /// This is the request's matches slot. Captures are not copied into the
    /// string attribute bag; named groups are also reachable via
    /// [`param`](Self::param).
    pub fn matches(&self) -> Option<&Matches> {
        self.matches.as_ref()
    }

    /// Resolves a predicate key against the live request.
    ///
    /// `"method"` and `"path"` name the request line; anything else is looked
    /// up in the attribute bag first, then among the headers.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "method" => Some(self.method.as_str()),
            "path" => Some(self.path.as_str()),
            _ => self.attribute(key).or_else(|| self.header(key)),
        }
    }

    pub(crate) fn set_matches(&mut self, matches: Matches) {
        self.params.extend(matches.named.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.matches = Some(matches);
    }
}
