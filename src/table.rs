//! The setup-phase route registry.
//!
//! A [`RouteTable`] is only ever mutated while the application starts up.
//! [`RouteTable::freeze`] sorts it and turns it into [`Routes`], which has no
//! mutating API at all and can be shared by every request in flight.
//!
//! Literal patterns are lower-cased on the way in: the matcher lower-cases the
//! request path before comparing, so a mixed-case literal could never match.

use std::cmp::Reverse;
use std::fmt;

use tracing::{debug, info};

use crate::error::Error;
use crate::files::TryFiles;
use crate::handler::{BoxedHandler, Handler};
use crate::location::{LocationOptions, Pattern, parse_directive};
use crate::matcher::Routes;
use crate::predicate::Predicates;
use crate::tier::Tier;

/// What runs once an entry wins.
#[derive(Clone)]
pub(crate) enum Target {
    Handler(BoxedHandler),
    Files(TryFiles),
}

/// One registered location.
#[derive(Clone)]
pub struct RouteEntry {
    pub(crate) pattern: Pattern,
    pub(crate) tier: Tier,
    pub(crate) target: Target,
    pub(crate) predicates: Predicates,
}

impl RouteEntry {
    pub fn pattern(&self) -> &Pattern { &self.pattern }
    pub fn tier(&self) -> Tier { self.tier }
    pub fn predicates(&self) -> &Predicates { &self.predicates }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("RouteEntry");
        d.field("tier", &self.tier).field("pattern", &self.pattern);
        if let Target::Files(files) = &self.target {
            d.field("files", files);
        }
        d.field("predicates", &self.predicates).finish()
    }
}

/// Locations grouped by tier, in registration order until compiled.
///
/// ```rust
/// use waypost::{LocationOptions, RouteTable, Request, Response};
///
/// # async fn page(_: Request) -> Response { Response::text("") }
/// let mut table = RouteTable::new();
/// table
///     .location("= /", LocationOptions::new(), page)?
///     .location("^~ /images/", LocationOptions::new(), page)?
///     .location("~* \\.(gif|jpe?g)$", LocationOptions::new(), page)?
///     .location("/", LocationOptions::new().method(http::Method::GET), page)?;
/// let routes = table.freeze();
/// # Ok::<(), waypost::Error>(())
/// ```
#[derive(Default)]
pub struct RouteTable {
    tiers: [Vec<RouteEntry>; 5],
    fallback: Option<BoxedHandler>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under an explicit tier.
    ///
    /// A regex pattern must go in [`Tier::Regex`] and a literal anywhere else
    /// except [`Tier::File`], which only [`try_files`](Self::try_files) fills.
    /// A leading `=`, `^~`, `~` or `~*` directive is stripped from a literal
    /// and `tier` is kept as given. What is left must start with `/`.
    pub fn register(
        &mut self,
        pattern: impl Into<Pattern>,
        tier: Tier,
        handler: impl Handler,
        predicates: Predicates,
    ) -> Result<&mut Self, Error> {
        let pattern = match pattern.into() {
            Pattern::Literal(raw) => parse_directive(&raw)?.0,
            re => re,
        };
        self.push(pattern, tier, handler.into_boxed_handler(), predicates)
    }

    /// Registers `handler` the nginx way; the tier comes from the directive in
    /// front of `pattern` or from `options`.
    pub fn location(
        &mut self,
        pattern: impl Into<Pattern>,
        options: LocationOptions,
        handler: impl Handler,
    ) -> Result<&mut Self, Error> {
        let (pattern, tier) = options.resolve(pattern.into())?;
        self.push(pattern, tier, handler.into_boxed_handler(), options.into_predicates())
    }

    /// Registers a [`Tier::File`] entry that answers whenever one of the
    /// configured files exists.
    pub fn try_files(&mut self, files: TryFiles) -> Result<&mut Self, Error> {
        let files = files.with_default_dir()?;
        debug!(files = ?files, "try_files registered");
        self.tiers[Tier::File.index()].push(RouteEntry {
            pattern: Pattern::Literal(files.describe()),
            tier: Tier::File,
            target: Target::Files(files),
            predicates: Predicates::new(),
        });
        Ok(self)
    }

    /// Handler used when no location matches, instead of the built-in 404.
    pub fn fallback(&mut self, handler: impl Handler) -> &mut Self {
        self.fallback = Some(handler.into_boxed_handler());
        self
    }

    /// Orders the literal tiers longest pattern first.
    ///
    /// The sort is stable, so equal lengths keep registration order, and
    /// running it again changes nothing. Regex and file entries keep their
    /// registration order.
    pub fn compile(&mut self) {
        for tier in Tier::PRECEDENCE.into_iter().filter(|t| t.is_length_sorted()) {
            self.tiers[tier.index()].sort_by_key(|e| Reverse(e.pattern.len()));
        }
    }

    /// Drops every location and the fallback.
    pub fn clear(&mut self) {
        self.tiers.iter_mut().for_each(Vec::clear);
        self.fallback = None;
    }

    pub fn entries(&self, tier: Tier) -> &[RouteEntry] {
        &self.tiers[tier.index()]
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compiles the table and closes it for registration.
    pub fn freeze(mut self) -> Routes {
        self.compile();
        info!(
            file = self.tiers[Tier::File.index()].len(),
            exact = self.tiers[Tier::Exact.index()].len(),
            string_break = self.tiers[Tier::StringBreak.index()].len(),
            regex = self.tiers[Tier::Regex.index()].len(),
            string = self.tiers[Tier::String.index()].len(),
            fallback = self.fallback.is_some(),
            "routes frozen"
        );
        Routes::new(self.tiers, self.fallback)
    }

    fn push(
        &mut self,
        pattern: Pattern,
        tier: Tier,
        handler: BoxedHandler,
        predicates: Predicates,
    ) -> Result<&mut Self, Error> {
        let pattern = match pattern {
            Pattern::Regex(re) if tier.takes_regex() => Pattern::Regex(re),
            Pattern::Regex(re) => {
                return Err(Error::InvalidTier(format!("{tier} cannot hold regex {:?}", re.as_str())));
            }
            Pattern::Literal(s) if tier.takes_regex() => {
                return Err(Error::InvalidTier(format!("{tier} cannot hold literal {s:?}")));
            }
            Pattern::Literal(s) if !s.starts_with('/') => return Err(Error::InvalidPath(s)),
            Pattern::Literal(s) => Pattern::Literal(s.to_lowercase()),
        };

        if tier == Tier::File {
            return Err(Error::InvalidHandler {
                tier,
                pattern: pattern.as_str().to_owned(),
                reason: "file locations are created with try_files",
            });
        }

        debug!(%tier, pattern = ?pattern, predicates = ?predicates, "location registered");
        self.tiers[tier.index()].push(RouteEntry {
            pattern,
            tier,
            target: Target::Handler(handler),
            predicates,
        });
        Ok(self)
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("tiers", &self.tiers)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, Response};

    async fn noop(_: Request) -> Response {
        Response::text("")
    }

    fn patterns(table: &RouteTable, tier: Tier) -> Vec<String> {
        table.entries(tier).iter().map(|e| e.pattern().as_str().to_owned()).collect()
    }

    #[test]
    fn directives_land_in_their_tier() {
        let cases = [
            ("= /", Tier::Exact),
            ("=  /", Tier::Exact),
            ("^~ /", Tier::StringBreak),
            ("^~  /", Tier::StringBreak),
            ("/", Tier::String),
        ];
        for (raw, tier) in cases {
            let mut table = RouteTable::new();
            table.location(raw, LocationOptions::new(), noop).unwrap();
            assert_eq!(table.len(), 1);
            assert_eq!(table.entries(tier).len(), 1, "{raw:?}");
        }

        let mut table = RouteTable::new();
        table.location(regex::Regex::new("").unwrap(), LocationOptions::new(), noop).unwrap();
        assert_eq!(table.entries(Tier::Regex).len(), 1);
    }

    #[test]
    fn bad_paths_are_fatal() {
        for raw in ["= ", "^~", ""] {
            let err = RouteTable::new().location(raw, LocationOptions::new(), noop).unwrap_err();
            assert!(matches!(err, Error::InvalidPath(ref p) if p == raw), "{raw:?}: {err}");
        }
    }

    #[test]
    fn register_checks_pattern_against_tier() {
        let mut table = RouteTable::new();
        let re = Pattern::regex("^/a").unwrap();

        assert!(matches!(
            table.register(re.clone(), Tier::String, noop, Predicates::new()),
            Err(Error::InvalidTier(_))
        ));
        assert!(matches!(
            table.register("/a", Tier::Regex, noop, Predicates::new()),
            Err(Error::InvalidTier(_))
        ));
        assert!(matches!(
            table.register("a", Tier::Exact, noop, Predicates::new()),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            table.register("/a", Tier::File, noop, Predicates::new()),
            Err(Error::InvalidHandler { tier: Tier::File, .. })
        ));
        assert!(table.is_empty());

        table.register(re, Tier::Regex, noop, Predicates::new()).unwrap();
        table.register("/A", Tier::Exact, noop, Predicates::new()).unwrap();
        assert_eq!(patterns(&table, Tier::Exact), ["/a"]);
    }

    #[test]
    fn register_strips_directives_and_keeps_tier() {
        let mut table = RouteTable::new();
        table
            .register("= /a", Tier::Exact, noop, Predicates::new())
            .unwrap()
            .register("^~ /b", Tier::StringBreak, noop, Predicates::new())
            .unwrap()
            .register("=/c", Tier::String, noop, Predicates::new())
            .unwrap();

        assert_eq!(patterns(&table, Tier::Exact), ["/a"]);
        assert_eq!(patterns(&table, Tier::StringBreak), ["/b"]);
        assert_eq!(patterns(&table, Tier::String), ["/c"]);

        assert!(matches!(
            table.register("= a", Tier::Exact, noop, Predicates::new()),
            Err(Error::InvalidPath(ref p)) if p == "= a"
        ));
        assert!(matches!(
            table.register("~ ^/d", Tier::String, noop, Predicates::new()),
            Err(Error::InvalidTier(_))
        ));
    }

    #[tokio::test]
    async fn registered_directive_location_serves_requests() {
        let mut table = RouteTable::new();
        table.register("= /a", Tier::Exact, |_req: Request| async { "a" }, Predicates::new()).unwrap();
        let routes = table.freeze();

        let res = routes.call(Request::get("/a")).await;
        assert_eq!(res.body(), b"a");
    }

    #[test]
    fn regex_cannot_be_forced_into_literal_tier() {
        let opts = LocationOptions::new().exact(true);
        let err = RouteTable::new()
            .location(regex::Regex::new("^/a").unwrap(), opts, noop)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTier(_)));
    }

    #[test]
    fn compile_sorts_literal_tiers_longest_first_and_stable() {
        let mut table = RouteTable::new();
        for p in ["/", "/asd", "/ab", "/xy", "/a"] {
            table.location(p, LocationOptions::new(), noop).unwrap();
            table.location(format!("= {p}"), LocationOptions::new(), noop).unwrap();
            table.location(format!("^~ {p}"), LocationOptions::new(), noop).unwrap();
        }
        table.location("~ ^/z", LocationOptions::new(), noop).unwrap();
        table.location("~ ^/zzzz", LocationOptions::new(), noop).unwrap();

        table.compile();
        for tier in [Tier::String, Tier::Exact, Tier::StringBreak] {
            assert_eq!(patterns(&table, tier), ["/asd", "/ab", "/xy", "/a", "/"]);
        }
        assert_eq!(patterns(&table, Tier::Regex), ["^/z", "^/zzzz"]);

        let before: Vec<_> = Tier::PRECEDENCE.iter().map(|t| patterns(&table, *t)).collect();
        table.compile();
        let after: Vec<_> = Tier::PRECEDENCE.iter().map(|t| patterns(&table, *t)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn clear_empties_everything() {
        let mut table = RouteTable::new();
        table.location("/", LocationOptions::new(), noop).unwrap();
        table.try_files(TryFiles::new().dir(".")).unwrap();
        table.fallback(noop);
        assert_eq!(table.len(), 2);

        table.clear();
        assert!(table.is_empty());
        assert!(table.fallback.is_none());
    }

    #[test]
    fn try_files_defaults_dir_to_working_directory() {
        let mut table = RouteTable::new();
        table.try_files(TryFiles::new()).unwrap();
        let entry = &table.entries(Tier::File)[0];
        assert_eq!(entry.pattern().as_str(), ":uri");
        assert!(entry.predicates().is_empty());
    }

    #[test]
    fn predicates_come_from_options() {
        let mut table = RouteTable::new();
        table
            .location("/foo", LocationOptions::new().method("POST").when("x-tenant", "acme"), noop)
            .unwrap();
        let keys: Vec<_> = table.entries(Tier::String)[0].predicates().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["method", "x-tenant"]);
    }
}
