//! Request matching.
//!
//! Every request gets its own [`Matcher`]. The matcher decodes the path once,
//! then asks the tiers for a location in a fixed order and stops at the first
//! entry whose path check and predicates both pass:
//!
//! ```text
//! File → Exact → StringBreak → Regex → String → fallback / 404
//! ```
//!
//! A `StringBreak` (`^~`) entry that wins therefore keeps every regex location
//! from being looked at, which is the nginx contract for that modifier. An
//! entry whose predicates fail never wins, so it suppresses nothing.

use percent_encoding::percent_decode_str;
use tracing::trace;

use crate::files::{FileHit, TryFiles};
use crate::handler::BoxedHandler;
use crate::request::{Matches, Request};
use crate::response::Response;
use crate::table::{RouteEntry, Target};
use crate::tier::Tier;

// ── Routes ───────────────────────────────────────────────────────────────────

/// A compiled, read-only route set, produced by
/// [`RouteTable::freeze`](crate::RouteTable::freeze).
///
/// `Routes` is `Send + Sync`; share it behind an `Arc` and call it from as
/// many requests as you like.
pub struct Routes {
    tiers: [Vec<RouteEntry>; 5],
    fallback: Option<BoxedHandler>,
}

impl Routes {
    pub(crate) fn new(tiers: [Vec<RouteEntry>; 5], fallback: Option<BoxedHandler>) -> Self {
        Self { tiers, fallback }
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

    /// Routes one request and produces one response.
    ///
    /// Never fails: a request nothing accepts goes to the fallback handler,
    /// or gets [`Response::not_found`] when there is none.
    pub async fn call(&self, mut req: Request) -> Response {
        let found = Matcher::new(self, &req.path).find(&req);

        match found {
            Some(Found::Location { handler, matches, .. }) => {
                if let Some(matches) = matches {
                    req.set_matches(matches);
                }
                handler.call(req).await
            }
            Some(Found::File { files, hit, .. }) => {
                req.path = hit.relative;
                files.serve(hit.absolute, req).await
            }
            None => match &self.fallback {
                Some(app) => app.call(req).await,
                None => Response::not_found(),
            },
        }
    }
}

impl std::fmt::Debug for Routes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Routes")
            .field("tiers", &self.tiers)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

// ── MatchContext ─────────────────────────────────────────────────────────────

/// The request path in the two forms the tiers compare against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchContext {
    decoded: String,
    canonical: String,
}

impl MatchContext {
    /// Form-url-decodes `raw` (`+` is a space, `%XX` an escaped byte) and
    /// lower-cases the result.
    pub fn new(raw: &str) -> Self {
        let spaced = raw.replace('+', " ");
        let decoded = percent_decode_str(&spaced).decode_utf8_lossy().into_owned();
        let canonical = decoded.to_lowercase();
        Self { decoded, canonical }
    }

    /// Decoded, case preserved. Used to look files up on disk.
    pub fn decoded(&self) -> &str {
        &self.decoded
    }

    /// Decoded and lower-cased. Used by every pattern comparison.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

// ── Found ────────────────────────────────────────────────────────────────────

/// The entry that won a request, with whatever its tier extracted.
pub enum Found<'a> {
    Location {
        entry: &'a RouteEntry,
        handler: &'a BoxedHandler,
        matches: Option<Matches>,
    },
    File {
        entry: &'a RouteEntry,
        files: &'a TryFiles,
        hit: FileHit,
    },
}

impl<'a> Found<'a> {
    pub fn entry(&self) -> &'a RouteEntry {
        match self {
            Self::Location { entry, .. } | Self::File { entry, .. } => *entry,
        }
    }

    pub fn tier(&self) -> Tier {
        self.entry().tier
    }

    pub fn matches(&self) -> Option<&Matches> {
        match self {
            Self::Location { matches, .. } => matches.as_ref(),
            Self::File { .. } => None,
        }
    }

    fn location(entry: &'a RouteEntry, matches: Option<Matches>) -> Option<Self> {
        match &entry.target {
            Target::Handler(handler) => Some(Self::Location { entry, handler, matches }),
            Target::Files(_) => None,
        }
    }
}

impl std::fmt::Debug for Found<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Location { entry, matches, .. } => f
                .debug_struct("Location")
                .field("entry", entry)
                .field("matches", matches)
                .finish_non_exhaustive(),
            Self::File { entry, hit, .. } => f
                .debug_struct("File")
                .field("entry", entry)
                .field("hit", hit)
                .finish_non_exhaustive(),
        }
    }
}

// ── Matcher ──────────────────────────────────────────────────────────────────

/// Per-request evaluator bound to a frozen [`Routes`].
///
/// Each tier is exposed as its own `find_*` method so precedence can be
/// checked one strategy at a time; [`find`](Self::find) chains them.
pub struct Matcher<'a> {
    routes: &'a Routes,
    ctx: MatchContext,
}

type Strategy<'a> = fn(&Matcher<'a>, &Request) -> Option<Found<'a>>;

impl<'a> Matcher<'a> {
    pub fn new(routes: &'a Routes, raw_path: &str) -> Self {
        Self { routes, ctx: MatchContext::new(raw_path) }
    }

    pub fn context(&self) -> &MatchContext {
        &self.ctx
    }

    /// First eligible entry across all tiers, in precedence order.
    pub fn find(&self, req: &Request) -> Option<Found<'a>> {
        let strategies: [Strategy<'a>; 5] = [
            Self::find_file,
            Self::find_exact,
            Self::find_string_break,
            Self::find_regex,
            Self::find_string,
        ];

        let found = strategies.iter().find_map(|strategy| strategy(self, req));
        match &found {
            Some(f) => trace!(
                path = self.ctx.canonical(),
                tier = %f.tier(),
                pattern = ?f.entry().pattern(),
                "location matched"
            ),
            None => trace!(path = self.ctx.canonical(), "no location matched"),
        }
        found
    }

    pub fn find_file(&self, req: &Request) -> Option<Found<'a>> {
        self.eligible(Tier::File, req).find_map(|entry| match &entry.target {
            Target::Files(files) => files
                .probe(self.ctx.decoded())
                .map(|hit| Found::File { entry, files, hit }),
            Target::Handler(_) => None,
        })
    }

    pub fn find_exact(&self, req: &Request) -> Option<Found<'a>> {
        self.find_literal(Tier::Exact, req, |path, pattern| path == pattern)
    }

    pub fn find_string_break(&self, req: &Request) -> Option<Found<'a>> {
        self.find_literal(Tier::StringBreak, req, |path, prefix| path.starts_with(prefix))
    }

    /// First regex, in registration order, that matches the canonical path.
    pub fn find_regex(&self, req: &Request) -> Option<Found<'a>> {
        let path = self.ctx.canonical();
        self.eligible(Tier::Regex, req).find_map(|entry| {
            let re = entry.pattern.as_regex()?;
            let caps = re.captures(path)?;
            Found::location(entry, Some(Matches::from_captures(re, &caps)))
        })
    }

    pub fn find_string(&self, req: &Request) -> Option<Found<'a>> {
        self.find_literal(Tier::String, req, |path, prefix| path.starts_with(prefix))
    }

    fn find_literal(
        &self,
        tier: Tier,
        req: &Request,
        accepts: impl Fn(&str, &str) -> bool,
    ) -> Option<Found<'a>> {
        let path = self.ctx.canonical();
        self.eligible(tier, req)
            .filter(|entry| entry.pattern.as_literal().is_some_and(|p| accepts(path, p)))
            .find_map(|entry| Found::location(entry, None))
    }

    fn eligible(&self, tier: Tier, req: &Request) -> impl Iterator<Item = &'a RouteEntry> {
        self.routes
            .entries(tier)
            .iter()
            .filter(move |entry| entry.predicates.admit(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_decodes_then_lowercases() {
        let ctx = MatchContext::new("/Images/%20/Test");
        assert_eq!(ctx.decoded(), "/Images/ /Test");
        assert_eq!(ctx.canonical(), "/images/ /test");
    }

    #[test]
    fn context_uses_form_semantics() {
        assert_eq!(MatchContext::new("/a+b").canonical(), "/a b");
        assert_eq!(MatchContext::new("/a%2Bb").canonical(), "/a+b");
    }

    #[test]
    fn context_survives_invalid_escapes() {
        assert_eq!(MatchContext::new("/100%").canonical(), "/100%");
        assert_eq!(MatchContext::new("/%zz").canonical(), "/%zz");
        assert_eq!(MatchContext::new("/%ff").canonical(), "/\u{fffd}");
    }
}
