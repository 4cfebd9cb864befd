//! Unified error type.

use crate::tier::Tier;

/// The error type returned by waypost's fallible operations.
///
/// Every variant except [`Error::Io`] is a configuration error: it is raised
/// while the [`RouteTable`](crate::RouteTable) is being built and should abort
/// startup. Once [`Routes`](crate::Routes) are serving, nothing in the request
/// path returns an `Error`. A request that matches nothing is answered with a
/// 404 [`Response`](crate::Response), not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A tier name, directive or override that is unknown or disagrees with
    /// the pattern it was applied to.
    #[error("invalid location type: {0}")]
    InvalidTier(String),

    /// A literal location that does not start with `/` once its directive
    /// prefix has been stripped.
    #[error("location must begin with `/`: {0:?}")]
    InvalidPath(String),

    /// A handler that cannot serve the tier it was registered for.
    #[error("invalid handler for {tier} location {pattern:?}: {reason}")]
    InvalidHandler {
        tier: Tier,
        pattern: String,
        reason: &'static str,
    },

    /// A regular expression that failed to compile.
    #[error("invalid regex {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A bind address that is not `host:port`.
    #[error("invalid socket address {0:?}")]
    InvalidAddress(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
