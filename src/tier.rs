//! Match tiers.
//!
//! Every location lives in exactly one tier. The tier decides how its pattern
//! is compared against the request path and when, relative to the others, it
//! gets a chance to match.
//!
//! | Tier          | nginx spelling           | Comparison                    |
//! |---------------|--------------------------|-------------------------------|
//! | `File`        | `try_files`              | file exists under a base dir  |
//! | `Exact`       | `location = /path`       | path equality                 |
//! | `StringBreak` | `location ^~ /path`      | prefix, stops regex search    |
//! | `Regex`       | `location ~ regex`       | regex match, first one wins   |
//! | `String`      | `location /path`         | prefix, longest wins          |

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One of the five match strategies.
///
/// Declaration order is evaluation order, see [`Tier::PRECEDENCE`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Tier {
    File,
    Exact,
    StringBreak,
    Regex,
    String,
}

impl Tier {
    /// All tiers, in the order the matcher consults them.
    pub const PRECEDENCE: [Tier; 5] = [
        Tier::File,
        Tier::Exact,
        Tier::StringBreak,
        Tier::Regex,
        Tier::String,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File        => "file",
            Self::Exact       => "exact",
            Self::StringBreak => "string_break",
            Self::Regex       => "regex",
            Self::String      => "string",
        }
    }

    /// Whether `compile()` re-sorts this tier longest-pattern-first.
    pub fn is_length_sorted(self) -> bool {
        matches!(self, Self::Exact | Self::StringBreak | Self::String)
    }

    /// Whether entries in this tier carry a regex rather than a literal.
    pub fn takes_regex(self) -> bool {
        self == Self::Regex
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Accepts the tier names (`"exact"`, `"string_break"`, ...) and the nginx
/// modifiers that select them (`"="`, `"^~"`, `"~"`).
impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" | "try_files"    => Ok(Self::File),
            "exact" | "="           => Ok(Self::Exact),
            "string_break" | "^~"   => Ok(Self::StringBreak),
            "regex" | "~"           => Ok(Self::Regex),
            "string"                => Ok(Self::String),
            _                       => Err(Error::InvalidTier(s.to_owned())),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_follows_declaration_order() {
        let mut sorted = Tier::PRECEDENCE;
        sorted.sort();
        assert_eq!(sorted, Tier::PRECEDENCE);
        for (i, tier) in Tier::PRECEDENCE.iter().enumerate() {
            assert_eq!(tier.index(), i);
        }
    }

    #[test]
    fn parses_names_and_modifiers() {
        assert_eq!("exact".parse::<Tier>().unwrap(), Tier::Exact);
        assert_eq!("=".parse::<Tier>().unwrap(), Tier::Exact);
        assert_eq!("^~".parse::<Tier>().unwrap(), Tier::StringBreak);
        assert_eq!("~".parse::<Tier>().unwrap(), Tier::Regex);
        assert_eq!("string".parse::<Tier>().unwrap(), Tier::String);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "unknown".parse::<Tier>().unwrap_err();
        assert!(matches!(err, Error::InvalidTier(ref s) if s == "unknown"));
        assert!("".parse::<Tier>().is_err());
    }

    #[test]
    fn only_literal_tiers_are_length_sorted() {
        assert!(Tier::Exact.is_length_sorted());
        assert!(Tier::String.is_length_sorted());
        assert!(Tier::StringBreak.is_length_sorted());
        assert!(!Tier::Regex.is_length_sorted());
        assert!(!Tier::File.is_length_sorted());
    }
}
