//! Branch identity shared by the tracker and the build server.
//!
//! A [`BranchKey`] is the canonical form of a raw ref. Both services are
//! matched against it: candidate dedup, the tracker's branch field and the
//! build server's `branchName` all compare `BranchKey`s, never raw strings.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Version-control prefix stripped from raw refs.
pub const REF_PREFIX: &str = "refs/heads/";

const FEATURE_PREFIX: &str = "feature/";
const KEPT_SEGMENT_PREFIXES: [&str; 2] = ["dev-", "static-"];

static TICKET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fn-[0-9]{2,5}").unwrap());

/// Canonical branch identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchKey(String);

impl BranchKey {
    /// Strip the `refs/heads/` prefix. Returns `None` for empty input.
    ///
    /// The prefix is removed until it no longer leads the string, so
    /// `normalize` applied to its own output is a no-op.
    pub fn normalize(raw: &str) -> Option<Self> {
        let mut name = raw;
        while let Some(rest) = name.strip_prefix(REF_PREFIX) {
            name = rest;
        }
        if name.is_empty() {
            None
        } else {
            Some(BranchKey(name.to_string()))
        }
    }

    /// Display/URL variant used for environment domains.
    ///
    /// Lower-cases the normalized name and, per dot-separated segment, reduces
    /// a segment carrying a ticket code (`fn-1234`) to that code, keeping a
    /// leading `dev-` or `static-`. Any `feature/` is dropped.
    ///
    /// `feature/Dev-FN-1234.something` becomes `dev-fn-1234.something`.
    pub fn normalize_for_display(raw: &str) -> Option<Self> {
        let key = Self::normalize(raw)?;
        let lowered = key.0.to_lowercase();

        let segments: Vec<String> = lowered
            .split('.')
            .map(|segment| {
                let segment = segment.replace(FEATURE_PREFIX, "");
                match TICKET_REGEX.find(&segment) {
                    Some(ticket) => {
                        let kept = KEPT_SEGMENT_PREFIXES
                            .iter()
                            .find(|prefix| segment.starts_with(**prefix))
                            .copied()
                            .unwrap_or("");
                        format!("{}{}", kept, ticket.as_str())
                    }
                    None => segment,
                }
            })
            .collect();

        let joined = segments.join(".").replace(FEATURE_PREFIX, "");
        if joined.is_empty() {
            None
        } else {
            Some(BranchKey(joined))
        }
    }

    /// The canonical name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name begins with `prefix` (case-sensitive).
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for BranchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BranchKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
