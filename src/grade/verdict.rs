#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{INVALID_REPLY_EXPLANATION, INVALID_REPLY_SUMMARY};

/// Outcome class of a grading call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictResult {
    /// The submission matches the required reasoning.
    Pass,
    /// The submission contains errors.
    Fail,
    /// The submission answers a different problem, or the model reply could
    /// not be parsed.
    Error,
}

impl Display for VerdictResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerdictResult::Pass => "pass",
            VerdictResult::Fail => "fail",
            VerdictResult::Error => "error",
        };
        f.write_str(s)
    }
}

/// Structured outcome of a grading call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// `pass`, `fail` or `error`
    pub result:           VerdictResult,
    /// Detailed reasoning
    pub full_explanation: String,
    /// Short summary
    pub summary:          String,
}

impl Verdict {
    /// The verdict returned in place of a reply that does not parse.
    pub fn invalid_reply() -> Self {
        Self {
            result:           VerdictResult::Error,
            full_explanation: INVALID_REPLY_EXPLANATION.to_string(),
            summary:          INVALID_REPLY_SUMMARY.to_string(),
        }
    }

    /// Interprets a raw model reply.
    ///
    /// The reply must be a JSON object with string `full_explanation` and
    /// `summary` fields and a `result` of `pass`, `fail` or `error`; extra
    /// fields are ignored and one surrounding markdown code fence is
    /// removed first. Anything else becomes [`Verdict::invalid_reply`].
    pub fn from_reply(raw: &str) -> Self {
        let value = match serde_json::from_str::<Value>(strip_code_fence(raw)) {
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => {
                tracing::warn!("Model reply is JSON but not an object: {}", other);
                return Self::invalid_reply();
            }
            Err(e) => {
                tracing::warn!("Could not parse model reply as JSON: {}", e);
                return Self::invalid_reply();
            }
        };

        match serde_json::from_value::<Verdict>(value) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("Could not parse model reply as a verdict: {}", e);
                Self::invalid_reply()
            }
        }
    }
}

/// Removes one markdown code fence (with optional language tag) around
/// `raw`, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    match inner.split_once('\n') {
        Some((tag, body)) if !tag.contains('{') => body,
        _ => inner,
    }
}
