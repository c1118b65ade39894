//! Strict parsing of raw JSON into the canonical v3 [`GraphConfig`].
//!
//! Parsing is the closed-world boundary: unknown fields anywhere in the
//! payload are rejected (mirroring the original schema's `extra="forbid"`),
//! and `schema_version` must read `"3.0"` literally. Anything else goes
//! through [`crate::upgrader`] first.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::ir::{GraphConfig, SCHEMA_VERSION};

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("payload declares schema_version '{found}', expected '{expected}'")]
    #[diagnostic(code(flowforge::parser::wrong_schema_version))]
    WrongSchemaVersion { found: String, expected: &'static str },

    #[error(transparent)]
    #[diagnostic(code(flowforge::parser::malformed))]
    Malformed(#[from] serde_json::Error),
}

/// Parse a raw JSON value that already claims to be schema v3.
///
/// Rejects anything not versioned exactly `"3.0"` — callers with older or
/// ambiguous payloads should route through [`crate::upgrader::upgrade_graph_config`]
/// instead, which accepts this function's error as a signal to fall back to
/// legacy migration.
pub fn parse_graph_config(raw: &Value) -> Result<GraphConfig, ParseError> {
    if let Some(version) = raw.get("schema_version").and_then(Value::as_str) {
        if version != SCHEMA_VERSION {
            return Err(ParseError::WrongSchemaVersion {
                found: version.to_string(),
                expected: SCHEMA_VERSION,
            });
        }
    }
    let config: GraphConfig = serde_json::from_value(raw.clone())?;
    Ok(config)
}

/// Probe whether a raw payload looks like a v3 config without fully
/// validating it — used by the upgrader to pick a migration path.
#[must_use]
pub fn is_graph_config(raw: &Value) -> bool {
    raw.get("schema_version")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with("3."))
        && raw.get("graph").is_some_and(Value::is_object)
}
