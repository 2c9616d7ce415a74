//! Rules file parsing
//!
//! Format, one rule per line:
//!
//! ```text
//! # comment
//! teh = the
//! (\d+)kg = $1 kilograms
//! ```
//!
//! The separator is a `=` with whitespace on both sides. Bad lines are reported
//! and skipped; they never stop the rest of the file from loading.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{ReplacementRule, RuleEngine};

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+=\s+").expect("valid rule separator regex"));

/// Problems found while loading rules
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("line {line}: expected `pattern = replacement`")]
    MissingSeparator { line: usize },

    #[error("line {line}: invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read rules file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RuleError {
    /// 1-based line number the error refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            RuleError::MissingSeparator { line } | RuleError::InvalidPattern { line, .. } => {
                Some(*line)
            }
            RuleError::Io { .. } => None,
        }
    }
}

/// Result of parsing a rules source: the usable rules plus per-line diagnostics
#[derive(Debug, Default)]
pub struct ParsedRules {
    pub engine: RuleEngine,
    pub errors: Vec<RuleError>,
}

/// Parse a single line.
///
/// Returns `None` for blank and comment lines. `line` is 1-based.
pub fn parse_rule_line(line: usize, text: &str) -> Option<Result<ReplacementRule, RuleError>> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return None;
    }

    let mut parts = SEPARATOR.splitn(text, 2);
    let (Some(pattern), Some(replacement)) = (parts.next(), parts.next()) else {
        return Some(Err(RuleError::MissingSeparator { line }));
    };
    let (pattern, replacement) = (pattern.trim(), replacement.trim());

    Some(
        ReplacementRule::compile(pattern, replacement).map_err(|source| {
            RuleError::InvalidPattern {
                line,
                pattern: pattern.to_owned(),
                source,
            }
        }),
    )
}

/// Parse a whole rules file's contents
pub fn parse_rules(content: &str) -> ParsedRules {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut rules = Vec::new();
    let mut errors = Vec::new();

    for (idx, text) in content.lines().enumerate() {
        match parse_rule_line(idx + 1, text) {
            Some(Ok(rule)) => rules.push(rule),
            Some(Err(e)) => errors.push(e),
            None => {}
        }
    }

    ParsedRules {
        engine: RuleEngine::new(rules),
        errors,
    }
}

/// Read and parse a rules file
pub fn load_rules_file(path: &Path) -> Result<ParsedRules, RuleError> {
    let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_rules(&content))
}

/// Load rules for the server, logging every loaded rule and every problem.
///
/// A missing or unreadable file yields an empty engine; rule errors are never
/// fatal.
pub fn load_rules(path: Option<&Path>) -> RuleEngine {
    let Some(path) = path else {
        tracing::warn!("No rules file found, text will be sent unchanged");
        return RuleEngine::empty();
    };

    if !path.exists() {
        tracing::warn!(
            "Rules file not found at {}, text will be sent unchanged",
            path.display()
        );
        return RuleEngine::empty();
    }

    let parsed = match load_rules_file(path) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("{}", e);
            return RuleEngine::empty();
        }
    };

    for e in &parsed.errors {
        tracing::warn!("Skipping rule in {}: {}", path.display(), e);
    }
    for rule in parsed.engine.rules() {
        tracing::info!("Loaded rule: {} → {}", rule.pattern(), rule.replacement());
    }
    tracing::info!(
        "Loaded {} rule(s) from {}",
        parsed.engine.len(),
        path.display()
    );

    parsed.engine
}
