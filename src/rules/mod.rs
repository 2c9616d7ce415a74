//! Regex replacement rules applied to inbound text
//!
//! Rules come from a plain text file with one `pattern = replacement` per line.
//! They are applied in file order, each rule seeing the output of the one
//! before it, so `a = b` followed by `b = c` turns "a" into "c".

mod loader;
mod template;

pub use loader::{
    load_rules, load_rules_file, parse_rule_line, parse_rules, ParsedRules, RuleError,
};
pub use template::{escape_unknown_groups, normalize_template};

use regex::Regex;

/// Default rules file name, looked up next to the executable and in the config dir
pub const RULES_FILE_NAME: &str = "hot-rule.txt";

/// A compiled pattern and the template that replaces its matches
#[derive(Debug, Clone)]
pub struct ReplacementRule {
    pattern: Regex,
    replacement: String,
}

impl ReplacementRule {
    /// Build a rule from an already compiled pattern.
    ///
    /// The replacement uses the `regex` crate's `$1` / `${name}` syntax as-is.
    pub fn new(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
        }
    }

    /// Compile a rule from its textual form.
    ///
    /// Backslash group references (`\1`, `\g<name>`) in the replacement are
    /// rewritten to `${1}` / `${name}` first. References to groups the pattern
    /// lacks are kept as literal text.
    pub fn compile(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(pattern)?;
        let replacement = escape_unknown_groups(&normalize_template(replacement), &pattern);
        Ok(Self::new(pattern, replacement))
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every non-overlapping match in `text`
    pub fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

/// Ordered, immutable list of replacement rules
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<ReplacementRule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<ReplacementRule>) -> Self {
        Self { rules }
    }

    /// An engine with no rules: `apply` is the identity
    pub fn empty() -> Self {
        Self::default()
    }

    /// Run `text` through every rule in order
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_owned(), |current, rule| rule.apply(&current))
    }

    /// Number of characters `apply(text)` produces.
    ///
    /// Counts Unicode scalar values, which is what a Backspace removes in
    /// the common case.
    pub fn applied_len(&self, text: &str) -> usize {
        self.apply(text).chars().count()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(rules: &[(&str, &str)]) -> RuleEngine {
        RuleEngine::new(
            rules
                .iter()
                .map(|(p, r)| ReplacementRule::compile(p, r).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_empty_engine_is_identity() {
        let rules = RuleEngine::empty();
        assert_eq!(rules.apply("hello world"), "hello world");
        assert_eq!(rules.apply(""), "");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_rules_compose_in_order() {
        let rules = engine(&[("a", "b"), ("b", "c")]);
        assert_eq!(rules.apply("a"), "c");
    }

    #[test]
    fn test_rule_order_matters() {
        let rules = engine(&[("b", "c"), ("a", "b")]);
        assert_eq!(rules.apply("a"), "b");
    }

    #[test]
    fn test_replaces_all_matches() {
        let rules = engine(&[("o", "0")]);
        assert_eq!(rules.apply("foo boo"), "f00 b00");
    }

    #[test]
    fn test_capture_group_reference() {
        let rules = engine(&[(r"(\w+)@(\w+)", "$2 at $1")]);
        assert_eq!(rules.apply("me@home"), "home at me");
    }

    #[test]
    fn test_legacy_group_reference() {
        let rules = engine(&[(r"(\d+)kg", r"\1 kilograms")]);
        assert_eq!(rules.apply("5kg"), "5 kilograms");
    }

    #[test]
    fn test_dollar_before_legacy_reference_is_literal() {
        let rules = engine(&[(r"(\d+)usd", r"$\1")]);
        assert_eq!(rules.apply("5usd"), "$5");
        assert_eq!(rules.applied_len("5usd"), 2);
    }

    #[test]
    fn test_reference_to_missing_group_is_literal() {
        let rules = engine(&[("price", "$5")]);
        assert_eq!(rules.apply("the price"), "the $5");
    }

    #[test]
    fn test_empty_match_terminates() {
        let rules = engine(&[("x*", "-")]);
        assert_eq!(rules.apply("ab"), "-a-b-");
    }

    #[test]
    fn test_applied_len_counts_chars() {
        let rules = engine(&[("hello", "你好!")]);
        assert_eq!(rules.applied_len("hello"), 3);
    }

    #[test]
    fn test_apply_is_deterministic() {
        let rules = engine(&[(r"\s+", " "), ("teh", "the")]);
        let first = rules.apply("teh   cat");
        let second = rules.apply("teh   cat");
        assert_eq!(first, "the cat");
        assert_eq!(first, second);
    }
}
