//! Replacement template normalization
//!
//! Rule files written for older tooling use backslash group references
//! (`\1`, `\g<1>`, `\g<name>`) and escape sequences. `regex` expects `${1}`,
//! so those are rewritten here. Anything already in `$` syntax passes through.
//!
//! In a backslash-style template `$` has no special meaning, so it is escaped
//! to `$$`. In either style a `$` reference to a group the pattern does not
//! have is kept as literal text by [`escape_unknown_groups`].

use regex::Regex;

/// Rewrite backslash references and escapes into `regex` template syntax.
///
/// - `\1`..`\99`, `\g<1>`, `\g<name>` become `${1}` / `${name}`
/// - `\n`, `\t`, `\\` become newline, tab and a single backslash
/// - any other backslash sequence is kept verbatim
/// - if the template has a backslash group reference, every `$` becomes `$$`
pub fn normalize_template(template: &str) -> String {
    if !template.contains('\\') {
        return template.to_owned();
    }

    let backslash_groups = uses_backslash_groups(template);
    let mut out = String::with_capacity(template.len() + 4);
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && backslash_groups {
            out.push_str("$$");
            continue;
        }
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.peek().copied() {
            Some(d @ '1'..='9') => {
                chars.next();
                let mut group = String::from(d);
                if let Some(&next @ '0'..='9') = chars.peek() {
                    chars.next();
                    group.push(next);
                }
                push_group(&mut out, &group);
            }
            Some('g') => {
                let mut lookahead = chars.clone();
                lookahead.next();
                if lookahead.next() == Some('<') {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in lookahead.by_ref() {
                        if c == '>' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if closed && !name.is_empty() && is_group_name(&name) {
                        push_group(&mut out, &name);
                        chars = lookahead;
                        continue;
                    }
                }
                out.push('\\');
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }

    out
}

/// Whether `template` contains `\1`..`\9` or `\g<`, skipping escaped backslashes
fn uses_backslash_groups(template: &str) -> bool {
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            continue;
        }
        match chars.next() {
            Some('1'..='9') => return true,
            Some('g') if chars.peek() == Some(&'<') => return true,
            _ => {}
        }
    }
    false
}

/// Escape `$` references that name no group of `pattern`.
///
/// `regex` expands a reference to a missing group as the empty string, so
/// `price = $5` would delete the match. Such references, and a bare `$`,
/// are turned into literal text instead. `$$` and valid references are kept.
pub fn escape_unknown_groups(template: &str, pattern: &Regex) -> String {
    if !template.contains('$') {
        return template.to_owned();
    }

    let mut out = String::with_capacity(template.len() + 2);
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(escaped) = after.strip_prefix('$') {
            out.push_str("$$");
            rest = escaped;
            continue;
        }

        match group_reference(after) {
            Some((name, len)) if has_group(pattern, name) => {
                out.push('$');
                out.push_str(&after[..len]);
                rest = &after[len..];
            }
            _ => {
                out.push_str("$$");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Group name following a `$`, and the byte length of the reference after the `$`
fn group_reference(after: &str) -> Option<(&str, usize)> {
    if let Some(braced) = after.strip_prefix('{') {
        let end = braced.find('}')?;
        return Some((&braced[..end], end + 2));
    }
    let end = after
        .find(|c: char| c != '_' && !c.is_ascii_alphanumeric())
        .unwrap_or(after.len());
    (end > 0).then(|| (&after[..end], end))
}

fn has_group(pattern: &Regex, name: &str) -> bool {
    match name.parse::<usize>() {
        Ok(index) => index < pattern.captures_len(),
        Err(_) => pattern.capture_names().flatten().any(|n| n == name),
    }
}

fn push_group(out: &mut String, group: &str) {
    out.push_str("${");
    out.push_str(group);
    out.push('}');
}

fn is_group_name(name: &str) -> bool {
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_template_unchanged() {
        assert_eq!(normalize_template("hello"), "hello");
        assert_eq!(normalize_template("$1-$2"), "$1-$2");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(normalize_template(r"\1 and \2"), "${1} and ${2}");
        assert_eq!(normalize_template(r"\12x"), "${12}x");
    }

    #[test]
    fn test_named_references() {
        assert_eq!(normalize_template(r"\g<word>!"), "${word}!");
        assert_eq!(normalize_template(r"\g<2>"), "${2}");
    }

    #[test]
    fn test_unterminated_named_reference_is_literal() {
        assert_eq!(normalize_template(r"\g<word"), r"\g<word");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(normalize_template(r"a\nb\tc\\d"), "a\nb\tc\\d");
    }

    #[test]
    fn test_unknown_escape_kept() {
        assert_eq!(normalize_template(r"\q\0"), r"\q\0");
    }

    #[test]
    fn test_trailing_backslash_kept() {
        assert_eq!(normalize_template("end\\"), "end\\");
    }

    #[test]
    fn test_dollar_is_literal_next_to_backslash_groups() {
        assert_eq!(normalize_template(r"$\1"), "$$${1}");
        assert_eq!(normalize_template(r"\g<n> costs $"), "${n} costs $$");
    }

    #[test]
    fn test_dollar_untouched_without_backslash_groups() {
        assert_eq!(normalize_template(r"$1\n"), "$1\n");
        // an escaped backslash followed by a digit is not a group reference
        assert_eq!(normalize_template(r"\\1 $1"), r"\1 $1");
    }

    #[test]
    fn test_unknown_groups_become_literal() {
        let pattern = Regex::new(r"(\d+)(?<unit>kg)").unwrap();
        assert_eq!(escape_unknown_groups("$5", &pattern), "$$5");
        assert_eq!(escape_unknown_groups("${nope}", &pattern), "$${nope}");
        assert_eq!(escape_unknown_groups("$", &pattern), "$$");
        assert_eq!(escape_unknown_groups("$ 5", &pattern), "$$ 5");
    }

    #[test]
    fn test_known_groups_kept() {
        let pattern = Regex::new(r"(\d+)(?<unit>kg)").unwrap();
        assert_eq!(escape_unknown_groups("$1 $unit", &pattern), "$1 $unit");
        assert_eq!(escape_unknown_groups("${0}${2}", &pattern), "${0}${2}");
        assert_eq!(escape_unknown_groups("$$1", &pattern), "$$1");
    }
}
