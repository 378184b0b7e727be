//! Variable templating for pre-install scripts.
//!
//! Recipe scripts reference variables with `{{.NAME}}` placeholders (the
//! leading dot and inner whitespace are optional). The same variables are
//! also exported to the probe process environment, so scripts may use
//! `$NAME` instead.
//!
//! # Example
//!
//! ```
//! use recipe_sieve::recipe::{render_script, RecipeVars};
//!
//! let mut vars = RecipeVars::new();
//! vars.insert("MIN_VERSION".to_string(), "11".to_string());
//! let script = render_script("java -version 2>&1 | grep -q {{.MIN_VERSION}}", &vars);
//! assert_eq!(script, "java -version 2>&1 | grep -q 11");
//! ```

use std::collections::{BTreeMap, BTreeSet};

/// Key/value variables handed to a recipe script.
pub type RecipeVars = BTreeMap<String, String>;

/// A segment of a templated script.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Placeholder reference: {{.name}}
    Variable(String),
}

/// Parse a script containing `{{.NAME}}` placeholders.
///
/// Anything between `{{` and `}}` that is not a valid variable name
/// (ASCII alphanumerics and `_`) is kept as literal text, so shell
/// constructs that happen to contain braces survive untouched.
pub fn parse_placeholders(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };

        let inner = after_open[..end].trim();
        let name = inner.strip_prefix('.').unwrap_or(inner);

        literal.push_str(&rest[..start]);
        if is_variable_name(name) {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Variable(name.to_string()));
        } else {
            literal.push_str(&rest[start..start + 2 + end + 2]);
        }
        rest = &after_open[end + 2..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Extract all placeholder names from a script.
pub fn extract_placeholders(input: &str) -> BTreeSet<String> {
    parse_placeholders(input)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Variable(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// Substitute variables into a script.
///
/// Placeholders without a value are left in place verbatim; the script
/// then fails on its own terms rather than running with an empty value.
pub fn render_script(input: &str, vars: &RecipeVars) -> String {
    let mut result = String::with_capacity(input.len());

    for segment in parse_placeholders(input) {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Variable(name) => match vars.get(&name) {
                Some(value) => result.push_str(value),
                None => {
                    tracing::debug!("No value for script placeholder {}", name);
                    result.push_str("{{.");
                    result.push_str(&name);
                    result.push_str("}}");
                }
            },
        }
    }

    result
}

/// Merge recipe-declared variables with caller-supplied overrides.
///
/// Overrides win on key collisions.
pub fn merge_vars(declared: &RecipeVars, overrides: &RecipeVars) -> RecipeVars {
    let mut merged = declared.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> RecipeVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_literal_only() {
        let result = parse_placeholders("echo hello");
        assert_eq!(result, vec![Segment::Literal("echo hello".to_string())]);
    }

    #[test]
    fn parse_dotted_placeholder() {
        let result = parse_placeholders("{{.NAME}}");
        assert_eq!(result, vec![Segment::Variable("NAME".to_string())]);
    }

    #[test]
    fn parse_placeholder_with_whitespace_and_no_dot() {
        let result = parse_placeholders("a {{ NAME }} b");
        assert_eq!(
            result,
            vec![
                Segment::Literal("a ".to_string()),
                Segment::Variable("NAME".to_string()),
                Segment::Literal(" b".to_string()),
            ]
        );
    }

    #[test]
    fn parse_adjacent_placeholders() {
        let result = parse_placeholders("{{.A}}{{.B}}");
        assert_eq!(
            result,
            vec![
                Segment::Variable("A".to_string()),
                Segment::Variable("B".to_string()),
            ]
        );
    }

    #[test]
    fn parse_keeps_non_identifier_braces() {
        let result = parse_placeholders("awk '{{print $1}}'");
        assert_eq!(result, vec![Segment::Literal("awk '{{print $1}}'".to_string())]);
    }

    #[test]
    fn parse_unterminated_placeholder_is_literal() {
        let result = parse_placeholders("echo {{.NAME");
        assert_eq!(result, vec![Segment::Literal("echo {{.NAME".to_string())]);
    }

    #[test]
    fn parse_empty_string() {
        assert!(parse_placeholders("").is_empty());
    }

    #[test]
    fn extract_placeholders_returns_unique_names() {
        let names = extract_placeholders("{{.A}} {{.B}} {{ .A }}");
        assert_eq!(names.len(), 2);
        assert!(names.contains("A"));
        assert!(names.contains("B"));
    }

    #[test]
    fn render_substitutes_known_vars() {
        let rendered = render_script(
            "test -d {{.HOME_DIR}} && echo {{ .USER }}",
            &vars(&[("HOME_DIR", "/home/me"), ("USER", "me")]),
        );
        assert_eq!(rendered, "test -d /home/me && echo me");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        let rendered = render_script("echo {{ MISSING }}", &RecipeVars::new());
        assert_eq!(rendered, "echo {{.MISSING}}");
    }

    #[test]
    fn render_does_not_touch_shell_expansions() {
        let rendered = render_script("echo ${HOME} $PATH", &vars(&[("HOME", "x")]));
        assert_eq!(rendered, "echo ${HOME} $PATH");
    }

    #[test]
    fn merge_prefers_overrides() {
        let merged = merge_vars(
            &vars(&[("A", "declared"), ("B", "kept")]),
            &vars(&[("A", "override")]),
        );
        assert_eq!(merged.get("A"), Some(&"override".to_string()));
        assert_eq!(merged.get("B"), Some(&"kept".to_string()));
    }
}
