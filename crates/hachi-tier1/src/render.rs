// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `{name}` placeholder substitution shared by trees and rule templates.

use std::collections::HashMap;

/// Names of every `{placeholder}` in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                if is_name(name) {
                    names.push(name);
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

/// Substitute `{name}` with `vars[name]`.
///
/// Unknown names render as `[name]` so a half-filled template is visible
/// rather than silently dropping words. Braces that do not wrap a plain
/// identifier are copied through unchanged.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_name(&after[..close]) => {
                let name = &after[..close];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('[');
                        out.push_str(name);
                        out.push(']');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Whether every placeholder in `template` has a non-empty value.
pub fn is_satisfied(template: &str, vars: &HashMap<String, String>) -> bool {
    placeholders(template)
        .into_iter()
        .all(|name| vars.get(name).is_some_and(|v| !v.trim().is_empty()))
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_names() {
        let v = vars(&[("word", "kippu"), ("meaning", "ticket")]);
        assert_eq!(render("{word} means {meaning}.", &v), "kippu means ticket.");
    }

    #[test]
    fn missing_names_render_bracketed() {
        assert_eq!(render("Go to {place}.", &HashMap::new()), "Go to [place].");
    }

    #[test]
    fn non_identifier_braces_pass_through() {
        let v = vars(&[("a", "1")]);
        assert_eq!(render("{ not a var } {a} {", &v), "{ not a var } 1 {");
    }

    #[test]
    fn satisfied_requires_non_empty_values() {
        let v = vars(&[("word", "eki"), ("meaning", " ")]);
        assert!(is_satisfied("{word}", &v));
        assert!(!is_satisfied("{word} {meaning}", &v));
        assert_eq!(placeholders("{word} and {meaning}"), vec!["word", "meaning"]);
    }
}
