//! Escaping of untrusted data before it is embedded in LaTeX source
//!
//! Every string leaf of a JSON tree is passed through [`escape_latex`];
//! everything else keeps its shape. Object keys are left alone since
//! templates address them by name and they never reach the output.

use serde_json::{Map, Value};

/// Escape sequences emitted for the LaTeX control characters.
///
/// Order matters only for lookup: the multi-character forms must be tried
/// before the short `\X` forms so a re-escaped string is recognised as-is.
const ESCAPES: &[(char, &str)] = &[
    ('\\', r"\textbackslash{}"),
    ('~', r"\textasciitilde{}"),
    ('^', r"\textasciicircum{}"),
    ('&', r"\&"),
    ('%', r"\%"),
    ('$', r"\$"),
    ('#', r"\#"),
    ('_', r"\_"),
    ('{', r"\{"),
    ('}', r"\}"),
];

/// Return a structurally identical tree with every string leaf escaped.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_latex(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| (key.clone(), sanitize(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

/// Escape LaTeX control characters in a single left-to-right pass.
///
/// An escape sequence this function would itself produce is copied through
/// untouched, so each raw character is escaped exactly once and the function
/// is idempotent.
///
/// This is lossy for input that already contains such a sequence: a user
/// who literally types `\%` gets `\%` back, which typesets as `%` and drops
/// the backslash. Use `\textbackslash{}` in the input to keep one.
pub fn escape_latex(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if c == '\\' {
            if let Some(seq) = leading_escape(rest) {
                out.push_str(seq);
                rest = &rest[seq.len()..];
                continue;
            }
        }

        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, escaped)) => out.push_str(escaped),
            None => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// The escape sequence `s` starts with, if any.
fn leading_escape(s: &str) -> Option<&'static str> {
    ESCAPES
        .iter()
        .map(|(_, escaped)| *escaped)
        .find(|escaped| s.starts_with(escaped))
}
