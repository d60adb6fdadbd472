//! Embedded template loader
//!
//! This module loads LaTeX templates from external files at compile time,
//! embedding them directly in the binary.

/// Proposal template - loaded from templates/proposal.tex
const PROPOSAL_TEMPLATE: &str = include_str!("../../templates/proposal.tex");

/// Customer header template - loaded from templates/customer_header.tex
const CUSTOMER_HEADER_TEMPLATE: &str = include_str!("../../templates/customer_header.tex");

/// Smallest document the toolchain will turn into a PDF.
///
/// Used for environment smoke tests; never passes through Handlebars.
pub const MINIMAL_DOCUMENT: &str = r"\documentclass{article}
\begin{document}
Hello, PDF.
\end{document}
";

/// All embedded templates as `(name, source)` pairs
pub fn embedded_templates() -> &'static [(&'static str, &'static str)] {
    &[
        ("proposal", PROPOSAL_TEMPLATE),
        ("customer_header", CUSTOMER_HEADER_TEMPLATE),
    ]
}

/// Get an embedded template by name
pub fn get_embedded_template(name: &str) -> Option<&'static str> {
    embedded_templates()
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, source)| *source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_templates_are_documents() {
        for (name, source) in embedded_templates() {
            assert!(
                source.contains(r"\begin{document}") && source.contains(r"\end{document}"),
                "{} is not a complete document",
                name
            );
        }
    }

    #[test]
    fn test_get_embedded_template() {
        assert!(get_embedded_template("proposal").is_some());
        assert!(get_embedded_template("nonexistent").is_none());
    }
}
