//! Template registry and rendering
//!
//! Templates are registered once when the renderer is built and never
//! change afterwards, so a single renderer can be shared across requests.

use std::path::Path;

use handlebars::Handlebars;
use serde_json::Value;

use super::embedded::{embedded_templates, MINIMAL_DOCUMENT};
use crate::engine::EngineError;

/// Top-level key that requests the built-in smoke-test document
pub const MINIMAL_FLAG: &str = "_minimal";

/// True if the data tree asks for the minimal document instead of a template
pub fn is_minimal_request(data: &Value) -> bool {
    data.get(MINIMAL_FLAG)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Renders sanitized data trees into LaTeX source
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("templates", &self.list())
            .finish()
    }
}

impl TemplateRenderer {
    /// Build a renderer with the embedded templates only
    pub fn embedded() -> Result<Self, EngineError> {
        Self::new(None)
    }

    /// Build a renderer with the embedded templates, then every `*.tex` file
    /// in `template_dir` keyed by file stem (replacing embedded ones).
    pub fn new(template_dir: Option<&Path>) -> Result<Self, EngineError> {
        let mut registry = Handlebars::new();
        // Output is LaTeX, not HTML; escaping is done by the sanitizer.
        registry.register_escape_fn(handlebars::no_escape);

        for (name, source) in embedded_templates() {
            register(&mut registry, name, source)?;
        }

        if let Some(dir) = template_dir {
            load_directory(&mut registry, dir)?;
        }

        tracing::info!(
            templates = registry.get_templates().len(),
            "Template registry ready"
        );

        Ok(Self { registry })
    }

    /// Names of all registered templates, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.get_templates().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a template with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Render `data` (already sanitized) into LaTeX source.
    ///
    /// A minimal request bypasses the template entirely.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, EngineError> {
        if is_minimal_request(data) {
            return Ok(MINIMAL_DOCUMENT.to_string());
        }

        if !self.contains(name) {
            return Err(EngineError::TemplateNotFound(name.to_string()));
        }

        self.registry
            .render(name, data)
            .map_err(|e| EngineError::Template(format!("{}: {}", name, e)))
    }
}

fn register(registry: &mut Handlebars<'static>, name: &str, source: &str) -> Result<(), EngineError> {
    registry
        .register_template_string(name, source)
        .map_err(|e| EngineError::Template(format!("{}: {}", name, e)))
}

fn load_directory(registry: &mut Handlebars<'static>, dir: &Path) -> Result<(), EngineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        EngineError::Template(format!("cannot read template dir {}: {}", dir.display(), e))
    })?;

    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tex") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let source = std::fs::read_to_string(&path)?;
        register(registry, name, &source)?;
        tracing::debug!(template = name, path = %path.display(), "Loaded template override");
    }

    Ok(())
}
