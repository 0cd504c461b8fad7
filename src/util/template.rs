//! Certificate rendering: `{{placeholder}}` templates filled from a JSON context.

use handlebars::{Handlebars, Template};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Invalid certificate template: {0}")]
    Syntax(String),
    #[error("Failed to render certificate: {0}")]
    Render(String),
}

/// Renders certificate templates. Values are HTML-escaped and unknown
/// placeholders render as empty strings.
pub struct CertificateRenderer {
    registry: Handlebars<'static>,
}

impl CertificateRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        CertificateRenderer { registry }
    }

    /// Checks that `template` compiles and renders against an empty context.
    ///
    /// Partials, unknown helpers and sections on unregistered names only fail
    /// at render time, so they are caught here rather than on first generate.
    pub fn validate(&self, template: &str) -> Result<(), TemplateError> {
        Template::compile(template).map_err(|e| TemplateError::Syntax(e.to_string()))?;
        self.registry
            .render_template(template, &serde_json::json!({}))
            .map(|_| ())
            .map_err(|e| TemplateError::Syntax(e.to_string()))
    }

    pub fn render<T: Serialize>(&self, template: &str, context: &T) -> Result<String, TemplateError> {
        let html = self.registry.render_template(template, context).map_err(|e| {
            error!("Certificate render failed: {}", e);
            TemplateError::Render(e.to_string())
        })?;
        debug!("Rendered certificate ({} bytes)", html.len());
        Ok(html)
    }
}

impl Default for CertificateRenderer {
    fn default() -> Self {
        Self::new()
    }
}
