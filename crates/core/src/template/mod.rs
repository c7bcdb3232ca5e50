//! Template rendering for the prompt and the HTTP request body.

use minijinja::Environment;

/// A template failed to parse or render.
#[derive(Debug, thiserror::Error)]
#[error("template rendering failed: {0}")]
pub struct TemplateError(#[from] minijinja::Error);

/// Renders a Jinja `template` against `context`.
pub fn render(template: &str, context: &serde_json::Value) -> Result<String, TemplateError> {
    let env = Environment::new();
    Ok(env.render_str(template, context)?)
}

/// Escapes a rendered fragment for embedding inside a JSON string value.
///
/// Only newlines and double quotes are rewritten; the body template is
/// trusted to provide the surrounding quoting.
pub fn escape_json_fragment(text: &str) -> String {
    text.replace('\n', "\\n").replace('"', "\\\"")
}
