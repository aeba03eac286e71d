use crate::domain::ExportError;
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

static TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("report", include_str!("report.hbs"));
    m
});

/// Render a bundled template by name. Missing variables are an error.
pub fn render(name: &str, ctx: &Value) -> Result<String, ExportError> {
    let template = TEMPLATES
        .get(name)
        .ok_or_else(|| ExportError::Template(format!("unknown template '{name}'")))?;

    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);

    Ok(hb.render_template(template, ctx)?)
}
