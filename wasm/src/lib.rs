use archgrid::{InputFormat, RenderOptions, Theme, render};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArchgridRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    /// `json`, `yaml` or `mermaid`; sniffed from the source when absent.
    format: Option<String>,
    svg: Option<bool>,
}

fn build_render_options(options: ArchgridRenderOptions) -> Result<RenderOptions, String> {
    let mut render_options = RenderOptions::default();

    if let Some(name) = options.theme.as_deref() {
        render_options.theme =
            Theme::by_name(name).ok_or_else(|| format!("unknown theme `{name}`"))?;
    }
    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.svg.font_size = font_size;
    }
    if let Some(format) = options.format.as_deref() {
        render_options.format = Some(
            InputFormat::from_name(format).ok_or_else(|| format!("unknown format `{format}`"))?,
        );
    }
    render_options.as_svg = options.svg.unwrap_or(false);

    Ok(render_options)
}

/// Render a diagram source to text, or to SVG when `{"svg": true}` is passed.
#[wasm_bindgen]
pub fn render_archgrid(source: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<ArchgridRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        ArchgridRenderOptions::default()
    };

    let render_options =
        build_render_options(options).map_err(|error| JsValue::from_str(&error))?;
    render(source, &render_options).map_err(|error| JsValue::from_str(&error.to_string()))
}
