use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Spacing and minimum sizes used by auto-layout, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub default_h_gap: i32,
    pub v_gap: i32,
    pub pad_left: i32,
    pub pad_top: i32,
    pub min_box_width: i32,
    pub min_box_height: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_h_gap: 6,
            v_gap: 1,
            pad_left: 2,
            pad_top: 1,
            min_box_width: 8,
            min_box_height: 3,
        }
    }
}

impl LayoutConfig {
    /// Clamp values into the range the layout relies on.
    pub fn normalized(self) -> Self {
        Self {
            default_h_gap: self.default_h_gap.max(1),
            v_gap: self.v_gap.max(1),
            pad_left: self.pad_left.max(0),
            pad_top: self.pad_top.max(0),
            min_box_width: self.min_box_width.max(2),
            min_box_height: self.min_box_height.max(2),
        }
    }
}

/// Font metrics for the SVG wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SvgConfig {
    pub font_size: f32,
    pub char_width: f32,
    pub line_height: f32,
    pub padding: f32,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            char_width: 8.4,
            line_height: 18.0,
            padding: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub svg: SvgConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    svg: Option<SvgConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(_) => json5::from_str(contents)?,
    };

    if let Some(theme_name) = parsed.theme.as_deref() {
        match Theme::by_name(theme_name) {
            Some(theme) => config.theme = theme,
            None => log::warn!(theme_name; "Unknown theme, keeping the default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.svg.font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        config.layout = layout.normalized();
    }
    if let Some(svg) = parsed.svg {
        config.svg = svg;
    }

    Ok(config)
}
