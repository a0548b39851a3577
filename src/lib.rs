#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, SvgConfig};
pub use ir::{Border, ChildDirection, Connection, Content, DiagramNode, Side};
pub use layout::auto_layout;
pub use parser::{InputFormat, ParseError, detect_format, parse_input};
pub use render::{render_svg, render_text, render_tree};
pub use theme::Theme;

/// Everything `render` needs besides the source text.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub layout: LayoutConfig,
    pub svg: SvgConfig,
    pub theme: Theme,
    /// `None` sniffs the format from the source.
    pub format: Option<InputFormat>,
    /// Wrap the text in an SVG document.
    pub as_svg: bool,
}

impl RenderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            layout: config.layout,
            svg: config.svg,
            theme: config.theme.clone(),
            ..Self::default()
        }
    }
}

/// Parse, lay out and draw `source` in one call.
pub fn render(source: &str, options: &RenderOptions) -> Result<String, ParseError> {
    let format = options
        .format
        .unwrap_or_else(|| detect_format(None, source));
    let tree = parse_input(source, format)?;
    let text = render_text(&tree, &options.layout);
    if options.as_svg {
        Ok(render_svg(&text, &options.theme, &options.svg))
    } else {
        Ok(text)
    }
}
