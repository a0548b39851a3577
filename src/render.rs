pub mod boxes;
pub mod canvas;
pub mod geometry;
pub mod glyphs;
pub mod routing;

use crate::config::{LayoutConfig, SvgConfig};
use crate::ir::DiagramNode;
use crate::layout::auto_layout;
use crate::theme::Theme;
use anyhow::Result;
use boxes::draw_box;
use canvas::Canvas;
use geometry::BoxIndex;
use routing::{place_label, route_connection};
use std::fmt::Write as _;
use std::path::Path;
use unicode_width::UnicodeWidthStr;

#[cfg(feature = "png")]
use crate::config::RenderConfig;

/// Lay out `tree` and draw it as newline-joined text.
pub fn render_text(tree: &DiagramNode, config: &LayoutConfig) -> String {
    let laid_out = auto_layout(tree, config);
    render_tree(&laid_out)
}

/// Draw an already laid out tree: boxes first, then every connection,
/// then every label once all lines are on the canvas.
pub fn render_tree(tree: &DiagramNode) -> String {
    let width = usize::try_from(tree.width.unwrap_or(0)).unwrap_or(0);
    let height = usize::try_from(tree.height.unwrap_or(0)).unwrap_or(0);
    let mut canvas = Canvas::new(width, height);

    for node in tree.children() {
        draw_box(&mut canvas, node, node.x.unwrap_or(0), node.y.unwrap_or(0));
    }

    let index = BoxIndex::build(tree.children());
    let mut labels = Vec::new();
    for scope in tree.connection_scopes() {
        for connection in scope {
            if let Some(route) = route_connection(&mut canvas, connection, &index, scope) {
                labels.extend(route.label);
            }
        }
    }
    for slot in &labels {
        if !place_label(&mut canvas, slot) {
            log::debug!(slot:? = slot; "Label did not fit, omitted");
        }
    }
    canvas.to_text()
}

/// Wrap rendered text in a standalone SVG document, one `<text>` per line.
pub fn render_svg(text: &str, theme: &Theme, config: &SvgConfig) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let columns = lines
        .iter()
        .map(|line| UnicodeWidthStr::width(*line))
        .max()
        .unwrap_or(0);
    let width = columns as f32 * config.char_width + config.padding * 2.0;
    let height = lines.len() as f32 * config.line_height + config.padding * 2.0;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.1}\" height=\"{height:.1}\" viewBox=\"0 0 {width:.1} {height:.1}\">"
    );
    let _ = writeln!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_attr(&theme.background)
    );
    let _ = writeln!(
        svg,
        "<g font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_attr(&theme.font_family),
        config.font_size,
        escape_attr(&theme.text_color)
    );
    for (row, line) in lines.iter().enumerate() {
        let y = config.padding + config.font_size + row as f32 * config.line_height;
        let _ = writeln!(
            svg,
            "<text x=\"{:.1}\" y=\"{y:.1}\" xml:space=\"preserve\">{}</text>",
            config.padding,
            escape_xml(line)
        );
    }
    svg.push_str("</g>\n</svg>\n");
    svg
}

pub fn write_output_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))?;
        }
        None => {
            println!("{text}");
        }
    }
    Ok(())
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "DejaVu Sans Mono".to_string();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(input: &str) -> String {
    escape_xml(input).replace('"', "&quot;")
}
