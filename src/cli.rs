use crate::config::load_config;
use crate::layout::auto_layout;
use crate::layout_dump::write_layout_dump;
use crate::parser::{InputFormat, detect_format, parse_input};
use crate::render::{render_svg, render_tree, write_output_svg, write_output_text};
use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "archgrid",
    version,
    about = "Render box-and-arrow diagrams as character grids"
)]
pub struct Args {
    /// Input file (.json, .yaml, .mmd, .md) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Text and SVG go to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Input format
    #[arg(short = 'f', long = "format", value_enum, default_value = "auto")]
    pub format: FormatArg,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout, svg, theme, themeVariables)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Theme name, overriding the config file
    #[arg(long = "theme")]
    pub theme: Option<String>,

    /// Write the laid out tree as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,

    /// PNG viewport width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// PNG viewport height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Auto,
    Json,
    Yaml,
    Mermaid,
}

impl FormatArg {
    fn forced(self) -> Option<InputFormat> {
        match self {
            Self::Auto => None,
            Self::Json => Some(InputFormat::Json),
            Self::Yaml => Some(InputFormat::Yaml),
            Self::Mermaid => Some(InputFormat::Mermaid),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Svg,
    Png,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }
}

/// One diagram pulled from the input, with the format its fence implies.
#[derive(Debug, Clone, PartialEq)]
struct Diagram {
    source: String,
    hint: Option<InputFormat>,
}

pub fn run(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())
        .context("Failed to load config file")?;
    config.render.width = args.width;
    config.render.height = args.height;
    if let Some(name) = args.theme.as_deref() {
        config.theme =
            Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("Unknown theme `{name}`"))?;
    }

    let (input, is_markdown) = read_input(args.input.as_deref())?;
    let diagrams = if is_markdown {
        extract_diagram_blocks(&input)
    } else {
        vec![Diagram {
            source: input,
            hint: None,
        }]
    };

    if diagrams.is_empty() {
        return Err(anyhow::anyhow!("No diagrams found in input"));
    }
    log::info!(count = diagrams.len(); "Rendering diagrams");

    let outputs = if diagrams.len() == 1 {
        let output = match args.output_format {
            OutputFormat::Png => Some(ensure_output(&args.output, "png")?),
            _ => args.output.clone(),
        };
        vec![output]
    } else {
        resolve_multi_outputs(args.output.as_deref(), args.output_format, diagrams.len())?
            .into_iter()
            .map(Some)
            .collect()
    };

    for (idx, (diagram, output)) in diagrams.iter().zip(outputs).enumerate() {
        let format = args
            .format
            .forced()
            .or(diagram.hint)
            .unwrap_or_else(|| detect_format(args.input.as_deref(), &diagram.source));
        log::debug!(diagram = idx, format:? = format; "Parsing diagram");
        let tree = parse_input(&diagram.source, format)
            .with_context(|| format!("Failed to parse diagram {}", idx + 1))?;
        let laid_out = auto_layout(&tree, &config.layout);

        if let Some(dump_path) = args.dump_layout.as_deref() {
            let dump_path = numbered_path(dump_path, idx, diagrams.len(), "json");
            write_layout_dump(&dump_path, &laid_out)?;
        }

        let text = render_tree(&laid_out);
        match args.output_format {
            OutputFormat::Text => write_output_text(&text, output.as_deref())?,
            OutputFormat::Svg => {
                let svg = render_svg(&text, &config.theme, &config.svg);
                write_output_svg(&svg, output.as_deref())?;
            }
            OutputFormat::Png => {
                let output = output.ok_or_else(|| anyhow::anyhow!("Output path required"))?;
                let svg = render_svg(&text, &config.theme, &config.svg);
                write_png(&svg, &output, &config.render)?;
            }
        }
    }

    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, render: &crate::config::RenderConfig) -> Result<()> {
    crate::render::write_output_png(svg, output, render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _render: &crate::config::RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires archgrid built with the `png` feature"
    ))
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let is_md = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| matches!(ext, "md" | "markdown"))
            .unwrap_or(false);
        return Ok((content, is_md));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn extract_diagram_blocks(input: &str) -> Vec<Diagram> {
    let mut blocks = Vec::new();
    let mut open: Option<(String, Option<InputFormat>)> = None;
    let mut current = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim();
        match &open {
            None => {
                if let Some(start) = detect_diagram_fence(trimmed) {
                    open = Some(start);
                }
            }
            Some((fence, hint)) => {
                if is_fence_end(trimmed, fence) {
                    blocks.push(Diagram {
                        source: current.join("\n"),
                        hint: *hint,
                    });
                    current.clear();
                    open = None;
                } else {
                    current.push(line);
                }
            }
        }
    }

    if open.is_some() {
        log::warn!(lines = current.len(); "Unterminated diagram block ignored");
    }
    blocks
}

/// Recognise an opening fence tagged `archgrid` or `mermaid`.
fn detect_diagram_fence(line: &str) -> Option<(String, Option<InputFormat>)> {
    for marker in ['`', '~', ':'] {
        let fence: String = std::iter::repeat_n(marker, 3).collect();
        if !line.starts_with(&fence) {
            continue;
        }
        let rest = line.trim_start_matches(marker).trim();
        if rest.starts_with("archgrid") {
            return Some((fence, None));
        }
        if rest.starts_with("mermaid") {
            return Some((fence, Some(InputFormat::Mermaid)));
        }
    }
    None
}

fn is_fence_end(line: &str, fence: &str) -> bool {
    if !line.starts_with(fence) {
        return false;
    }
    line[fence.len()..].trim().is_empty()
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for markdown input"))?;
    if base.is_dir() {
        return Ok((0..count)
            .map(|idx| base.join(format!("diagram-{}.{}", idx + 1, ext)))
            .collect());
    }
    Ok((0..count)
        .map(|idx| numbered_path(base, idx, count, ext))
        .collect())
}

/// `out.svg` becomes `out-2.svg` when more than one diagram is written.
fn numbered_path(base: &Path, idx: usize, count: usize, ext: &str) -> PathBuf {
    if count == 1 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("diagram");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}-{}.{}", stem, idx + 1, ext))
}
