mod mermaid;
mod validate;

pub use mermaid::parse_mermaid;
pub use validate::{ValidationIssue, check_references, validate};

use crate::ir::DiagramNode;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid diagram document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid JSON: {0}")]
    Json5(#[from] json5::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("diagram failed validation:\n{}", format_issues(.0))]
    Invalid(Vec<ValidationIssue>),
    #[error("mermaid line {line}: {message}")]
    Mermaid { line: usize, message: String },
    #[error("input is empty")]
    Empty,
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Yaml,
    Mermaid,
}

impl InputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" | "json5" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "mermaid" | "mmd" => Some(Self::Mermaid),
            _ => None,
        }
    }
}

/// Pick a front-end from the file extension, falling back to the content.
pub fn detect_format(path: Option<&Path>, text: &str) -> InputFormat {
    if let Some(format) = path
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .and_then(|ext| match ext.to_ascii_lowercase().as_str() {
            "mermaid" => Some(InputFormat::Mermaid),
            other => InputFormat::from_name(other),
        })
    {
        return format;
    }
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        return InputFormat::Json;
    }
    let first = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("%%"))
        .unwrap_or("");
    let lower = first.to_ascii_lowercase();
    if lower.starts_with("flowchart") || lower.starts_with("graph") {
        InputFormat::Mermaid
    } else {
        InputFormat::Yaml
    }
}

pub fn parse_input(text: &str, format: InputFormat) -> Result<DiagramNode, ParseError> {
    match format {
        InputFormat::Json => parse_json(text),
        InputFormat::Yaml => parse_yaml(text),
        InputFormat::Mermaid => parse_mermaid(text),
    }
}

/// Strict JSON first; relaxed JSON5 (comments, trailing commas) if that fails.
pub fn parse_json(text: &str) -> Result<DiagramNode, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(strict) => {
            log::debug!(error:% = strict; "Strict JSON parse failed, retrying as JSON5");
            json5::from_str::<Value>(text)?
        }
    };
    from_document(value)
}

pub fn parse_yaml(text: &str) -> Result<DiagramNode, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let value: Value = serde_yaml::from_str(text)?;
    from_document(value)
}

/// Validate a raw document, then convert it into a tree.
pub fn from_document(value: Value) -> Result<DiagramNode, ParseError> {
    let issues = validate(&value);
    if !issues.is_empty() {
        return Err(ParseError::Invalid(issues));
    }
    let tree: DiagramNode = serde_json::from_value(value)?;
    check_references(&tree);
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Border, ChildDirection, Content, Side};

    #[test]
    fn detects_format_by_extension_then_content() {
        assert_eq!(
            detect_format(Some(Path::new("a.yml")), "{}"),
            InputFormat::Yaml
        );
        assert_eq!(
            detect_format(Some(Path::new("a.mmd")), ""),
            InputFormat::Mermaid
        );
        assert_eq!(detect_format(None, "  {\"children\": []}"), InputFormat::Json);
        assert_eq!(
            detect_format(None, "%% comment\nflowchart LR\nA-->B"),
            InputFormat::Mermaid
        );
        assert_eq!(detect_format(None, "children:\n  - a"), InputFormat::Yaml);
    }

    #[test]
    fn parses_json_tree() {
        let text = r#"{
            "childDirection": "vertical",
            "children": [
                {"id": "a", "children": "Alpha", "border": "double", "shadow": true},
                {"id": "b", "children": ["one", "two"], "title": "B"}
            ],
            "connections": [{"from": "a", "to": "b", "label": "calls", "fromSide": "bottom"}]
        }"#;
        let tree = parse_json(text).unwrap();
        assert_eq!(tree.child_direction, ChildDirection::Vertical);
        let a = &tree.children()[0];
        assert_eq!(a.border, Border::Double);
        assert!(a.shadow);
        assert_eq!(a.content, Content::Text("Alpha".to_string()));
        let b = &tree.children()[1];
        assert_eq!(b.text_lines(), vec!["one", "two"]);
        assert_eq!(tree.connections[0].from_side, Some(Side::Bottom));
        assert_eq!(tree.connections[0].to_side, None);
    }

    #[test]
    fn relaxed_json_is_accepted() {
        let text = "{ // services\n children: [{ id: 'a', children: 'A', },], }";
        let tree = parse_json(text).unwrap();
        assert_eq!(tree.children().len(), 1);
    }

    #[test]
    fn broken_json_reports_a_syntax_error() {
        let err = parse_json("{\"children\": [").unwrap_err();
        assert!(matches!(err, ParseError::Json5(_)));
    }

    #[test]
    fn parses_yaml_tree() {
        let text = "children:\n  - id: a\n    children: A\n  - id: b\n    children: B\nconnections:\n  - from: a\n    to: b\n";
        let tree = parse_yaml(text).unwrap();
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.connections.len(), 1);
    }

    #[test]
    fn invalid_documents_list_every_problem() {
        let text = r#"{"children": [{"border": "wavy", "width": 0}, 5], "connections": [{"from": 1}]}"#;
        let Err(ParseError::Invalid(issues)) = parse_json(text) else {
            panic!("expected validation failure");
        };
        let paths: Vec<&str> = issues.iter().map(|issue| issue.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/children/0/border",
                "/children/0/width",
                "/children/1",
                "/connections/0/from",
                "/connections/0/to",
            ]
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse_json("  "), Err(ParseError::Empty)));
        assert!(matches!(parse_yaml(""), Err(ParseError::Empty)));
        assert!(matches!(parse_mermaid("\n"), Err(ParseError::Empty)));
    }
}
