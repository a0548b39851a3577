use crate::ir::{Border, ChildDirection, DiagramNode, Side};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// One schema problem, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Largest coordinate or size a document may give a box.
pub const MAX_EXTENT: i64 = 10_000;

fn pointer(path: &str, key: &str) -> String {
    format!("{path}/{}", key.replace('~', "~0").replace('/', "~1"))
}

/// Check a raw diagram document; an empty result means it converts cleanly.
pub fn validate(document: &Value) -> Vec<ValidationIssue> {
    let mut issues = Issues(Vec::new());
    validate_node(document, "", &mut issues);
    issues.0
}

fn validate_node(value: &Value, path: &str, issues: &mut Issues) {
    let Some(object) = value.as_object() else {
        issues.push(path, "box must be an object");
        return;
    };
    for (key, field) in object {
        let at = pointer(path, key);
        match key.as_str() {
            "id" | "title" => expect_string(field, &at, issues),
            "children" | "content" => validate_content(field, &at, issues),
            "border" => expect_name(field, &at, issues, "border", |name| {
                Border::from_name(name).is_some()
            }),
            "childDirection" => expect_name(field, &at, issues, "child direction", |name| {
                ChildDirection::from_name(name).is_some()
            }),
            "shadow" | "disabled" => {
                if !field.is_boolean() {
                    issues.push(&at, "must be a boolean");
                }
            }
            "x" | "y" => expect_integer(field, &at, issues, -MAX_EXTENT),
            "width" | "height" => expect_integer(field, &at, issues, 1),
            "connections" => validate_connections(field, &at, issues),
            _ => {}
        }
    }
}

fn validate_content(field: &Value, path: &str, issues: &mut Issues) {
    match field {
        Value::Null | Value::String(_) => {}
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                match item {
                    Value::String(_) => {}
                    Value::Object(_) => validate_node(item, &format!("{path}/{idx}"), issues),
                    _ => issues.push(&format!("{path}/{idx}"), "must be a string or a box"),
                }
            }
        }
        _ => issues.push(path, "must be a string, an array or null"),
    }
}

fn validate_connections(field: &Value, path: &str, issues: &mut Issues) {
    let Some(items) = field.as_array() else {
        issues.push(path, "must be an array");
        return;
    };
    for (idx, item) in items.iter().enumerate() {
        let at = format!("{path}/{idx}");
        let Some(connection) = item.as_object() else {
            issues.push(&at, "connection must be an object");
            continue;
        };
        validate_connection(connection, &at, issues);
    }
}

fn validate_connection(connection: &Map<String, Value>, path: &str, issues: &mut Issues) {
    for endpoint in ["from", "to"] {
        let at = pointer(path, endpoint);
        match connection.get(endpoint) {
            Some(Value::String(_)) => {}
            Some(_) => issues.push(&at, "must be a string"),
            None => issues.push(&at, "is required"),
        }
    }
    if let Some(label) = connection.get("label") {
        expect_string(label, &pointer(path, "label"), issues);
    }
    for key in ["fromSide", "toSide"] {
        if let Some(side) = connection.get(key) {
            expect_name(side, &pointer(path, key), issues, "side", |name| {
                Side::from_name(name).is_some()
            });
        }
    }
}

fn expect_string(field: &Value, path: &str, issues: &mut Issues) {
    if !field.is_string() && !field.is_null() {
        issues.push(path, "must be a string");
    }
}

fn expect_name(
    field: &Value,
    path: &str,
    issues: &mut Issues,
    what: &str,
    known: impl Fn(&str) -> bool,
) {
    match field {
        Value::Null => {}
        Value::String(name) if known(name) => {}
        Value::String(name) => issues.push(path, format!("unknown {what} `{name}`")),
        _ => issues.push(path, "must be a string"),
    }
}

fn expect_integer(field: &Value, path: &str, issues: &mut Issues, min: i64) {
    if field.is_null() {
        return;
    }
    match field.as_i64() {
        Some(value) if (min..=MAX_EXTENT).contains(&value) => {}
        Some(_) => issues.push(
            path,
            format!("must be an integer between {min} and {MAX_EXTENT}"),
        ),
        None => issues.push(path, "must be an integer"),
    }
}

/// Warn about repeated ids and connections naming boxes that do not exist.
/// Neither stops rendering: the first box wins and dangling connections
/// are skipped when drawing.
pub fn check_references(tree: &DiagramNode) {
    let mut ids = BTreeSet::new();
    collect_ids(tree, &mut ids);
    for connection in tree.connection_scopes().into_iter().flatten() {
        for endpoint in [&connection.from, &connection.to] {
            if !ids.contains(endpoint.as_str()) {
                log::warn!(
                    from = connection.from.as_str(),
                    to = connection.to.as_str(),
                    missing = endpoint.as_str();
                    "Connection endpoint does not name any box"
                );
            }
        }
    }
}

fn collect_ids<'a>(node: &'a DiagramNode, ids: &mut BTreeSet<&'a str>) {
    for child in node.children() {
        if let Some(id) = child.id.as_deref()
            && !ids.insert(id)
        {
            log::warn!(id; "Duplicate box id");
        }
        collect_ids(child, ids);
    }
}
