use crate::ir::{Border, ChildDirection, DiagramNode, Side};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: i32,
    pub height: i32,
    pub child_direction: ChildDirection,
    pub boxes: Vec<BoxDump>,
    pub connections: Vec<ConnectionDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxDump {
    pub id: Option<String>,
    pub parent: Option<String>,
    pub depth: usize,
    pub border: Border,
    pub title: Option<String>,
    pub lines: Vec<String>,
    /// Relative to the parent interior.
    pub x: i32,
    pub y: i32,
    /// Canvas cell of the top-left corner.
    pub abs_x: i32,
    pub abs_y: i32,
    pub width: i32,
    pub height: i32,
    pub shadow: bool,
    pub disabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDump {
    /// Id of the box declaring the connection; `None` for the root.
    pub scope: Option<String>,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub from_side: Option<Side>,
    pub to_side: Option<Side>,
}

impl LayoutDump {
    /// Flatten a laid out tree, parents before children.
    pub fn from_tree(tree: &DiagramNode) -> Self {
        let mut dump = LayoutDump {
            width: tree.width.unwrap_or(0),
            height: tree.height.unwrap_or(0),
            child_direction: tree.child_direction,
            boxes: Vec::new(),
            connections: Vec::new(),
        };
        dump.push_connections(tree, None);
        for node in tree.children() {
            dump.visit(node, None, 0, 0, 0);
        }
        dump
    }

    fn visit(
        &mut self,
        node: &DiagramNode,
        parent: Option<&str>,
        depth: usize,
        origin_x: i32,
        origin_y: i32,
    ) {
        let x = node.x.unwrap_or(0);
        let y = node.y.unwrap_or(0);
        let abs_x = origin_x + x;
        let abs_y = origin_y + y;
        self.boxes.push(BoxDump {
            id: node.id.clone(),
            parent: parent.map(str::to_string),
            depth,
            border: node.border,
            title: node.title.clone(),
            lines: node.text_lines().into_iter().map(str::to_string).collect(),
            x,
            y,
            abs_x,
            abs_y,
            width: node.width.unwrap_or(0),
            height: node.height.unwrap_or(0),
            shadow: node.shadow,
            disabled: node.disabled,
        });
        self.push_connections(node, node.id.as_deref());
        for child in node.children() {
            self.visit(child, node.id.as_deref(), depth + 1, abs_x + 1, abs_y + 1);
        }
    }

    fn push_connections(&mut self, node: &DiagramNode, scope: Option<&str>) {
        self.connections
            .extend(node.connections.iter().map(|connection| ConnectionDump {
                scope: scope.map(str::to_string),
                from: connection.from.clone(),
                to: connection.to.clone(),
                label: connection.label.clone(),
                from_side: connection.from_side,
                to_side: connection.to_side,
            }));
    }
}

pub fn write_layout_dump(path: &Path, tree: &DiagramNode) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_tree(tree);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
