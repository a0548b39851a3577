//! Mermaid flowchart subset converted into a box tree.

use super::ParseError;
use crate::ir::{Border, ChildDirection, Connection, Content, DiagramNode};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(flowchart|graph)(?:\s+(\w+))?\s*$").unwrap());
static SUBGRAPH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^subgraph\s+(.*)$").unwrap());
static DIRECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^direction\s+(\w+)$").unwrap());
// `-- text -->` style links first, then bare arrows.
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:--|==|-\.)\s+(?P<text>[^\s|>\-=.][^|]*?)\s+(?:-{2,}>|-{3,}|={2,}>|={3,}|\.-+>|\.-+)|<?(?:-{2,}|={2,}|-\.+-)>?",
    )
    .unwrap()
});
static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.$:-]+$").unwrap());

fn direction_from_token(token: &str) -> Option<ChildDirection> {
    match token.to_ascii_uppercase().as_str() {
        "LR" | "RL" => Some(ChildDirection::Horizontal),
        "TD" | "TB" | "BT" => Some(ChildDirection::Vertical),
        _ => None,
    }
}

/// Where a box lives: directly under the root or inside a subgraph.
type Scope = Option<usize>;

#[derive(Debug)]
struct FlowNode {
    id: String,
    lines: Vec<String>,
    border: Border,
    declared: bool,
    scope: Scope,
    order: usize,
}

#[derive(Debug)]
struct Subgraph {
    id: String,
    title: String,
    parent: Scope,
    direction: Option<ChildDirection>,
    order: usize,
}

#[derive(Debug)]
struct FlowEdge {
    from: String,
    to: String,
    label: Option<String>,
}

#[derive(Debug, Default)]
struct Flowchart {
    direction: ChildDirection,
    nodes: Vec<FlowNode>,
    node_index: BTreeMap<String, usize>,
    subgraphs: Vec<Subgraph>,
    edges: Vec<FlowEdge>,
    next_order: usize,
}

/// A node mention: `A`, `A[Label]`, `A((Label))`, ...
#[derive(Debug, PartialEq, Eq)]
struct NodeToken {
    id: String,
    shape: Option<(Border, String)>,
}

pub fn parse_mermaid(input: &str) -> Result<DiagramNode, ParseError> {
    let lines = preprocess_input(input);
    if lines.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut chart = Flowchart::default();
    let mut stack: Vec<usize> = Vec::new();
    let mut saw_header = false;

    for (line_no, raw_line) in lines {
        for statement in split_statements(&raw_line) {
            if !saw_header {
                let Some(caps) = HEADER_RE.captures(&statement) else {
                    return Err(ParseError::Mermaid {
                        line: line_no,
                        message: format!("expected a flowchart header, found `{statement}`"),
                    });
                };
                if let Some(token) = caps.get(2) {
                    chart.direction = direction_from_token(token.as_str()).ok_or_else(|| {
                        ParseError::Mermaid {
                            line: line_no,
                            message: format!("unknown direction `{}`", token.as_str()),
                        }
                    })?;
                }
                saw_header = true;
                continue;
            }
            chart
                .statement(&statement, &mut stack)
                .map_err(|message| ParseError::Mermaid {
                    line: line_no,
                    message,
                })?;
        }
    }

    if !stack.is_empty() {
        log::warn!(open = stack.len(); "Unclosed subgraph at end of input");
    }
    Ok(chart.into_tree())
}

impl Flowchart {
    fn statement(&mut self, line: &str, stack: &mut Vec<usize>) -> Result<(), String> {
        let scope = stack.last().copied();
        if line == "end" {
            return match stack.pop() {
                Some(_) => Ok(()),
                None => Err("`end` without an open subgraph".to_string()),
            };
        }
        if let Some(caps) = SUBGRAPH_RE.captures(line) {
            let (id, title) = parse_subgraph_header(caps.get(1).map_or("", |m| m.as_str()));
            let order = self.bump();
            self.subgraphs.push(Subgraph {
                id,
                title,
                parent: scope,
                direction: None,
                order,
            });
            stack.push(self.subgraphs.len() - 1);
            return Ok(());
        }
        if let Some(caps) = DIRECTION_RE.captures(line) {
            let token = caps.get(1).map_or("", |m| m.as_str());
            let direction =
                direction_from_token(token).ok_or_else(|| format!("unknown direction `{token}`"))?;
            match scope {
                Some(idx) => self.subgraphs[idx].direction = Some(direction),
                None => self.direction = direction,
            }
            return Ok(());
        }
        if is_ignored_statement(line) {
            log::debug!(statement = line; "Ignoring styling statement");
            return Ok(());
        }
        if let Some(chain) = split_edge_chain(line) {
            return self.add_chain(chain, scope);
        }
        let token = parse_node_token(line).ok_or_else(|| format!("cannot parse `{line}`"))?;
        self.mention(token, scope);
        Ok(())
    }

    fn bump(&mut self) -> usize {
        self.next_order += 1;
        self.next_order
    }

    fn add_chain(&mut self, chain: EdgeChain, scope: Scope) -> Result<(), String> {
        let mut groups: Vec<Vec<String>> = Vec::with_capacity(chain.groups.len());
        for group in &chain.groups {
            let mut ids = Vec::new();
            for raw in group {
                let token = parse_node_token(raw).ok_or_else(|| format!("cannot parse node `{raw}`"))?;
                ids.push(self.mention(token, scope));
            }
            groups.push(ids);
        }
        for (step, label) in chain.labels.iter().enumerate() {
            for from in &groups[step] {
                for to in &groups[step + 1] {
                    self.edges.push(FlowEdge {
                        from: from.clone(),
                        to: to.clone(),
                        label: label.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Record a node mention. The first subgraph a node is mentioned in
    /// owns it; the first explicit shape defines it.
    fn mention(&mut self, token: NodeToken, scope: Scope) -> String {
        if token.shape.is_none() && self.subgraphs.iter().any(|sub| sub.id == token.id) {
            return token.id;
        }
        let order = self.bump();
        let idx = match self.node_index.get(&token.id) {
            Some(idx) => *idx,
            None => {
                self.nodes.push(FlowNode {
                    id: token.id.clone(),
                    lines: vec![token.id.clone()],
                    border: Border::Single,
                    declared: false,
                    scope,
                    order,
                });
                self.node_index.insert(token.id.clone(), self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        let node = &mut self.nodes[idx];
        if node.scope.is_none() && scope.is_some() {
            node.scope = scope;
            node.order = order;
        }
        if let Some((border, label)) = token.shape
            && !node.declared
        {
            node.border = border;
            node.lines = split_label(&label);
            node.declared = true;
        }
        token.id
    }

    /// Scopes enclosing `scope`, outermost first, ending with `scope` itself.
    fn scope_chain(&self, scope: Scope) -> Vec<Scope> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(idx) = current {
            current = self.subgraphs[idx].parent;
            chain.push(current);
        }
        chain.reverse();
        chain
    }

    /// Scope that holds the box named `id`.
    fn home_of(&self, id: &str) -> Scope {
        if let Some(idx) = self.node_index.get(id) {
            return self.nodes[*idx].scope;
        }
        self.subgraphs
            .iter()
            .find(|sub| sub.id == id)
            .and_then(|sub| sub.parent)
    }

    /// Innermost scope containing both endpoints.
    fn declaring_scope(&self, edge: &FlowEdge) -> Scope {
        let from = self.scope_chain(self.home_of(&edge.from));
        let to = self.scope_chain(self.home_of(&edge.to));
        from.iter()
            .zip(&to)
            .take_while(|(a, b)| a == b)
            .last()
            .map(|(scope, _)| *scope)
            .unwrap_or(None)
    }

    fn into_tree(self) -> DiagramNode {
        let mut connections: BTreeMap<Scope, Vec<Connection>> = BTreeMap::new();
        for edge in &self.edges {
            let mut connection = Connection::new(edge.from.clone(), edge.to.clone());
            connection.label = edge.label.clone();
            connections
                .entry(self.declaring_scope(edge))
                .or_default()
                .push(connection);
        }

        let mut root = DiagramNode::new();
        root.child_direction = self.direction;
        root.content = Content::Boxes(self.build_children(None, &mut connections));
        root.connections = connections.remove(&None).unwrap_or_default();
        root
    }

    fn build_children(
        &self,
        scope: Scope,
        connections: &mut BTreeMap<Scope, Vec<Connection>>,
    ) -> Vec<DiagramNode> {
        let mut members: Vec<(usize, DiagramNode)> = Vec::new();
        for node in self.nodes.iter().filter(|node| node.scope == scope) {
            if self.subgraphs.iter().any(|sub| sub.id == node.id) && !node.declared {
                continue;
            }
            let mut leaf = DiagramNode::new();
            leaf.id = Some(node.id.clone());
            leaf.border = node.border;
            leaf.content = match node.lines.as_slice() {
                [single] => Content::Text(single.clone()),
                lines => Content::Lines(lines.to_vec()),
            };
            members.push((node.order, leaf));
        }
        for (idx, sub) in self.subgraphs.iter().enumerate() {
            if sub.parent != scope {
                continue;
            }
            let mut container = DiagramNode::new();
            container.id = Some(sub.id.clone());
            container.title = Some(sub.title.clone());
            container.border = Border::Rounded;
            container.child_direction = sub.direction.unwrap_or_default();
            container.content = Content::Boxes(self.build_children(Some(idx), connections));
            container.connections = connections.remove(&Some(idx)).unwrap_or_default();
            members.push((sub.order, container));
        }
        members.sort_by_key(|(order, _)| *order);
        members.into_iter().map(|(_, node)| node).collect()
    }
}

fn is_ignored_statement(line: &str) -> bool {
    ["classDef ", "class ", "style ", "linkStyle ", "click ", "accTitle", "accDescr", "title "]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// `subgraph id [Title]`, `subgraph id["Title"]` or `subgraph Some Title`.
fn parse_subgraph_header(rest: &str) -> (String, String) {
    let rest = rest.trim();
    if let Some(start) = rest.find('[')
        && rest.ends_with(']')
    {
        let id = rest[..start].trim();
        let title = strip_quotes(&rest[start + 1..rest.len() - 1]);
        if !id.is_empty() {
            return (id.to_string(), title);
        }
    }
    let title = strip_quotes(rest);
    (title.clone(), title)
}

fn split_label(label: &str) -> Vec<String> {
    BR_RE
        .split(label)
        .map(|line| line.trim().to_string())
        .collect()
}

fn parse_node_token(token: &str) -> Option<NodeToken> {
    let base = token.split(":::").next().unwrap_or("").trim();
    if base.is_empty() {
        return None;
    }
    let Some(open) = base.find(['[', '(', '{', '>']) else {
        return ID_RE.is_match(base).then(|| NodeToken {
            id: base.to_string(),
            shape: None,
        });
    };
    let id = base[..open].trim();
    if !ID_RE.is_match(id) {
        return None;
    }
    let (border, label) = parse_shape(&base[open..])?;
    Some(NodeToken {
        id: id.to_string(),
        shape: Some((border, label)),
    })
}

/// Map a bracketed shape onto a border style and its label.
fn parse_shape(raw: &str) -> Option<(Border, String)> {
    const SHAPES: [(&str, &str, Border); 9] = [
        ("[[", "]]", Border::Double),
        ("((", "))", Border::Rounded),
        ("([", "])", Border::Rounded),
        ("[(", ")]", Border::Single),
        ("{{", "}}", Border::Bold),
        ("[", "]", Border::Single),
        ("(", ")", Border::Rounded),
        ("{", "}", Border::Bold),
        (">", "]", Border::Dashed),
    ];
    SHAPES.iter().find_map(|(open, close, border)| {
        let inner = raw.strip_prefix(open)?.strip_suffix(close)?;
        Some((*border, strip_quotes(inner)))
    })
}

fn strip_quotes(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, PartialEq, Eq)]
struct EdgeChain {
    /// Node tokens per step; `&` fans out within a step.
    groups: Vec<Vec<String>>,
    /// One label slot per link between consecutive groups.
    labels: Vec<Option<String>>,
}

/// Split `A --> B -->|x| C & D` into node groups and link labels.
fn split_edge_chain(line: &str) -> Option<EdgeChain> {
    let masked = mask_bracket_content(line);
    let mut segments = Vec::new();
    let mut labels = Vec::new();
    let mut last = 0usize;
    for caps in LINK_RE.captures_iter(&masked) {
        let whole = caps.get(0)?;
        segments.push(line[last..whole.start()].trim().to_string());
        labels.push(
            caps.name("text")
                .map(|text| line[text.start()..text.end()].trim().to_string()),
        );
        last = whole.end();
    }
    if labels.is_empty() {
        return None;
    }
    segments.push(line[last..].trim().to_string());

    for idx in 1..segments.len() {
        let segment = segments[idx].clone();
        if let Some(stripped) = segment.strip_prefix('|')
            && let Some(end) = stripped.find('|')
        {
            labels[idx - 1] = Some(stripped[..end].trim().to_string());
            segments[idx] = stripped[end + 1..].trim().to_string();
        }
    }
    if segments.iter().any(String::is_empty) {
        return None;
    }

    let groups = segments
        .iter()
        .map(|segment| {
            segment
                .split('&')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        })
        .collect();
    let labels = labels
        .into_iter()
        .map(|label| label.filter(|text| !text.is_empty()))
        .collect();
    Some(EdgeChain { groups, labels })
}

/// Blank out bracket, quote and pipe contents (byte lengths preserved) so
/// dashes inside labels are not taken for links.
fn mask_bracket_content(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut in_pipe = false;
    for ch in line.chars() {
        let hidden = depth > 0 || quote.is_some() || in_pipe;
        match ch {
            '"' if quote == Some(ch) => quote = None,
            '"' if quote.is_none() && depth > 0 => quote = Some(ch),
            '[' | '(' | '{' if quote.is_none() && !in_pipe => depth += 1,
            ']' | ')' | '}' if quote.is_none() && !in_pipe && depth > 0 => depth -= 1,
            '|' if quote.is_none() && depth == 0 => in_pipe = !in_pipe,
            _ => {}
        }
        let still_hidden = depth > 0 || quote.is_some() || in_pipe;
        if (hidden && still_hidden) && !matches!(ch, '[' | '(' | '{' | ']' | ')' | '}' | '|') {
            for _ in 0..ch.len_utf8() {
                result.push(' ');
            }
        } else {
            result.push(ch);
        }
    }
    result
}

/// Non-empty lines with `%%` comments removed, tagged with 1-based line numbers.
fn preprocess_input(input: &str) -> Vec<(usize, String)> {
    input
        .lines()
        .enumerate()
        .filter_map(|(idx, raw_line)| {
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with("%%") {
                return None;
            }
            let without_comment = strip_trailing_comment(trimmed);
            (!without_comment.is_empty()).then_some((idx + 1, without_comment))
        })
        .collect()
}

fn strip_trailing_comment(line: &str) -> String {
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();
    let mut out = String::new();
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            out.push(ch);
            continue;
        }
        if ch == '"' {
            quote = Some(ch);
            out.push(ch);
            continue;
        }
        if ch == '%'
            && let Some('%') = chars.peek().copied()
        {
            break;
        }
        out.push(ch);
    }
    out.trim().to_string()
}

/// Split on `;` outside brackets and quotes.
fn split_statements(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' | '}' => {
                depth = (depth - 1).max(0);
                current.push(ch);
            }
            ';' if depth == 0 => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child<'a>(node: &'a DiagramNode, id: &str) -> &'a DiagramNode {
        node.children()
            .iter()
            .find(|child| child.has_id(id))
            .unwrap_or_else(|| panic!("missing child {id}"))
    }

    #[test]
    fn parse_simple_flowchart() {
        let tree = parse_mermaid("flowchart lr\nA[Start] -->|go| B(End)").unwrap();
        assert_eq!(tree.child_direction, ChildDirection::Horizontal);
        assert_eq!(tree.children().len(), 2);
        assert_eq!(child(&tree, "A").content, Content::Text("Start".into()));
        assert_eq!(child(&tree, "B").border, Border::Rounded);
        assert_eq!(tree.connections.len(), 1);
        assert_eq!(tree.connections[0].label.as_deref(), Some("go"));
    }

    #[test]
    fn frontend_backend_matches_hand_written_tree() {
        let parsed = parse_mermaid("flowchart LR\n A[Frontend] --> B[Backend]").unwrap();
        let expected = crate::parser::parse_json(
            r#"{"children":[{"id":"A","children":"Frontend","border":"single"},
                {"id":"B","children":"Backend","border":"single"}],
                "connections":[{"from":"A","to":"B"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn top_down_maps_to_vertical_root() {
        let tree = parse_mermaid("graph TD\nA --> B").unwrap();
        assert_eq!(tree.child_direction, ChildDirection::Vertical);
        assert_eq!(child(&tree, "A").content, Content::Text("A".into()));
    }

    #[test]
    fn shapes_map_to_borders() {
        let tree = parse_mermaid(
            "flowchart LR\na[[Sub]]\nb((Circle))\nc([Stadium])\nd{Decision}\ne>Flag]\nf(\"Quoted (x)\")",
        )
        .unwrap();
        assert_eq!(child(&tree, "a").border, Border::Double);
        assert_eq!(child(&tree, "b").border, Border::Rounded);
        assert_eq!(child(&tree, "c").border, Border::Rounded);
        assert_eq!(child(&tree, "d").border, Border::Bold);
        assert_eq!(child(&tree, "e").border, Border::Dashed);
        assert_eq!(child(&tree, "f").content, Content::Text("Quoted (x)".into()));
    }

    #[test]
    fn br_splits_labels_into_lines() {
        let tree = parse_mermaid("flowchart LR\nA[\"API<br>Gateway<br/>v2\"]").unwrap();
        assert_eq!(child(&tree, "A").text_lines(), vec!["API", "Gateway", "v2"]);
    }

    #[test]
    fn chains_fan_out_and_text_labels() {
        let tree =
            parse_mermaid("flowchart LR\nA & B -- sends --> C --> D\nD -.-> E\nE ==> F; F --- A")
                .unwrap();
        let pairs: Vec<(&str, &str, Option<&str>)> = tree
            .connections
            .iter()
            .map(|c| (c.from.as_str(), c.to.as_str(), c.label.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A", "C", Some("sends")),
                ("B", "C", Some("sends")),
                ("C", "D", None),
                ("D", "E", None),
                ("E", "F", None),
                ("F", "A", None),
            ]
        );
    }

    #[test]
    fn dashes_inside_labels_are_not_links() {
        let tree = parse_mermaid("flowchart LR\nA[wi--fi] -->|a -- b| B").unwrap();
        assert_eq!(child(&tree, "A").content, Content::Text("wi--fi".into()));
        assert_eq!(tree.connections[0].label.as_deref(), Some("a -- b"));
    }

    #[test]
    fn subgraphs_become_rounded_containers() {
        let input = "flowchart LR\nsubgraph api [API Layer]\n  direction TB\n  A --> B\nend\nB --> C";
        let tree = parse_mermaid(input).unwrap();
        let api = child(&tree, "api");
        assert_eq!(api.border, Border::Rounded);
        assert_eq!(api.title.as_deref(), Some("API Layer"));
        assert_eq!(api.child_direction, ChildDirection::Vertical);
        assert_eq!(api.children().len(), 2);
        assert_eq!(api.connections.len(), 1);
        assert_eq!(tree.connections.len(), 1);
        assert_eq!(tree.connections[0].to, "C");
    }

    #[test]
    fn edges_land_on_the_lowest_common_container() {
        let input = "flowchart LR\nsubgraph Outer\n  subgraph Inner\n    A\n  end\n  B\n  A --> B\nend\nC --> A";
        let tree = parse_mermaid(input).unwrap();
        let outer = child(&tree, "Outer");
        assert_eq!(outer.connections.len(), 1);
        assert!(child(outer, "Inner").connections.is_empty());
        assert_eq!(tree.connections.len(), 1);
        assert_eq!(tree.connections[0].from, "C");
    }

    #[test]
    fn first_subgraph_mention_owns_the_node() {
        let input = "flowchart LR\nA --> B\nsubgraph g\n  B\nend";
        let tree = parse_mermaid(input).unwrap();
        let ids: Vec<_> = tree.children().iter().map(|c| c.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["A", "g"]);
        assert!(child(&tree, "g").contains_id("B"));
    }

    #[test]
    fn subgraph_ids_can_be_link_endpoints() {
        let tree = parse_mermaid("flowchart LR\nsubgraph g\n  A\nend\nX --> g").unwrap();
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.connections[0].to, "g");
    }

    #[test]
    fn styling_and_comments_are_ignored() {
        let input = "%% leading\nflowchart LR\nclassDef hot fill:#f00\nA[One] --> B %% trailing\nclass A hot\nstyle A fill:#0f0\nlinkStyle 0 stroke:#0ff";
        let tree = parse_mermaid(input).unwrap();
        assert_eq!(tree.children().len(), 2);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_mermaid("flowchart LR\nA --> B\nend").unwrap_err();
        assert!(matches!(err, ParseError::Mermaid { line: 3, .. }));

        let err = parse_mermaid("sequenceDiagram\nA->>B: hi").unwrap_err();
        assert!(matches!(err, ParseError::Mermaid { line: 1, .. }));

        let err = parse_mermaid("flowchart LR\nA B C").unwrap_err();
        assert!(matches!(err, ParseError::Mermaid { line: 2, .. }));
    }
}
