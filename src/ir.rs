use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Border {
    #[default]
    Single,
    Double,
    Bold,
    Rounded,
    Dashed,
}

impl Border {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "single" => Some(Self::Single),
            "double" => Some(Self::Double),
            "bold" => Some(Self::Bold),
            "rounded" => Some(Self::Rounded),
            "dashed" => Some(Self::Dashed),
            _ => None,
        }
    }
}

impl From<String> for Border {
    fn from(value: String) -> Self {
        Self::from_name(&value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChildDirection {
    #[default]
    Horizontal,
    Vertical,
}

impl ChildDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "horizontal" => Some(Self::Horizontal),
            "vertical" => Some(Self::Vertical),
            _ => None,
        }
    }
}

impl From<String> for ChildDirection {
    fn from(value: String) -> Self {
        Self::from_name(&value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

/// Unknown side names behave like `left`.
impl From<String> for Side {
    fn from(value: String) -> Self {
        Self::from_name(&value).unwrap_or(Self::Left)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_side: Option<Side>,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
            from_side: None,
            to_side: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_sides(mut self, from_side: Side, to_side: Side) -> Self {
        self.from_side = Some(from_side);
        self.to_side = Some(to_side);
        self
    }

    pub fn label_len(&self) -> usize {
        self.label
            .as_deref()
            .map(|label| label.chars().count())
            .unwrap_or(0)
    }
}

/// What a box holds: nothing, text, or nested boxes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Lines(Vec<String>),
    Boxes(Vec<DiagramNode>),
}

impl Content {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Lines(lines) => lines.serialize(serializer),
            Self::Boxes(boxes) => boxes.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    List(Vec<RawItem>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItem {
    Node(Box<DiagramNode>),
    Text(String),
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<RawContent>::deserialize(deserializer)?;
        Ok(match raw {
            None => Self::Empty,
            Some(RawContent::Text(text)) => Self::Text(text),
            Some(RawContent::List(items)) => {
                if items.iter().any(|item| matches!(item, RawItem::Node(_))) {
                    Self::Boxes(
                        items
                            .into_iter()
                            .map(|item| match item {
                                RawItem::Node(node) => *node,
                                RawItem::Text(text) => DiagramNode::leaf(None, text),
                            })
                            .collect(),
                    )
                } else {
                    Self::Lines(
                        items
                            .into_iter()
                            .filter_map(|item| match item {
                                RawItem::Text(text) => Some(text),
                                RawItem::Node(_) => None,
                            })
                            .collect(),
                    )
                }
            }
        })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// One box of the diagram; the root node is the diagram itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "children",
        alias = "content",
        default,
        skip_serializing_if = "Content::is_empty"
    )]
    pub content: Content,
    #[serde(default, skip_serializing_if = "is_default")]
    pub border: Border,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub shadow: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "is_default")]
    pub child_direction: ChildDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
}

impl DiagramNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(id: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            id: id.map(str::to_string),
            content: Content::Text(text.into()),
            ..Self::default()
        }
    }

    pub fn container(id: Option<&str>, children: Vec<DiagramNode>) -> Self {
        Self {
            id: id.map(str::to_string),
            content: Content::Boxes(children),
            ..Self::default()
        }
    }

    pub fn with_geometry(mut self, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn is_container(&self) -> bool {
        matches!(&self.content, Content::Boxes(children) if !children.is_empty())
    }

    pub fn children(&self) -> &[DiagramNode] {
        match &self.content {
            Content::Boxes(children) => children,
            _ => &[],
        }
    }

    pub fn text_lines(&self) -> Vec<&str> {
        match &self.content {
            Content::Text(text) => vec![text.as_str()],
            Content::Lines(lines) => lines.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    /// True when this box has x, y, width and height.
    pub fn has_geometry(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.width.is_some() && self.height.is_some()
    }

    /// True when this box and every descendant have full geometry.
    pub fn is_fully_placed(&self) -> bool {
        self.has_geometry() && self.children().iter().all(DiagramNode::is_fully_placed)
    }

    /// Connection lists of this box and every descendant, in pre-order.
    pub fn connection_scopes(&self) -> Vec<&[Connection]> {
        let mut scopes = vec![self.connections.as_slice()];
        for child in self.children() {
            scopes.extend(child.connection_scopes());
        }
        scopes
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.has_id(id) || self.children().iter().any(|child| child.contains_id(id))
    }

    /// Extra columns / rows taken by the drop shadow.
    pub fn shadow_extent(&self) -> (i32, i32) {
        if self.shadow { (2, 1) } else { (0, 0) }
    }

    pub fn title_len(&self) -> usize {
        self.title
            .as_deref()
            .map(|title| title.chars().count())
            .unwrap_or(0)
    }
}
