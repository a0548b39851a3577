use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub text_color: String,
    pub background: String,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            font_family: "\"JetBrains Mono\", \"DejaVu Sans Mono\", Menlo, Consolas, monospace"
                .to_string(),
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "\"JetBrains Mono\", \"DejaVu Sans Mono\", Menlo, Consolas, monospace"
                .to_string(),
            text_color: "#D8DEE9".to_string(),
            background: "#1E2430".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "light" | "default" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
