use serde::{Deserialize, Serialize};

/// Which prompt template wraps the user's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Tldr,
    Bullet,
    Eli5,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Tldr => "tldr",
            Style::Bullet => "bullet",
            Style::Eli5 => "eli5",
        }
    }
}

impl std::str::FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tldr" => Ok(Style::Tldr),
            "bullet" => Ok(Style::Bullet),
            "eli5" => Ok(Style::Eli5),
            other => Err(format!("Unknown summary style: {}", other)),
        }
    }
}

/// Body of a summarize call as it arrives on the wire.
///
/// Fields stay loose here so that a bad `style` can be answered with a
/// message in the usual `{summary}` shape instead of a serde rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

impl SummarizeResponse {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}
