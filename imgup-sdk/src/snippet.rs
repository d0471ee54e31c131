// ABOUTME: Renders Markdown, HTML and Org-mode reference snippets
// ABOUTME: Shared by every backend's result builder and the CLI output selector

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three ready-to-paste renderings of a published image or post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub markdown: String,
    pub html: String,
    pub org: String,
}

impl Snippet {
    /// Inline image reference.
    pub fn image(url: &str, alt: &str) -> Self {
        Self {
            markdown: format!("![{alt}]({url})"),
            html: format!("<img src=\"{}\" alt=\"{}\">", escape_attr(url), escape_attr(alt)),
            org: format!("[[img:{url}][{alt}]]"),
        }
    }

    /// Hyperlink to a page such as a fediverse post.
    pub fn link(url: &str, label: &str) -> Self {
        Self {
            markdown: format!("[{label}]({url})"),
            html: format!("<a href=\"{}\">{}</a>", escape_attr(url), escape_text(label)),
            org: format!("[[{url}][{label}]]"),
        }
    }

    pub fn render(&self, format: OutputFormat) -> &str {
        match format {
            OutputFormat::Markdown => &self.markdown,
            OutputFormat::Html => &self.html,
            OutputFormat::Org => &self.org,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "md")]
    Markdown,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "org")]
    Org,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "org" => Ok(OutputFormat::Org),
            other => Err(format!(
                "Invalid format '{other}'. Must be one of: md, html, org"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "md"),
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Org => write!(f, "org"),
        }
    }
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
