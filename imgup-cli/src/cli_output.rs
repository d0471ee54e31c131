// ABOUTME: User-facing output for the imgup CLI: snippets on stdout, progress on stderr
// ABOUTME: Colors only when stderr is a terminal and color is not disabled

use imgup_sdk::{ImageMetadata, ImgupError, OutputFormat, PublishedSnippet};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Keeps stdout clean for snippets so output can be piped into an editor.
pub struct CliOutput {
    use_color: bool,
}

impl CliOutput {
    pub fn new() -> Self {
        Self {
            use_color: std::io::stderr().is_terminal(),
        }
    }

    pub fn with_color(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "error:".red().bold(), message);
        } else {
            eprintln!("error: {message}");
        }
    }

    /// One-line error plus the SDK's hint when it has one.
    pub fn sdk_error(&self, err: &ImgupError) {
        self.error(&err.to_string());
        if let Some(help) = err.help_text() {
            self.info(help);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        } else {
            eprintln!("warning: {message}");
        }
    }

    pub fn info(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "→".blue().bold(), message);
        } else {
            eprintln!("→ {message}");
        }
    }

    pub fn success(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "✓".green().bold(), message);
        } else {
            eprintln!("✓ {message}");
        }
    }

    /// Print the snippet for `result` in `format` on stdout.
    pub fn snippet(&self, result: &PublishedSnippet, format: OutputFormat) {
        println!("{}", render_snippet(result, format));
    }

    pub fn metadata(&self, metadata: &ImageMetadata) {
        println!("{}", render_metadata(metadata));
    }
}

impl Default for CliOutput {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_snippet(result: &PublishedSnippet, format: OutputFormat) -> String {
    result.snippet().render(format).to_string()
}

pub fn render_metadata(metadata: &ImageMetadata) -> String {
    let tags = if metadata.tags.is_empty() {
        "(none)".to_string()
    } else {
        metadata.tags.join(", ")
    };
    format!(
        "Title:    {}\nAlt text: {}\nCaption:  {}\nTags:     {}",
        metadata.title, metadata.alt_text, metadata.caption, tags
    )
}
