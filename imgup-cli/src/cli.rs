// ABOUTME: CLI argument definitions for the imgup application
// ABOUTME: Defines the command-line interface structure using clap derive macros

use clap::{Args, Parser, Subcommand, ValueEnum};
use imgup_sdk::{Backend, FediverseFlavor, OutputFormat, ResizeSpec, Visibility};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "imgup")]
#[command(about = "Upload images and print ready-to-paste snippets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output for debugging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload images and print a snippet for each
    Upload(UploadArgs),
    /// Authorize a backend and store its credentials
    Setup {
        #[arg(value_enum)]
        target: SetupTarget,
    },
    /// Print the metadata that would be used for an image
    Metadata {
        image: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage stored defaults and credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Images to upload (at most 4)
    #[arg(required = true, num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// Backend: smugmug, flickr, gotosocial or mastodon
    #[arg(short, long, value_parser = parse_backend)]
    pub backend: Option<Backend>,

    /// Snippet format: md, html or org
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Image title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Image caption
    #[arg(short, long)]
    pub caption: Option<String>,

    /// Alt text (first image when posting several)
    #[arg(short, long)]
    pub alt: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Do not read EXIF/XMP metadata
    #[arg(long)]
    pub no_metadata: bool,

    /// Status text for fediverse posts
    #[arg(long, value_name = "TEXT")]
    pub post: Option<String>,

    /// Fediverse post visibility
    #[arg(long, value_parser = parse_visibility, default_value = "public")]
    pub visibility: Visibility,

    /// Shrink images to fit before posting to the fediverse, e.g. 1920x1920
    #[arg(long, value_name = "WxH", value_parser = parse_resize)]
    pub resize: Option<ResizeSpec>,

    /// Also post the uploaded images to the configured fediverse account
    #[arg(long)]
    pub fedi: bool,

    /// Which fediverse credentials the bridge uses first
    #[arg(long, value_enum, default_value = "gotosocial")]
    pub fedi_prefix: FediPrefix,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupTarget {
    Smugmug,
    Flickr,
    Gotosocial,
    Mastodon,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FediPrefix {
    Gotosocial,
    Mastodon,
}

impl From<FediPrefix> for FediverseFlavor {
    fn from(prefix: FediPrefix) -> Self {
        match prefix {
            FediPrefix::Gotosocial => FediverseFlavor::GoToSocial,
            FediPrefix::Mastodon => FediverseFlavor::Mastodon,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Persist the default backend
    SetBackend {
        #[arg(value_parser = parse_backend)]
        backend: Backend,
    },
    /// Persist the default snippet format
    SetFormat {
        #[arg(value_parser = parse_format)]
        format: OutputFormat,
    },
    /// Print the config file with secrets redacted
    Show,
    /// Remove stored credentials for a backend
    Clear {
        #[arg(value_parser = parse_backend)]
        backend: Backend,
    },
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse().map_err(|e: imgup_sdk::ImgupError| e.to_string())
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

fn parse_visibility(s: &str) -> Result<Visibility, String> {
    s.parse().map_err(|e: imgup_sdk::ImgupError| e.to_string())
}

fn parse_resize(s: &str) -> Result<ResizeSpec, String> {
    ResizeSpec::parse(s).map_err(|e| e.to_string())
}
