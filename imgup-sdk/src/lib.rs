// ABOUTME: imgup SDK library for publishing images to photo hosts and the fediverse
// ABOUTME: Backend adapters, metadata extraction, snippet rendering and the federation bridge

pub mod backends;
pub mod bridge;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod http;
pub mod metadata;
#[cfg(feature = "oauth")]
pub mod oauth;
pub mod oauth1;
pub mod options;
pub mod resize;
pub mod scratch;
pub mod snippet;
pub mod types;

#[cfg(test)]
mod test_helpers;

pub use backends::Publisher;
pub use bridge::FederationBridge;
pub use credentials::{Credentials, FediverseFlavor};
pub use error::{ImgupError, Result};
pub use factory::{build, build_named, Backend};
pub use metadata::{ImageMetadata, MetadataExtractor};
pub use options::{BridgeOptions, FediverseOptions, UploadOptions};
pub use resize::{ImageResizer, ResizeSpec, Resizer};
pub use snippet::{OutputFormat, Snippet};
pub use types::{FediImage, PublishedSnippet, UploadDescriptors, Visibility};
