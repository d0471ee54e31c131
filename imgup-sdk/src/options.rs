// ABOUTME: Typed builders for upload, fediverse post and bridge options
// ABOUTME: Defaults match the CLI: metadata extraction on, public posts, 2s processing delay

use crate::constants::timeouts::MEDIA_PROCESSING_DELAY;
use crate::credentials::FediverseFlavor;
use crate::resize::ResizeSpec;
use crate::types::{FediImage, UploadDescriptors, Visibility};
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Options shared by every backend adapter.
#[derive(Debug, Clone, TypedBuilder)]
pub struct UploadOptions {
    #[builder(default)]
    pub descriptors: UploadDescriptors,

    /// Fill unset descriptors from EXIF/XMP before uploading
    #[builder(default = true)]
    pub extract_metadata: bool,

    #[builder(default)]
    pub fediverse: FediverseOptions,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Options for a (multi-image) fediverse status.
#[derive(Debug, Clone, TypedBuilder)]
pub struct FediverseOptions {
    /// Images to attach. When empty the adapter's single path is used.
    #[builder(default)]
    pub images: Vec<FediImage>,

    /// Status text; the first image description is used when unset
    #[builder(default, setter(strip_option, into))]
    pub post_text: Option<String>,

    #[builder(default)]
    pub visibility: Visibility,

    #[builder(default, setter(strip_option))]
    pub resize: Option<ResizeSpec>,

    #[builder(default = MEDIA_PROCESSING_DELAY)]
    pub processing_delay: Duration,
}

impl Default for FediverseOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Options for republishing finished uploads as a fediverse status.
#[derive(Debug, Clone, TypedBuilder)]
pub struct BridgeOptions {
    /// Credential prefix to look up first
    #[builder(default)]
    pub flavor: FediverseFlavor,

    /// Status text; the first result's title is used when unset
    #[builder(default, setter(strip_option, into))]
    pub post_text: Option<String>,

    #[builder(default)]
    pub visibility: Visibility,

    #[builder(default = MEDIA_PROCESSING_DELAY)]
    pub processing_delay: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
