// ABOUTME: Centralized constants for the imgup SDK
// ABOUTME: Contains backend endpoints, upload limits, and processing delays

/// Backend endpoint URLs
pub mod urls {
    /// SmugMug API v2 base URL
    pub const SMUGMUG_API_BASE: &str = "https://api.smugmug.com";

    /// SmugMug upload endpoint
    pub const SMUGMUG_UPLOAD: &str = "https://upload.smugmug.com/";

    /// SmugMug OAuth1 endpoints
    pub const SMUGMUG_REQUEST_TOKEN: &str =
        "https://api.smugmug.com/services/oauth/1.0a/getRequestToken";
    pub const SMUGMUG_AUTHORIZE: &str = "https://api.smugmug.com/services/oauth/1.0a/authorize";
    pub const SMUGMUG_ACCESS_TOKEN: &str =
        "https://api.smugmug.com/services/oauth/1.0a/getAccessToken";

    /// Flickr photo upload endpoint
    pub const FLICKR_UPLOAD: &str = "https://up.flickr.com/services/upload/";

    /// Flickr REST endpoint
    pub const FLICKR_REST: &str = "https://api.flickr.com/services/rest/";

    /// Flickr static photo host
    pub const FLICKR_STATIC: &str = "https://live.staticflickr.com";

    /// Flickr OAuth1 endpoints
    pub const FLICKR_REQUEST_TOKEN: &str = "https://www.flickr.com/services/oauth/request_token";
    pub const FLICKR_AUTHORIZE: &str = "https://www.flickr.com/services/oauth/authorize";
    pub const FLICKR_ACCESS_TOKEN: &str = "https://www.flickr.com/services/oauth/access_token";

    /// Fediverse API paths, relative to the instance URL
    pub const FEDI_MEDIA_PATH: &str = "/api/v1/media";
    pub const FEDI_STATUSES_PATH: &str = "/api/v1/statuses";
    pub const FEDI_VERIFY_CREDENTIALS_PATH: &str = "/api/v1/accounts/verify_credentials";

    /// Out-of-band callback for PIN based OAuth1 flows
    pub const OAUTH1_OOB_CALLBACK: &str = "oob";
}

/// Upload limits
pub mod limits {
    /// Maximum attachments per fediverse status (Mastodon API limit)
    pub const MAX_FEDI_IMAGES: usize = 4;

    /// JPEG quality used when re-encoding resized images
    pub const RESIZE_JPEG_QUALITY: u8 = 85;
}

/// Timing constants
pub mod timeouts {
    use std::time::Duration;

    /// Pause between the last media upload and status creation so the
    /// instance can finish processing attachments. Not verified.
    pub const MEDIA_PROCESSING_DELAY: Duration = Duration::from_secs(2);
}

/// Scratch file locations
pub mod scratch {
    /// Directory under the system temp dir for resized images
    pub const RESIZE_DIR: &str = "imgup-resize";

    /// Directory under the system temp dir for SmugMug upload copies
    pub const UPLOAD_DIR: &str = "imgup-upload";

    /// Prefix for images downloaded by the federation bridge
    pub const BRIDGE_PREFIX: &str = "imgup_fedi";
}

pub const USER_AGENT: &str = concat!("imgup-cli/", env!("CARGO_PKG_VERSION"));
