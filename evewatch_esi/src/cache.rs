use std::hash::{Hash, Hasher};

use evewatch_core::Timestamp;
use reqwest::header;

/// The caching validators returned with a successful ESI result. Replay
/// them on the next request to the same logical resource to get a 304
/// instead of a full body.
#[derive(Clone, Debug)]
pub struct CacheInfo {
    etag: String,
    expires: Timestamp,
}

impl CacheInfo {
    /// A missing etag is stored as the empty string, never as an option.
    pub fn new(etag: Option<&str>, expires: Timestamp) -> Self {
        Self {
            etag: etag.unwrap_or_default().to_owned(),
            expires,
        }
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    pub fn expires(&self) -> Timestamp {
        self.expires
    }

    /// Stamps the conditional request headers onto an outgoing request.
    pub fn apply_to(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if !self.etag.is_empty() {
            builder = builder.header(header::IF_NONE_MATCH, self.etag.as_str());
        }
        builder.header(header::IF_MODIFIED_SINCE, self.expires.to_rfc2822())
    }
}

// Identity is the etag alone; the expiry is advisory.
impl PartialEq for CacheInfo {
    fn eq(&self, other: &Self) -> bool {
        self.etag == other.etag
    }
}

impl Eq for CacheInfo {}

impl Hash for CacheInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.etag.hash(state);
    }
}
