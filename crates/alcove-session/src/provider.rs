//! The data-access facade
//!
//! The storage/query layer stays host-side; the session consumes it only as a
//! contract. Today the runtime itself uses it for provider prefetch (remote
//! capability detection); the UI layer pages media through the same facade.

use serde::{Deserialize, Serialize};

use alcove_core::prelude::*;
use alcove_core::MediaUri;

/// One active media provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub authority: String,
    /// Whether this provider is backed by a remote/cloud source
    pub remote: bool,
}

/// A page request against the media facade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_size: usize,
    #[serde(default)]
    pub page_token: Option<String>,
}

/// One page of media items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPage {
    pub items: Vec<MediaUri>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Paged access to the host's media store.
#[trait_variant::make(MediaProvider: Send)]
pub trait LocalMediaProvider {
    /// Make sure the backing providers are initialized and reachable.
    async fn ensure_providers(&self) -> Result<()>;

    async fn active_providers(&self) -> Vec<ProviderInfo>;

    async fn query_media(&self, request: PageRequest) -> Result<MediaPage>;
}
