//! The permission grant/revoke collaborator
//!
//! The host's authorization layer implements this. Calls may suspend on an
//! external check; decisions are per-item and best-effort from the session's
//! point of view (one denial never aborts a batch).

use alcove_core::{GrantDecision, MediaUri};

/// Grants and revokes per-item URI permissions for a caller uid.
#[trait_variant::make(MediaGrants: Send)]
pub trait LocalMediaGrants {
    async fn grant(&self, uid: u32, uri: &MediaUri) -> GrantDecision;

    async fn revoke(&self, uid: u32, uri: &MediaUri) -> GrantDecision;
}
