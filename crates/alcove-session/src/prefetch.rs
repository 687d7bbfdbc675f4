//! Prefetch of asynchronous values feature enablement checks read
//!
//! Enablement predicates are synchronous pure functions; anything async they
//! need (today: whether a remote provider is available) is resolved up front,
//! under a short timeout, before the feature manager is constructed. Absent
//! keys read as unavailable.

use std::collections::HashMap;
use std::time::Duration;

use alcove_core::prelude::*;
use alcove_core::Configuration;

use crate::provider::MediaProvider;

/// How long provider prefetch may take before features see "unavailable"
pub const PREFETCH_TIMEOUT: Duration = Duration::from_millis(250);

/// Keys of prefetched values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefetchKey {
    CloudMediaAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrefetchValue {
    Bool(bool),
}

/// Resolved prefetch values, read by enablement predicates
#[derive(Debug, Clone, Default)]
pub struct PrefetchResults {
    values: HashMap<PrefetchKey, PrefetchValue>,
}

impl PrefetchResults {
    pub fn insert_bool(&mut self, key: PrefetchKey, value: bool) {
        self.values.insert(key, PrefetchValue::Bool(value));
    }

    /// `None` means the prefetch did not resolve (timeout or error).
    pub fn get_bool(&self, key: PrefetchKey) -> Option<bool> {
        match self.values.get(&key) {
            Some(PrefetchValue::Bool(value)) => Some(*value),
            None => None,
        }
    }
}

/// Resolve prefetch values from the media provider.
///
/// On timeout or provider error the corresponding key is left absent.
pub async fn run_prefetch<P: MediaProvider + Sync>(
    provider: &P,
    config: &Configuration,
) -> PrefetchResults {
    let mut results = PrefetchResults::default();

    // Cloud availability only matters when the device flag allows cloud media
    // at all; skip the provider round-trip otherwise.
    if !config.flags.cloud_media_enabled {
        return results;
    }

    let probe = async {
        provider.ensure_providers().await?;
        Ok::<_, Error>(provider.active_providers().await)
    };

    match tokio::time::timeout(PREFETCH_TIMEOUT, probe).await {
        Ok(Ok(providers)) => {
            let remote_available = providers.iter().any(|info| info.remote);
            results.insert_bool(PrefetchKey::CloudMediaAvailable, remote_available);
        }
        Ok(Err(e)) => {
            warn!("provider prefetch failed: {e}");
        }
        Err(_) => {
            warn!(
                "provider prefetch timed out after {:?}; treating cloud media as unavailable",
                PREFETCH_TIMEOUT
            );
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MediaPage, PageRequest, ProviderInfo};
    use alcove_core::{DeviceFlags, RuntimeEnv};

    struct FakeProvider {
        providers: Vec<ProviderInfo>,
        delay: Option<Duration>,
    }

    impl MediaProvider for FakeProvider {
        async fn ensure_providers(&self) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }

        async fn active_providers(&self) -> Vec<ProviderInfo> {
            self.providers.clone()
        }

        async fn query_media(&self, _request: PageRequest) -> Result<MediaPage> {
            Ok(MediaPage {
                items: Vec::new(),
                next_token: None,
            })
        }
    }

    fn config_with_cloud_flag(enabled: bool) -> Configuration {
        let flags = DeviceFlags {
            cloud_media_enabled: enabled,
            ..DeviceFlags::default()
        };
        Configuration::initial(RuntimeEnv::Embedded, 1, flags)
    }

    #[tokio::test]
    async fn test_remote_provider_marks_cloud_available() {
        let provider = FakeProvider {
            providers: vec![
                ProviderInfo {
                    authority: "local".into(),
                    remote: false,
                },
                ProviderInfo {
                    authority: "cloud".into(),
                    remote: true,
                },
            ],
            delay: None,
        };
        let results = run_prefetch(&provider, &config_with_cloud_flag(true)).await;
        assert_eq!(results.get_bool(PrefetchKey::CloudMediaAvailable), Some(true));
    }

    #[tokio::test]
    async fn test_local_only_providers() {
        let provider = FakeProvider {
            providers: vec![ProviderInfo {
                authority: "local".into(),
                remote: false,
            }],
            delay: None,
        };
        let results = run_prefetch(&provider, &config_with_cloud_flag(true)).await;
        assert_eq!(
            results.get_bool(PrefetchKey::CloudMediaAvailable),
            Some(false)
        );
    }

    #[tokio::test]
    async fn test_flag_disabled_skips_probe() {
        let provider = FakeProvider {
            providers: vec![ProviderInfo {
                authority: "cloud".into(),
                remote: true,
            }],
            delay: None,
        };
        let results = run_prefetch(&provider, &config_with_cloud_flag(false)).await;
        assert_eq!(results.get_bool(PrefetchKey::CloudMediaAvailable), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_leaves_key_absent() {
        let provider = FakeProvider {
            providers: vec![ProviderInfo {
                authority: "cloud".into(),
                remote: true,
            }],
            delay: Some(Duration::from_secs(5)),
        };
        let results = run_prefetch(&provider, &config_with_cloud_flag(true)).await;
        assert_eq!(results.get_bool(PrefetchKey::CloudMediaAvailable), None);
    }
}
