//! Release Liaison Cache
//!
//! Liaison details live in a separate, slow-moving document. The cache
//! fetches it the first time any team asks and shares the result with every
//! team view built afterwards. Concurrent first access still triggers a
//! single fetch; a failed fetch leaves the cache empty so a later lookup
//! can try again.

use crate::error::{GovernanceError, GovernanceResult};
use crate::source::{LiaisonData, LiaisonSource};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Release liaison for a team. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Liaison {
    pub name: Option<String>,
    pub irc: Option<String>,
}

/// Process-wide memo over the liaison document
pub struct LiaisonCache {
    source: Arc<dyn LiaisonSource>,
    location: String,
    data: OnceCell<LiaisonData>,
}

impl LiaisonCache {
    pub fn new(source: Arc<dyn LiaisonSource>, location: impl Into<String>) -> Self {
        Self {
            source,
            location: location.into(),
            data: OnceCell::new(),
        }
    }

    /// The liaison table, fetching it on first use
    pub async fn data(&self) -> GovernanceResult<&LiaisonData> {
        self.data
            .get_or_try_init(|| async {
                info!("Fetching liaison data from {}", self.location);
                let data = self.source.fetch_liaison_data(&self.location).await?;
                info!("Loaded {} liaison entries", data.len());
                Ok::<_, GovernanceError>(data)
            })
            .await
    }

    /// Liaison for a team, matched on the lowercased team name
    pub async fn lookup(&self, team_name: &str) -> GovernanceResult<Liaison> {
        let data = self.data().await?;
        let key = team_name.to_lowercase();
        let liaison = data
            .get(&key)
            .map(|entry| Liaison {
                name: entry.liaison.clone(),
                irc: entry.irc_handle.clone(),
            })
            .unwrap_or_default();
        debug!("Liaison for {}: {:?}", key, liaison);
        Ok(liaison)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::source_unavailable;
    use crate::governance::data::tests::sample;
    use crate::governance::model::Team;
    use crate::source::LiaisonEntry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Liaison source that counts fetches and can be told to fail
    pub(crate) struct CountingSource {
        pub calls: AtomicUsize,
        pub failures_left: AtomicUsize,
    }

    impl CountingSource {
        pub(crate) fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LiaisonSource for CountingSource {
        async fn fetch_liaison_data(&self, location: &str) -> GovernanceResult<LiaisonData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(source_unavailable(location, "wiki is down"));
            }
            let mut data = LiaisonData::new();
            data.insert(
                "compute".to_string(),
                LiaisonEntry {
                    project: "Compute".to_string(),
                    liaison: Some("Alex Smith".to_string()),
                    irc_handle: Some("asmith".to_string()),
                },
            );
            data.insert(
                "storage".to_string(),
                LiaisonEntry {
                    project: "Storage".to_string(),
                    liaison: Some(String::new()),
                    irc_handle: None,
                },
            );
            data.insert(
                "release management".to_string(),
                LiaisonEntry {
                    project: "Release Management".to_string(),
                    liaison: Some("Sam Rivers".to_string()),
                    irc_handle: None,
                },
            );
            Ok(data)
        }
    }

    #[tokio::test]
    async fn test_fetches_once_across_teams() {
        let source = Arc::new(CountingSource::new());
        let cache = LiaisonCache::new(source.clone(), "wiki");
        let data = sample();

        let compute = Team::from_data(&data, "compute");
        let storage = Team::from_data(&data, "storage");
        assert_eq!(source.calls(), 0);

        let first = compute.liaison(&cache).await.unwrap();
        let second = storage.liaison(&cache).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(first.name.as_deref(), Some("Alex Smith"));
        assert_eq!(first.irc.as_deref(), Some("asmith"));
        assert_eq!(second.name.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_concurrent_first_access_fetches_once() {
        let source = Arc::new(CountingSource::new());
        let cache = LiaisonCache::new(source.clone(), "wiki");

        let (a, b) = tokio::join!(cache.lookup("Compute"), cache.lookup("storage"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_team_has_no_liaison() {
        let cache = LiaisonCache::new(Arc::new(CountingSource::new()), "wiki");
        let liaison = cache.lookup("neutron").await.unwrap();
        assert_eq!(liaison, Liaison::default());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let source = Arc::new(CountingSource::new());
        source.failures_left.store(1, Ordering::SeqCst);
        let cache = LiaisonCache::new(source.clone(), "wiki");

        let err = cache.lookup("compute").await.unwrap_err();
        assert!(matches!(err, GovernanceError::SourceUnavailable { .. }));
        assert_eq!(source.calls(), 1);

        let liaison = cache.lookup("compute").await.unwrap();
        assert_eq!(liaison.irc.as_deref(), Some("asmith"));
        assert_eq!(source.calls(), 2);
    }
}
