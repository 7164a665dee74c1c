//! Time-bounded cache of resolved agent cards

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{sync::RwLock, time::Instant};
use url::Url;

use crate::{discovery::CardResolver, protocol::agent::AgentCard, protocol::error::A2AResult};

struct CachedCard {
    card: Arc<AgentCard>,
    fetched_at: Instant,
}

/// Agent cards keyed by agent base URL
///
/// Cards are shared as `Arc<AgentCard>` and never mutated: a refresh swaps
/// the whole entry under the write lock, so readers see either the old card
/// or the new one. Entries older than the TTL are treated as absent.
pub struct AgentCardCache {
    resolver: CardResolver,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedCard>>,
}

impl AgentCardCache {
    pub fn new(resolver: CardResolver, ttl: Duration) -> Self {
        Self {
            resolver,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(url: &Url) -> String {
        url.as_str().trim_end_matches('/').to_string()
    }

    /// The cached card for `url`, unless missing or expired
    pub async fn get(&self, url: &Url) -> Option<Arc<AgentCard>> {
        let entries = self.entries.read().await;
        entries
            .get(&Self::key(url))
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.card.clone())
    }

    /// Store `card` for `url`, replacing any previous entry
    pub async fn insert(&self, url: &Url, card: AgentCard) -> Arc<AgentCard> {
        let card = Arc::new(card);
        self.entries.write().await.insert(
            Self::key(url),
            CachedCard {
                card: card.clone(),
                fetched_at: Instant::now(),
            },
        );
        card
    }

    /// The cached card for `url`, resolving it when missing or expired
    pub async fn get_or_discover(&self, url: &Url) -> A2AResult<Arc<AgentCard>> {
        if let Some(card) = self.get(url).await {
            return Ok(card);
        }
        self.refresh(url).await
    }

    /// Resolve the card for `url` again and replace the cached entry
    ///
    /// On failure the previous entry is left as it was.
    pub async fn refresh(&self, url: &Url) -> A2AResult<Arc<AgentCard>> {
        let card = self.resolver.discover(url).await?;
        Ok(self.insert(url, card).await)
    }

    /// Drop the entry for `url`, returning whether one existed
    pub async fn invalidate(&self, url: &Url) -> bool {
        self.entries.write().await.remove(&Self::key(url)).is_some()
    }

    /// Drop every expired entry
    pub async fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries
            .write()
            .await
            .retain(|_, entry| entry.fetched_at.elapsed() < ttl);
    }

    /// Number of entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://agent.example.com/").unwrap()
    }

    fn cache() -> AgentCardCache {
        AgentCardCache::new(CardResolver::new(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = cache();
        assert!(cache.get(&url()).await.is_none());

        cache
            .insert(&url(), AgentCard::new("Echo", "", "http://agent.example.com/"))
            .await;

        // trailing slash does not change the key
        let bare = Url::parse("http://agent.example.com").unwrap();
        assert_eq!(cache.get(&bare).await.unwrap().name, "Echo");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = cache();
        cache.insert(&url(), AgentCard::new("Echo", "", "")).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get(&url()).await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&url()).await.is_none());
        assert_eq!(cache.len().await, 1);

        cache.purge_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_replace_is_wholesale() {
        let cache = cache();
        let old = cache.insert(&url(), AgentCard::new("v1", "", "")).await;
        cache
            .insert(&url(), AgentCard::new("v2", "", "").with_version("2"))
            .await;

        // readers holding the old card keep an intact snapshot
        assert_eq!(old.name, "v1");
        assert_eq!(old.version, "");
        assert_eq!(cache.get(&url()).await.unwrap().name, "v2");
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = cache();
        cache.insert(&url(), AgentCard::new("Echo", "", "")).await;

        assert!(cache.invalidate(&url()).await);
        assert!(!cache.invalidate(&url()).await);
        assert!(cache.get(&url()).await.is_none());
    }
}
