use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per provider, created on first use. Work for different
/// providers never contends. Entries nobody holds or waits on are dropped on
/// the next `lock`, so the map only tracks providers with work in progress.
#[derive(Default)]
pub struct ProviderLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ProviderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, provider_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // A count of one means only the map refers to it.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(provider_id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn different_providers_do_not_block_each_other() {
        let locks = ProviderLocks::new();
        let _first = locks.lock(Uuid::new_v4()).await;

        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(Uuid::new_v4())).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn same_provider_waits_for_release() {
        let locks = ProviderLocks::new();
        let provider = Uuid::new_v4();
        let guard = locks.lock(provider).await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(provider)).await;
        assert!(blocked.is_err());

        drop(guard);
        let acquired = tokio::time::timeout(Duration::from_millis(100), locks.lock(provider)).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_forgotten() {
        let locks = ProviderLocks::new();
        for _ in 0..10 {
            drop(locks.lock(Uuid::new_v4()).await);
        }
        let held = locks.lock(Uuid::new_v4()).await;

        assert_eq!(locks.locks.lock().await.len(), 1);
        drop(held);
    }

    #[tokio::test]
    async fn pruning_keeps_a_held_lock_exclusive() {
        let locks = ProviderLocks::new();
        let provider = Uuid::new_v4();
        let guard = locks.lock(provider).await;
        drop(locks.lock(Uuid::new_v4()).await);

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(provider)).await;
        assert!(blocked.is_err());
        drop(guard);
    }
}
