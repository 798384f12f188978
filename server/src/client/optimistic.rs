use super::cache::{QueryCache, QueryData, QueryKey};

/// A cache write made ahead of the server's answer.
///
/// The snapshot is taken under the same lock as the write. Each update is
/// settled exactly once: [`confirm`](Self::confirm) keeps the optimistic value,
/// [`rollback`](Self::rollback) restores the snapshot. Dropping an unsettled
/// update rolls it back, so a cancelled request never leaves a guess behind.
#[must_use = "an optimistic update must be confirmed or rolled back"]
#[derive(Debug)]
pub struct OptimisticUpdate {
    cache: QueryCache,
    key: QueryKey,
    snapshot: Option<QueryData>,
}

impl OptimisticUpdate {
    /// Apply `mutate` to the entry at `key`. `None` if nothing is cached there.
    pub fn apply(
        cache: &QueryCache,
        key: QueryKey,
        mutate: impl FnOnce(&mut QueryData),
    ) -> Option<Self> {
        let snapshot = cache.replace_with(&key, mutate)?;

        Some(Self {
            cache: cache.clone(),
            key,
            snapshot: Some(snapshot),
        })
    }

    pub fn confirm(mut self) -> QueryKey {
        self.snapshot = None;
        self.key.clone()
    }

    pub fn rollback(mut self) -> QueryKey {
        if let Some(snapshot) = self.snapshot.take() {
            self.cache.restore(&self.key, snapshot);
        }
        self.key.clone()
    }

    /// Confirm on success, roll back on failure. Returns the key to reconcile.
    pub fn settle(self, ok: bool) -> QueryKey {
        if ok {
            self.confirm()
        } else {
            self.rollback()
        }
    }
}

impl Drop for OptimisticUpdate {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.cache.restore(&self.key, snapshot);
        }
    }
}
