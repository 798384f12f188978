use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::profile::ProfileView;
use crate::user::MeView;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Me,
    Profile(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData {
    Me(MeView),
    Profile(ProfileView),
}

#[derive(Debug)]
struct Entry {
    data: QueryData,
    stale: bool,
}

/// Client-side cache of server reads.
///
/// Invalidated entries keep their data for display but report as stale
/// until the next `set`.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &QueryKey) -> Option<QueryData> {
        self.lock().get(key).map(|entry| entry.data.clone())
    }

    /// Present and not invalidated
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.lock().get(key).is_some_and(|entry| !entry.stale)
    }

    pub fn set(&self, key: QueryKey, data: QueryData) {
        self.lock().insert(key, Entry { data, stale: false });
    }

    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.stale = true;
        }
    }

    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) {
        for (key, entry) in self.lock().iter_mut() {
            if predicate(key) {
                entry.stale = true;
            }
        }
    }

    pub fn remove(&self, key: &QueryKey) -> Option<QueryData> {
        self.lock().remove(key).map(|entry| entry.data)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Mutate an entry in place and return what it held before, under one lock
    pub(crate) fn replace_with(
        &self,
        key: &QueryKey,
        mutate: impl FnOnce(&mut QueryData),
    ) -> Option<QueryData> {
        let mut entries = self.lock();
        let entry = entries.get_mut(key)?;
        let snapshot = entry.data.clone();
        mutate(&mut entry.data);
        Some(snapshot)
    }

    /// Put a snapshot back, keeping the entry's staleness
    pub(crate) fn restore(&self, key: &QueryKey, snapshot: QueryData) {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) => entry.data = snapshot,
            None => {
                entries.insert(
                    key.clone(),
                    Entry {
                        data: snapshot,
                        stale: true,
                    },
                );
            }
        }
    }
}
