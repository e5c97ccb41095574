//! In-memory caching layer consulted by the async worker before falling
//! back to SQL, per the component design for Caching & Change Tracking.
//!
//! Grounded on the upstream local-storage manager's per-entity LRU caches:
//! each entity family gets its own bounded cache, indexed by `LocalUid` as
//! primary key with secondary indices by `Guid` and by unique display name
//! where the entity family has one.

mod expiry;

pub use expiry::{DefaultExpiryPredicate, ExpiryPredicate};

use std::collections::HashMap;

use crate::types::{Guid, LocalUid, Timestamp};

/// A cached value plus the bookkeeping needed to expire it.
struct Entry<T> {
    value: T,
    last_access: Timestamp,
}

/// A bounded, multi-indexed cache for one entity family.
///
/// `find_by`/`find_by_name` are pure reads and do not update
/// `last_access` — only [`Cache::put`] stamps it, matching the upstream
/// policy that only a fresh write (from `add`/`update`/`list`) resets an
/// entry's place in the eviction order.
pub struct Cache<T> {
    by_local_uid: HashMap<LocalUid, Entry<T>>,
    by_guid: HashMap<Guid, LocalUid>,
    by_name: HashMap<String, LocalUid>,
    bound: usize,
}

impl<T> Cache<T> {
    /// Creates an empty cache bounded to at most `bound` entries.
    pub fn new(bound: usize) -> Self {
        Self {
            by_local_uid: HashMap::new(),
            by_guid: HashMap::new(),
            by_name: HashMap::new(),
            bound,
        }
    }

    /// Inserts or replaces a cached value, stamping `last_access` to now.
    /// If the cache is at capacity and `predicate` rejects the insertion,
    /// the oldest entry by `last_access` is evicted first.
    pub fn put(
        &mut self,
        local_uid: LocalUid,
        guid: Option<Guid>,
        name: Option<String>,
        value: T,
        predicate: &impl ExpiryPredicate,
    ) {
        if !self.by_local_uid.contains_key(&local_uid) && self.by_local_uid.len() >= self.bound {
            let candidates = self.by_local_uid.iter().map(|(k, e)| (*k, e.last_access));
            if let Some(victim) = predicate.victim(candidates) {
                self.expunge(victim);
            } else {
                return;
            }
        }
        if let Some(guid) = guid {
            self.by_guid.insert(guid, local_uid);
        }
        if let Some(name) = name {
            self.by_name.insert(name, local_uid);
        }
        self.by_local_uid.insert(
            local_uid,
            Entry {
                value,
                last_access: Timestamp::now(),
            },
        );
    }

    /// Looks up a cached value by local uid, without touching `last_access`.
    pub fn find_by(&self, local_uid: &LocalUid) -> Option<&T> {
        self.by_local_uid.get(local_uid).map(|e| &e.value)
    }

    /// Looks up a cached value by remote guid, without touching
    /// `last_access`.
    pub fn find_by_guid(&self, guid: &Guid) -> Option<&T> {
        let local_uid = self.by_guid.get(guid)?;
        self.find_by(local_uid)
    }

    /// Looks up a cached value by unique display name, without touching
    /// `last_access`.
    pub fn find_by_name(&self, name: &str) -> Option<&T> {
        let local_uid = self.by_name.get(name)?;
        self.find_by(local_uid)
    }

    /// Removes an entry from every index.
    pub fn expunge(&mut self, local_uid: LocalUid) {
        self.by_local_uid.remove(&local_uid);
        self.by_guid.retain(|_, v| *v != local_uid);
        self.by_name.retain(|_, v| *v != local_uid);
    }

    /// Number of entries currently cached.
    pub fn num_cached(&self) -> usize {
        self.by_local_uid.len()
    }

    /// Clears every index.
    pub fn clear(&mut self) {
        self.by_local_uid.clear();
        self.by_guid.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_find_by_local_uid() {
        let mut cache: Cache<String> = Cache::new(10);
        let uid = LocalUid::new();
        let predicate = DefaultExpiryPredicate;
        cache.put(uid, None, None, "hello".to_string(), &predicate);
        assert_eq!(cache.find_by(&uid), Some(&"hello".to_string()));
    }

    #[test]
    fn find_by_does_not_touch_last_access() {
        let mut cache: Cache<String> = Cache::new(10);
        let uid = LocalUid::new();
        let predicate = DefaultExpiryPredicate;
        cache.put(uid, None, None, "hello".to_string(), &predicate);
        let before = cache.by_local_uid.get(&uid).unwrap().last_access;
        std::thread::sleep(std::time::Duration::from_millis(1));
        let _ = cache.find_by(&uid);
        let after = cache.by_local_uid.get(&uid).unwrap().last_access;
        assert_eq!(before, after);
    }

    #[test]
    fn find_by_guid_and_name() {
        let mut cache: Cache<String> = Cache::new(10);
        let uid = LocalUid::new();
        let guid = Guid::new("g1");
        let predicate = DefaultExpiryPredicate;
        cache.put(
            uid,
            Some(guid.clone()),
            Some("Inbox".into()),
            "value".to_string(),
            &predicate,
        );
        assert_eq!(cache.find_by_guid(&guid), Some(&"value".to_string()));
        assert_eq!(cache.find_by_name("Inbox"), Some(&"value".to_string()));
    }

    #[test]
    fn expunge_removes_from_every_index() {
        let mut cache: Cache<String> = Cache::new(10);
        let uid = LocalUid::new();
        let guid = Guid::new("g1");
        let predicate = DefaultExpiryPredicate;
        cache.put(uid, Some(guid.clone()), None, "v".to_string(), &predicate);
        cache.expunge(uid);
        assert_eq!(cache.find_by(&uid), None);
        assert_eq!(cache.find_by_guid(&guid), None);
        assert_eq!(cache.num_cached(), 0);
    }

    #[test]
    fn bound_is_enforced() {
        let mut cache: Cache<String> = Cache::new(2);
        let predicate = DefaultExpiryPredicate;
        for i in 0..5 {
            cache.put(LocalUid::new(), None, None, format!("v{i}"), &predicate);
        }
        assert!(cache.num_cached() <= 2);
    }
}
