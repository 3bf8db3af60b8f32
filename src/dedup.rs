/// Last time each aircraft identity was successfully notified, in epoch seconds.
///
/// Owned by the processing worker; entries are only ever overwritten, never
/// expired.
#[derive(Debug, Default)]
pub struct NotificationDedupCache {
    last_notified: std::collections::HashMap<String, i64>,
}

impl NotificationDedupCache {
    #[must_use]
    pub fn new() -> Self {
        NotificationDedupCache {
            last_notified: std::collections::HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<i64> {
        if identity.is_empty() {
            return None;
        }
        self.last_notified.get(identity).copied()
    }

    pub fn set(&mut self, identity: &str, timestamp: i64) {
        if identity.is_empty() {
            return;
        }
        self.last_notified.insert(identity.to_string(), timestamp);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.last_notified.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_notified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::NotificationDedupCache;

    #[test]
    fn when_identity_never_notified_then_nothing_is_returned() {
        let cache = NotificationDedupCache::new();
        assert_eq!(cache.get("UAL123"), None);
    }

    #[test]
    fn when_identity_notified_twice_then_latest_timestamp_wins() {
        let mut cache = NotificationDedupCache::new();
        cache.set("UAL123", 1_700_000_000);
        cache.set("UAL123", 1_700_000_600);

        assert_eq!(cache.get("UAL123"), Some(1_700_000_600));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn when_identity_is_empty_then_cache_ignores_it() {
        let mut cache = NotificationDedupCache::new();
        cache.set("", 1_700_000_000);

        assert_eq!(cache.get(""), None);
        assert!(cache.is_empty());
    }
}
