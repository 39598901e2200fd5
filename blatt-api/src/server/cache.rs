use blatt_common::{model::post::Post, page::Page, util::Ttl};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Instant,
};

/// Read-through cache for the home post listing, keyed by canonical (clamped)
/// page number.
///
/// Expiry is the only invalidation: nothing evicts on writes, so a post
/// deleted after an entry was populated stays visible until the TTL lapses.
#[derive(Debug)]
pub struct PageCache {
    ttl: Ttl,
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    stored_at: Instant,
    page: Page<Post>,
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: Ttl) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, page_number: u64) -> Option<Page<Post>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&page_number)?;

        (entry.stored_at.elapsed() < self.ttl.as_std()).then(|| entry.page.clone())
    }

    pub fn store(&self, page_number: u64, page: Page<Post>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.stored_at.elapsed() < self.ttl.as_std());
        entries.insert(
            page_number,
            CacheEntry {
                stored_at: Instant::now(),
                page,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::server::cache::PageCache;
    use blatt_common::{
        page::{Page, Pagination},
        util::Ttl,
    };
    use std::{thread, time::Duration as StdDuration};
    use time::Duration;

    fn empty_page() -> Page<blatt_common::model::post::Post> {
        Page::assemble(Vec::new(), Pagination::locate(0, 1))
    }

    #[test]
    fn entries_live_until_the_ttl() {
        let cache = PageCache::new(Ttl::from_secs(60).unwrap());
        assert!(cache.lookup(1).is_none());

        cache.store(1, empty_page());
        assert!(cache.lookup(1).is_some());
        assert!(cache.lookup(2).is_none());
    }

    #[test]
    fn entries_lapse_after_the_ttl() {
        let cache = PageCache::new(Ttl::new(Duration::milliseconds(5)).unwrap());

        cache.store(1, empty_page());
        thread::sleep(StdDuration::from_millis(10));

        assert!(cache.lookup(1).is_none());
    }
}
