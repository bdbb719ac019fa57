use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

/// Rendered pages kept for a fixed time. A zero lifetime disables caching.
pub struct PageCache {
    ttl: Duration,
    pages: Mutex<HashMap<String, (Instant, String)>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pages: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if self.ttl.is_zero() {
            return None;
        }

        let mut pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
        match pages.get(key) {
            Some((stored, html)) if stored.elapsed() < self.ttl => Some(html.clone()),
            Some(_) => {
                pages.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `html` under `key` and drops every expired page.
    pub fn put(&self, key: String, html: String) {
        if self.ttl.is_zero() {
            return;
        }

        let mut pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
        pages.retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        pages.insert(key, (Instant::now(), html));
    }

    pub fn clear(&self) {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire() {
        let cache = PageCache::new(Duration::from_millis(30));
        cache.put("index:1".into(), "<p>first</p>".into());
        assert_eq!(cache.get("index:1").as_deref(), Some("<p>first</p>"));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("index:1"), None);
    }

    #[test]
    fn expired_pages_are_pruned_on_put() {
        let cache = PageCache::new(Duration::from_millis(1));
        for page in 0..1000 {
            cache.put(format!("index::{page}"), "<p>page</p>".into());
        }

        std::thread::sleep(Duration::from_millis(5));
        cache.put("index::1".into(), "<p>fresh</p>".into());
        assert_eq!(cache.pages.lock().unwrap().len(), 1);
    }

    #[test]
    fn zero_lifetime_stores_nothing() {
        let cache = PageCache::new(Duration::ZERO);
        cache.put("index:1".into(), "<p>first</p>".into());
        assert_eq!(cache.get("index:1"), None);
    }

    #[test]
    fn clear_drops_everything() {
        let cache = PageCache::new(Duration::from_secs(20));
        cache.put("index:1".into(), "a".into());
        cache.put("index:2".into(), "b".into());
        cache.clear();
        assert_eq!(cache.get("index:1"), None);
        assert_eq!(cache.get("index:2"), None);
    }
}
