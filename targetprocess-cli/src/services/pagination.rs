//! Result paginator
//!
//! Holds large formatted results under a key and serves them back one page
//! at a time. Entries live for a fixed TTL and only in memory; callers keep
//! the key, the paginator keeps the text.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use crate::api::error::NotFoundError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Page length in characters
    pub page_size: usize,
    pub ttl: Duration,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 4000,
            ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// One page of a cached result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub key: String,
    /// 1-based page number
    pub number: usize,
    pub total_pages: usize,
    pub text: String,
    pub has_more: bool,
}

#[derive(Debug)]
struct Entry {
    full_text: String,
    page_size: usize,
    created_at: Instant,
    ttl: Duration,
    next_page: usize,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    fn total_pages(&self) -> usize {
        self.full_text.chars().count().div_ceil(self.page_size).max(1)
    }

    fn page_text(&self, number: usize) -> String {
        self.full_text
            .chars()
            .skip((number - 1) * self.page_size)
            .take(self.page_size)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ResultPaginator {
    config: PaginationConfig,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ResultPaginator {
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            config: PaginationConfig {
                page_size: config.page_size.max(1),
                ttl: config.ttl,
            },
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Cache `text` and return its first page. Storing a text that is
    /// already cached reuses its key and rewinds it to the first page.
    /// Expired entries are evicted on every store.
    pub fn store(&self, text: impl Into<String>) -> Page {
        let full_text = text.into();
        let key = cache_key(&full_text);

        let mut entries = self.entries.lock();
        let expired = evict_expired(&mut entries);
        if expired > 0 {
            debug!("Evicted {} expired result(s)", expired);
        }

        let entry = Entry {
            full_text,
            page_size: self.config.page_size,
            created_at: Instant::now(),
            ttl: self.config.ttl,
            next_page: 2,
        };
        let page = render(&key, &entry, 1);
        debug!(
            "Cached result {} ({} page(s) of {} chars)",
            key, page.total_pages, entry.page_size
        );
        entries.insert(key, entry);
        page
    }

    /// Page `number` (1-based) of a cached result, or the next page not yet
    /// served when `number` is `None`
    pub fn page(&self, key: &str, number: Option<usize>) -> Result<Page, NotFoundError> {
        let mut entries = self.entries.lock();
        let entry = live_entry(&mut entries, key)?;

        let number = number.unwrap_or(entry.next_page);
        let total_pages = entry.total_pages();
        if number == 0 || number > total_pages {
            return Err(NotFoundError::page_out_of_range(key, number, total_pages));
        }

        entry.next_page = number + 1;
        Ok(render(key, entry, number))
    }

    /// The whole cached text, regardless of size
    pub fn all(&self, key: &str) -> Result<String, NotFoundError> {
        let mut entries = self.entries.lock();
        let entry = live_entry(&mut entries, key)?;
        Ok(entry.full_text.clone())
    }

    /// Drop expired entries, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        evict_expired(&mut self.entries.lock())
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_expired(entries: &mut HashMap<String, Entry>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired());
    before - entries.len()
}

fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
) -> Result<&'a mut Entry, NotFoundError> {
    if entries.get(key).is_some_and(Entry::is_expired) {
        entries.remove(key);
        debug!("Cached result {} expired", key);
    }
    entries
        .get_mut(key)
        .ok_or_else(|| NotFoundError::expired_key(key))
}

fn render(key: &str, entry: &Entry, number: usize) -> Page {
    let total_pages = entry.total_pages();
    Page {
        key: key.to_string(),
        number,
        total_pages,
        text: entry.page_text(number),
        has_more: number < total_pages,
    }
}

fn cache_key(text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("res-{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(page_size: usize) -> ResultPaginator {
        ResultPaginator::new(PaginationConfig {
            page_size,
            ttl: Duration::from_secs(60),
        })
    }

    #[test]
    fn test_large_text_is_paged() {
        let paginator = paginator(4000);
        let text = "A".repeat(10_000);

        let first = paginator.store(text.clone());
        assert_eq!(first.text.len(), 4000);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_more);

        let page_one = paginator.page(&first.key, Some(1)).unwrap();
        assert!(page_one.text.len() <= 4000);
        assert!(text.starts_with(&page_one.text));

        assert_eq!(paginator.all(&first.key).unwrap(), text);
    }

    #[test]
    fn test_next_unseen_page() {
        let paginator = paginator(3);
        let first = paginator.store("abcdefgh");
        assert_eq!(first.text, "abc");

        let second = paginator.page(&first.key, None).unwrap();
        assert_eq!((second.number, second.text.as_str()), (2, "def"));

        let third = paginator.page(&first.key, None).unwrap();
        assert_eq!(third.text, "gh");
        assert!(!third.has_more);

        assert!(paginator.page(&first.key, None).is_err());
    }

    #[test]
    fn test_unknown_key() {
        let err = paginator(10).page("unknown-key", None).unwrap_err();
        assert!(err.message.contains("re-run"));
        assert!(paginator(10).all("unknown-key").is_err());
    }

    #[test]
    fn test_page_out_of_range() {
        let paginator = paginator(5);
        let first = paginator.store("0123456789");
        assert!(paginator.page(&first.key, Some(0)).is_err());
        assert!(paginator.page(&first.key, Some(3)).is_err());
    }

    #[test]
    fn test_pages_split_on_char_boundaries() {
        let paginator = paginator(2);
        let first = paginator.store("äöüß");
        assert_eq!(first.text, "äö");
        assert_eq!(paginator.page(&first.key, Some(2)).unwrap().text, "üß");
    }

    #[test]
    fn test_same_text_reuses_key_and_rewinds() {
        let paginator = paginator(2);
        let first = paginator.store("abcdef");
        paginator.page(&first.key, None).unwrap();

        let again = paginator.store("abcdef");
        assert_eq!(again.key, first.key);
        assert_eq!(paginator.len(), 1);
        assert_eq!(paginator.page(&again.key, None).unwrap().number, 2);
    }

    #[test]
    fn test_expired_entries() {
        let paginator = ResultPaginator::new(PaginationConfig {
            page_size: 10,
            ttl: Duration::ZERO,
        });
        let first = paginator.store("short");
        assert!(paginator.page(&first.key, Some(1)).is_err());
        assert!(paginator.is_empty());

        paginator.store("other");
        assert_eq!(paginator.sweep_expired(), 1);
    }

    #[test]
    fn test_store_evicts_expired_entries() {
        let paginator = ResultPaginator::new(PaginationConfig {
            page_size: 10,
            ttl: Duration::ZERO,
        });
        for i in 0..100 {
            paginator.store(format!("result {}", i));
        }
        // only the entry just stored survives until the next store
        assert_eq!(paginator.len(), 1);
    }

    #[test]
    fn test_store_keeps_live_entries() {
        let paginator = paginator(10);
        let first = paginator.store("first");
        paginator.store("second");
        assert_eq!(paginator.len(), 2);
        assert_eq!(paginator.all(&first.key).unwrap(), "first");
    }

    #[test]
    fn test_clear() {
        let paginator = paginator(10);
        let first = paginator.store("text");
        paginator.clear();
        assert!(paginator.all(&first.key).is_err());
    }

    #[test]
    fn test_empty_text_is_single_page() {
        let first = paginator(10).store("");
        assert_eq!(first.total_pages, 1);
        assert!(!first.has_more);
        assert_eq!(first.text, "");
    }
}
