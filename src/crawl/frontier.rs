// src/crawl/frontier.rs
// =============================================================================
// The Frontier: the breadth-first queue of pages still to fetch.
//
// How it works:
// 1. push(url, depth) normalizes the URL and checks the visited set
// 2. Unseen URLs within the depth limit are marked visited and queued
// 3. pop() hands out tasks in FIFO order, so lower depths come first
//
// The visited check and the enqueue happen under one lock. Two workers that
// discover the same link at the same time can never both schedule it.
//
// Rust concepts:
// - parking_lot::Mutex: a lock whose guard is released when it goes out of scope
// - HashSet: To track visited URLs (O(1) lookup)
// - VecDeque: Double-ended queue for breadth-first crawling
// =============================================================================

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use url::Url;

// A page waiting in the frontier
//
// The url is already normalized; the seed has depth 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: usize,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<CrawlTask>,
    visited: HashSet<String>,
}

#[derive(Debug)]
pub struct Frontier {
    max_depth: usize,
    state: Mutex<FrontierState>,
}

impl Frontier {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            state: Mutex::new(FrontierState::default()),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    // Schedules a URL at the given depth
    //
    // Returns true if the URL was queued, false if it was already visited or
    // lies beyond the depth limit
    pub fn push(&self, url: Url, depth: usize) -> bool {
        if depth > self.max_depth {
            return false;
        }

        let url = normalize(url);
        let key = url.as_str().to_string();

        let mut state = self.state.lock();
        if !state.visited.insert(key) {
            return false;
        }
        state.queue.push_back(CrawlTask { url, depth });
        true
    }

    // Takes the oldest queued task
    pub fn pop(&self) -> Option<CrawlTask> {
        self.state.lock().queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    // Number of distinct URLs ever scheduled during this run
    pub fn visited_count(&self) -> usize {
        self.state.lock().visited.len()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        let key = normalize(url.clone());
        self.state.lock().visited.contains(key.as_str())
    }

    // Copy of the visited set (for reports and tests)
    pub fn visited(&self) -> HashSet<String> {
        self.state.lock().visited.clone()
    }
}

// Canonical form used for dedup
//
// The url crate already lower-cases the host, drops default ports and turns
// an empty path into "/"; the fragment never reaches the server so it is
// dropped too
pub fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is push() taking &self and not &mut self?
//    - The frontier is shared between workers through an Arc
//    - An Arc only gives out shared references (&Frontier)
//    - The Mutex inside provides the mutation ("interior mutability")
//
// 2. Why check the depth before taking the lock?
//    - max_depth never changes after construction, no lock is needed to read it
//    - Tasks beyond the limit are rejected without touching the visited set
//
// 3. Why does visited only grow?
//    - A URL stays visited for the whole run, even after its task is popped
//    - That is what guarantees each URL is fetched at most once
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let frontier = Frontier::new(3);
        assert!(frontier.push(url("http://site.test/"), 0));
        assert!(frontier.push(url("http://site.test/a"), 1));
        assert!(frontier.push(url("http://site.test/b"), 1));

        let order: Vec<_> = std::iter::from_fn(|| frontier.pop())
            .map(|t| (t.url.to_string(), t.depth))
            .collect();
        assert_eq!(
            order,
            vec![
                ("http://site.test/".to_string(), 0),
                ("http://site.test/a".to_string(), 1),
                ("http://site.test/b".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_duplicate_push_is_noop() {
        let frontier = Frontier::new(2);
        assert!(frontier.push(url("http://site.test/a"), 1));
        assert!(!frontier.push(url("http://site.test/a"), 1));
        assert!(!frontier.push(url("http://site.test/a"), 2));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_visited_survives_pop() {
        let frontier = Frontier::new(2);
        frontier.push(url("http://site.test/a"), 0);
        frontier.pop();
        assert!(frontier.is_empty());
        assert!(!frontier.push(url("http://site.test/a"), 1));
        assert_eq!(frontier.visited_count(), 1);
    }

    #[test]
    fn test_depth_limit() {
        let frontier = Frontier::new(0);
        assert!(frontier.push(url("http://site.test/"), 0));
        assert!(!frontier.push(url("http://site.test/child"), 1));
        // Rejected tasks are not marked visited
        assert!(!frontier.is_visited(&url("http://site.test/child")));
    }

    #[test]
    fn test_normalization_dedups_equivalent_urls() {
        let frontier = Frontier::new(1);
        assert!(frontier.push(url("HTTP://Site.Test:80"), 0));
        assert!(!frontier.push(url("http://site.test/#top"), 1));
        assert!(frontier.push(url("http://site.test/?q=1"), 1));
        assert_eq!(frontier.visited_count(), 2);
    }

    #[test]
    fn test_concurrent_pushes_schedule_once() {
        let frontier = Arc::new(Frontier::new(1));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| frontier.push(url(&format!("http://site.test/{}", i)), 1))
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 100);
        assert_eq!(frontier.len(), 100);
    }
}
