// src/crawl/engine.rs
// =============================================================================
// The Crawler: ties Frontier, ScopePolicy, Fetcher and Detector together.
//
// How a run goes:
// 1. Idle: the seed is parsed and the scope policy is computed from it
// 2. Running: the seed is fetched first; if that fails the run aborts
// 3. Running: workers pop tasks, fetch, scan, extract links, filter by scope
//    and push children at depth + 1
// 4. Draining: the frontier is empty but some fetches are still out. Only
//    a pool of two or more workers drains; a single worker goes straight
//    from Running to Done
// 5. Done: nothing queued and nothing in flight (or the run was cancelled)
//
// Cancellation is honoured at every step, including the seed fetch.
//
// There is only one traversal loop. The Fetcher decides how many workers
// run at once: one for SequentialFetcher, K for ConcurrentFetcher. With
// K > 1 a fast response can push its children before a slower sibling at
// the same depth has been fetched, so the order is only roughly
// breadth-first. With one worker it is exactly breadth-first.
// =============================================================================

use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use super::frontier::{CrawlTask, Frontier};
use super::scope::ScopePolicy;
use crate::config::CrawlConfig;
use crate::error::{CrawlError, RunError};
use crate::fetch::{FetchedPage, Fetcher, Transport};
use crate::scan::{Detector, Finding, HtmlLinkExtractor, LexicalDetector, LinkExtractor, PageContent};
use crate::sink::{ErrorEvent, ErrorSink, FindingSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Idle,
    Running,
    Draining,
    Done,
}

impl CrawlState {
    fn can_become(self, next: CrawlState) -> bool {
        use CrawlState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Idle, Done)
                | (Running, Draining)
                | (Draining, Running)
                | (Running, Done)
                | (Draining, Done)
        )
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// Summary of one finished run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    // Registrable domain the crawl was limited to
    pub scope: String,
    pub state: CrawlState,
    // Every state the crawler passed through, starting with Idle
    pub transitions: Vec<CrawlState>,
    // Every URL handed to the fetcher, in the order the fetches started
    pub fetched: Vec<String>,
    #[serde(skip)]
    pub visited: BTreeSet<String>,
    pub visited_count: usize,
    pub findings: usize,
    pub errors: usize,
    pub cancelled: bool,
    pub elapsed_ms: u128,
}

pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    detector: Arc<dyn Detector>,
    finding_sinks: Vec<Arc<dyn FindingSink>>,
    error_sinks: Vec<Arc<dyn ErrorSink>>,
    max_depth: usize,
    cancel: CancellationToken,
    state: CrawlState,
    history: Vec<CrawlState>,
}

impl Crawler {
    // A crawler with the HTML link extractor, the lexical detector and no sinks
    pub fn new(fetcher: Arc<dyn Fetcher>, max_depth: usize) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(HtmlLinkExtractor),
            detector: Arc::new(LexicalDetector::new()),
            finding_sinks: Vec::new(),
            error_sinks: Vec::new(),
            max_depth,
            cancel: CancellationToken::new(),
            state: CrawlState::Idle,
            history: vec![CrawlState::Idle],
        }
    }

    // Validates the config and picks the fetcher backend for its mode
    pub fn from_config(config: &CrawlConfig, transport: Arc<dyn Transport>) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self::new(config.build_fetcher(transport), config.max_depth))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_finding_sink(mut self, sink: Arc<dyn FindingSink>) -> Self {
        self.finding_sinks.push(sink);
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.error_sinks.push(sink);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    // Handle for stopping the run from outside (timeouts, Ctrl-C)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    fn transition(&mut self, next: CrawlState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_become(next),
            "invalid crawl state change {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "crawl state");
        self.state = next;
        self.history.push(next);
    }

    // Runs the crawl to completion
    //
    // Consumes the crawler: a crawler is good for exactly one run. The only
    // errors returned are a bad seed or a seed that cannot be fetched;
    // everything after that goes to the error sinks.
    pub async fn run(mut self, seed: &str) -> Result<CrawlReport, RunError> {
        let started = Instant::now();

        let seed_url = Url::parse(seed).map_err(|e| RunError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;
        let scope = ScopePolicy::from_seed(&seed_url)
            .filter(|scope| scope.in_scope(&seed_url))
            .ok_or_else(|| RunError::InvalidSeed {
                url: seed.to_string(),
                reason: "only http and https URLs with a host can be crawled".to_string(),
            })?;

        info!(
            seed = %seed_url,
            scope = %scope.seed_domain(),
            max_depth = self.max_depth,
            workers = self.fetcher.concurrency(),
            detector = self.detector.name(),
            "starting crawl"
        );

        let shared = Arc::new(Shared {
            frontier: Frontier::new(self.max_depth),
            scope,
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            detector: Arc::clone(&self.detector),
            finding_sinks: self.finding_sinks.clone(),
            error_sinks: self.error_sinks.clone(),
            fetched: Mutex::new(Vec::new()),
            findings: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        });

        let cancel = self.cancel.clone();
        let mut cancelled = cancel.is_cancelled();

        if cancelled {
            info!("crawl cancelled before it started");
        } else {
            self.transition(CrawlState::Running);

            // The seed goes through the same frontier so it counts as visited
            shared.frontier.push(seed_url.clone(), 0);
            if let Some(task) = shared.frontier.pop() {
                let fetched = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = shared.fetch(&task) => Some(result),
                };
                match fetched {
                    None => {
                        info!(url = %task.url, "crawl cancelled during the seed fetch");
                        cancelled = true;
                    }
                    Some(Ok(page)) => {
                        if let Err(e) = shared.process_guarded(&task, &page) {
                            shared.report(task.url.as_str(), &e);
                        }
                    }
                    Some(Err(source)) => {
                        self.transition(CrawlState::Done);
                        return Err(RunError::SeedUnreachable {
                            url: seed_url.to_string(),
                            source,
                        });
                    }
                }
            }

            if !cancelled {
                cancelled = self.drive(&shared).await;
            }
        }
        self.transition(CrawlState::Done);

        let visited: BTreeSet<String> = shared.frontier.visited().into_iter().collect();

        let report = CrawlReport {
            seed: seed_url.to_string(),
            scope: shared.scope.seed_domain().to_string(),
            state: self.state,
            transitions: self.history.clone(),
            fetched: shared.fetched.lock().clone(),
            visited_count: visited.len(),
            visited,
            findings: shared.findings.load(Ordering::SeqCst),
            errors: shared.errors.load(Ordering::SeqCst),
            cancelled,
            elapsed_ms: started.elapsed().as_millis(),
        };

        info!(
            fetched = report.fetched.len(),
            findings = report.findings,
            errors = report.errors,
            cancelled = report.cancelled,
            "crawl finished"
        );

        Ok(report)
    }

    // The worker pool loop
    //
    // Phase 1: top up in-flight tasks from the frontier
    // Phase 2: wait for one to finish (its children are already pushed)
    // Phase 3: stop when nothing is queued and nothing is in flight
    //
    // Returns true if the run was cancelled
    async fn drive(&mut self, shared: &Arc<Shared>) -> bool {
        let workers = self.fetcher.concurrency().max(1);
        let cancel = self.cancel.clone();
        let mut in_flight = JoinSet::new();
        let mut cancelled = cancel.is_cancelled();

        loop {
            if !cancelled {
                while in_flight.len() < workers {
                    let Some(task) = shared.frontier.pop() else {
                        break;
                    };
                    let worker = Arc::clone(shared);
                    in_flight.spawn(async move { worker.visit(task).await });
                }
            }

            if in_flight.is_empty() {
                break;
            }

            if !cancelled && workers > 1 {
                if shared.frontier.is_empty() {
                    self.transition(CrawlState::Draining);
                } else {
                    self.transition(CrawlState::Running);
                }
            }

            tokio::select! {
                _ = cancel.cancelled(), if !cancelled => {
                    info!(in_flight = in_flight.len(), "crawl cancelled, aborting in-flight fetches");
                    cancelled = true;
                    in_flight.abort_all();
                }
                joined = in_flight.join_next() => {
                    // Panics while scanning are already turned into error
                    // events by the worker; this only sees fetcher panics
                    if let Some(Err(e)) = joined {
                        if !e.is_cancelled() {
                            error!("crawl worker failed: {}", e);
                        }
                    }
                }
            }
        }

        cancelled
    }
}

// Everything the workers share for the duration of a run
struct Shared {
    frontier: Frontier,
    scope: ScopePolicy,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    detector: Arc<dyn Detector>,
    finding_sinks: Vec<Arc<dyn FindingSink>>,
    error_sinks: Vec<Arc<dyn ErrorSink>>,
    fetched: Mutex<Vec<String>>,
    findings: AtomicUsize,
    errors: AtomicUsize,
}

impl Shared {
    // One task from start to finish; failures are reported, never raised
    async fn visit(&self, task: CrawlTask) {
        let result = match self.fetch(&task).await {
            Ok(page) => self.process_guarded(&task, &page),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.report(task.url.as_str(), &e);
        }
    }

    async fn fetch(&self, task: &CrawlTask) -> Result<FetchedPage, CrawlError> {
        debug!(url = %task.url, depth = task.depth, "fetching");
        self.fetched.lock().push(task.url.to_string());
        self.fetcher.fetch(&task.url).await
    }

    // Like process, but a panicking detector or extractor becomes a
    // Detection error for this page instead of a lost worker
    fn process_guarded(&self, task: &CrawlTask, page: &FetchedPage) -> Result<usize, CrawlError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.process(task, page))).unwrap_or_else(|payload| {
            Err(CrawlError::Detection(format!(
                "page processing panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
    }

    // Scan the page, then schedule its in-scope links
    //
    // Returns how many new tasks were queued
    fn process(&self, task: &CrawlTask, page: &FetchedPage) -> Result<usize, CrawlError> {
        // The body is parsed here and again by the link extractor. The
        // extractor only sees the raw body so that non-HTML extractors can
        // be plugged in
        let content = PageContent::from_html(&page.body);
        let findings = self.detector.scan(&task.url, &content)?;
        for finding in &findings {
            self.emit(finding);
        }

        // Children would land beyond max_depth; skip extraction entirely
        if task.depth >= self.frontier.max_depth() {
            return Ok(0);
        }

        let mut queued = 0;
        for link in self.extractor.extract_links(&page.body, &page.url) {
            let url = match Url::parse(&link) {
                Ok(url) => url,
                Err(e) => {
                    self.report(&link, &CrawlError::malformed(link.as_str(), e));
                    continue;
                }
            };
            if !self.scope.in_scope(&url) {
                debug!(url = %url, "out of scope");
                continue;
            }
            if self.frontier.push(url, task.depth + 1) {
                queued += 1;
            }
        }

        debug!(url = %task.url, status = page.status, findings = findings.len(), queued, "page done");
        Ok(queued)
    }

    fn emit(&self, finding: &Finding) {
        self.findings.fetch_add(1, Ordering::SeqCst);
        for sink in &self.finding_sinks {
            sink.emit(finding);
        }
    }

    fn report(&self, url: &str, error: &CrawlError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let event = ErrorEvent::new(url, error);
        for sink in &self.error_sinks {
            sink.report(&event);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
