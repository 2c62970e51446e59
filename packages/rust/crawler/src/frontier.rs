//! Crawl frontier: the to-visit queue plus crash-recoverable visit state.
//!
//! Only the coordinator loop mutates a [`Frontier`]; workers get owned
//! [`CrawlTarget`]s and report back through [`Frontier::record_result`].
//!
//! Per-target lifecycle:
//!
//! ```text
//! Discovered -> Enqueued -> Fetching -> Succeeded
//!                              |     -> Failed
//!                              '---> Retrying(n) -> Fetching
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use tracing::{debug, info, warn};

use campuscorpus_shared::{
    CheckpointSnapshot, CrawlConfig, CrawlTarget, Fingerprint, FrontierState, Result, RunId,
};
use campuscorpus_storage::CheckpointStore;

/// Result of one fetch attempt, as classified by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Succeeded,
    /// Timeout, connect error, 5xx, 408, or 429.
    Transient(String),
    /// Anything not worth retrying (4xx, unsupported content).
    Permanent(String),
}

/// What the frontier did with a reported outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Visited,
    /// Re-queued; `attempt` is the number of the upcoming retry.
    Retry { attempt: u32 },
    Failed,
}

/// The crawl frontier.
#[derive(Debug)]
pub struct Frontier {
    state: FrontierState,
    run_id: RunId,
    queue: VecDeque<CrawlTarget>,
    retry_queue: VecDeque<CrawlTarget>,
    /// Fingerprints that are queued, waiting for retry, or being fetched.
    scheduled: HashSet<Fingerprint>,
    in_flight: HashMap<Fingerprint, CrawlTarget>,
    max_retries: u32,
    checkpoint_interval: usize,
    /// `pages_processed` at the last successful checkpoint.
    saved_at_pages: usize,
    restored_pages: usize,
}

impl Frontier {
    pub fn new(max_retries: u32, checkpoint_interval: usize) -> Self {
        Self {
            state: FrontierState::default(),
            run_id: RunId::new(),
            queue: VecDeque::new(),
            retry_queue: VecDeque::new(),
            scheduled: HashSet::new(),
            in_flight: HashMap::new(),
            max_retries,
            checkpoint_interval: checkpoint_interval.max(1),
            saved_at_pages: 0,
            restored_pages: 0,
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(config.max_retries, config.checkpoint_interval)
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Queue `target` unless it was visited, failed, or is already scheduled.
    pub fn enqueue_if_new(&mut self, target: CrawlTarget) -> bool {
        let fp = target.fingerprint();
        if self.state.visited.contains(&fp)
            || self.state.failed.contains(&fp)
            || self.scheduled.contains(&fp)
        {
            return false;
        }
        self.scheduled.insert(fp);
        self.queue.push_back(target);
        true
    }

    /// Dequeue up to `max` targets (retries first, then FIFO) and mark them
    /// as in flight.
    pub fn next_batch(&mut self, max: usize) -> Vec<CrawlTarget> {
        let mut batch = Vec::with_capacity(max.min(self.queued_len()));
        while batch.len() < max {
            let Some(target) = self
                .retry_queue
                .pop_front()
                .or_else(|| self.queue.pop_front())
            else {
                break;
            };
            self.in_flight.insert(target.fingerprint(), target.clone());
            batch.push(target);
        }
        batch
    }

    /// Apply a fetch outcome to the visit state.
    pub fn record_result(&mut self, target: &CrawlTarget, outcome: &FetchOutcome) -> Disposition {
        let fp = target.fingerprint();
        self.in_flight.remove(&fp);

        match outcome {
            FetchOutcome::Succeeded => {
                self.scheduled.remove(&fp);
                self.state.visited.insert(fp);
                self.state.pages_processed += 1;
                Disposition::Visited
            }
            FetchOutcome::Transient(reason) if target.attempt < self.max_retries => {
                let mut retry = target.clone();
                retry.attempt += 1;
                debug!(url = %target.url, attempt = retry.attempt, %reason, "scheduling retry");
                let attempt = retry.attempt;
                self.retry_queue.push_back(retry);
                Disposition::Retry { attempt }
            }
            FetchOutcome::Transient(reason) | FetchOutcome::Permanent(reason) => {
                debug!(url = %target.url, %reason, "target failed");
                self.scheduled.remove(&fp);
                self.state.failed.insert(fp);
                Disposition::Failed
            }
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Whether `interval` pages passed since the last good checkpoint.
    pub fn checkpoint_due(&self) -> bool {
        self.state.pages_processed >= self.saved_at_pages + self.checkpoint_interval
    }

    /// Record how far the web entry file reaches for the next checkpoint.
    pub fn record_entries_offset(&mut self, offset: u64) {
        self.state.entries_offset = Some(offset);
    }

    /// Entry file length saved with the restored checkpoint, if any.
    pub fn entries_offset(&self) -> Option<u64> {
        self.state.entries_offset
    }

    /// Persist the state when `interval` pages passed since the last good
    /// checkpoint, or when `force` is set.
    ///
    /// Returns whether a checkpoint was written. Write failures are logged
    /// and retried on the next call.
    pub async fn checkpoint(&mut self, store: &CheckpointStore, force: bool) -> bool {
        if !force && !self.checkpoint_due() {
            return false;
        }

        let mut state = self.snapshot();
        state.last_checkpoint = Some(Utc::now());

        match store.save(&CheckpointSnapshot::new(&self.run_id, &state)).await {
            Ok(()) => {
                self.state.last_checkpoint = state.last_checkpoint;
                self.saved_at_pages = self.state.pages_processed;
                debug!(pages = self.state.pages_processed, pending = state.pending.len(), "checkpoint written");
                true
            }
            Err(e) => {
                warn!(path = %store.path().display(), error = %e, "checkpoint failed, will retry");
                false
            }
        }
    }

    /// Load a previous checkpoint, if any.
    ///
    /// Returns whether state was restored. A rejected checkpoint (corrupt,
    /// or written by a newer schema) is returned as an error and leaves the
    /// frontier empty.
    pub async fn restore(&mut self, store: &CheckpointStore) -> Result<bool> {
        let Some(snapshot) = store.load().await? else {
            return Ok(false);
        };
        if let Some(run_id) = snapshot.run_id {
            self.run_id = run_id;
        }
        self.restore_state(snapshot.state);
        info!(
            pages = self.state.pages_processed,
            visited = self.state.visited.len(),
            failed = self.state.failed.len(),
            pending = self.queue.len(),
            "restored crawl checkpoint"
        );
        Ok(true)
    }

    /// Replace the visit state and re-queue its pending URLs.
    pub fn restore_state(&mut self, mut state: FrontierState) {
        let pending = std::mem::take(&mut state.pending);
        self.restored_pages = state.pages_processed;
        self.saved_at_pages = state.pages_processed;
        self.state = state;
        self.queue.clear();
        self.retry_queue.clear();
        self.scheduled.clear();
        self.in_flight.clear();

        for raw in pending {
            match CrawlTarget::parse(&raw) {
                Some(target) => {
                    self.enqueue_if_new(target);
                }
                None => warn!(url = %raw, "dropping unparseable pending url"),
            }
        }
    }

    /// Current state, with everything queued or in flight listed as pending.
    pub fn snapshot(&self) -> FrontierState {
        let mut in_flight: Vec<&CrawlTarget> = self.in_flight.values().collect();
        in_flight.sort_by(|a, b| a.normalized_form.cmp(&b.normalized_form));

        let pending = self
            .retry_queue
            .iter()
            .chain(in_flight)
            .chain(self.queue.iter())
            .map(|t| t.url.to_string())
            .collect();

        FrontierState {
            pending,
            ..self.state.clone()
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Cumulative successful pages, restored ones included.
    pub fn pages_processed(&self) -> usize {
        self.state.pages_processed
    }

    /// Pages that were already processed when the checkpoint was restored.
    pub fn restored_pages(&self) -> usize {
        self.restored_pages
    }

    pub fn visited_count(&self) -> usize {
        self.state.visited.len()
    }

    pub fn failed_count(&self) -> usize {
        self.state.failed.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Targets waiting to be dispatched (fresh and retry).
    pub fn queued_len(&self) -> usize {
        self.queue.len() + self.retry_queue.len()
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }
}
