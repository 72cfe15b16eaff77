//! Bounded-concurrency batch execution
//!
//! [`run_batch`] pushes every descriptor through [`Session::execute`] with at most
//! `min(len, max_concurrency)` calls in flight. Calls complete in whatever order the
//! network dictates; progress is reported in completion order, while the returned
//! records line up with the input descriptors.
//!
//! A batch cannot be cancelled once started. Per-call timeouts belong on the
//! descriptors (`timeout` option) or the session config.

use crate::descriptor::{RawRequest, RequestDescriptor, normalize};
use crate::error::Result;
use crate::session::{ResponseRecord, Session};
use futures::stream::{self, StreamExt};
use reqwest::Method;
use std::sync::Arc;

/// Receives batch progress as calls finish
pub trait ProgressSink: Send + Sync {
    /// Called after each completed call
    fn on_progress(&self, completed: usize, total: usize);

    /// Called once when the whole batch is done
    fn on_finish(&self, _total: usize) {}
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Discards progress
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Reports progress through `tracing`
#[derive(Clone, Debug)]
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    /// Progress reporter tagged with `label`
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new("batch")
    }
}

impl ProgressSink for LogProgress {
    fn on_progress(&self, completed: usize, total: usize) {
        tracing::debug!(label = %self.label, completed, total, "batch progress");
    }

    fn on_finish(&self, total: usize) {
        tracing::info!(label = %self.label, total, "batch complete");
    }
}

/// Per-batch overrides of the session settings
#[derive(Clone, Default)]
pub struct BatchOptions {
    /// Concurrency cap for this batch (None = session's `max_concurrency`)
    pub max_concurrency: Option<usize>,
    /// Suppress progress for this batch (None = session's `disable_progress`)
    pub disable_progress: Option<bool>,
    /// Where progress goes (None = [`LogProgress`])
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOptions")
            .field("max_concurrency", &self.max_concurrency)
            .field("disable_progress", &self.disable_progress)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BatchOptions {
    /// Options that report progress to `sink`
    pub fn with_progress(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            progress: Some(sink),
            ..Self::default()
        }
    }

    /// Options with progress turned off
    pub fn silent() -> Self {
        Self {
            disable_progress: Some(true),
            ..Self::default()
        }
    }
}

/// Effective worker count for a batch of `len` calls
pub(crate) fn concurrency_for(len: usize, configured: usize, override_cap: Option<usize>) -> usize {
    len.min(override_cap.unwrap_or(configured)).max(1)
}

/// Execute `descriptors` with bounded concurrency, returning records in input order
///
/// Fails only when the session raises transport errors; otherwise every descriptor
/// yields a record (possibly a sentinel transport failure).
pub async fn run_batch<S>(
    session: &S,
    method: Method,
    descriptors: Vec<RequestDescriptor>,
    options: &BatchOptions,
) -> Result<Vec<ResponseRecord>>
where
    S: Session + ?Sized,
{
    let total = descriptors.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let config = session.config();
    let concurrency = concurrency_for(total, config.max_concurrency, options.max_concurrency);
    let silent = options.disable_progress.unwrap_or(config.disable_progress);
    let progress: Arc<dyn ProgressSink> = if silent {
        Arc::new(SilentProgress)
    } else {
        options
            .progress
            .clone()
            .unwrap_or_else(|| Arc::new(LogProgress::default()))
    };

    tracing::debug!(%method, total, concurrency, "starting batch");

    let mut in_flight = stream::iter(descriptors.into_iter().enumerate())
        .map(|(index, descriptor)| {
            let method = method.clone();
            async move { (index, session.execute(method, &descriptor).await) }
        })
        .buffer_unordered(concurrency);

    let mut slots: Vec<Option<ResponseRecord>> = vec![None; total];
    let mut completed = 0;
    while let Some((index, result)) = in_flight.next().await {
        slots[index] = Some(result?);
        completed += 1;
        progress.on_progress(completed, total);
    }
    progress.on_finish(total);

    Ok(slots.into_iter().flatten().collect())
}

/// Normalize heterogeneous calls and run them as one batch
pub async fn bulk<S, I, R>(
    session: &S,
    method: Method,
    requests: I,
    options: &BatchOptions,
) -> Result<Vec<ResponseRecord>>
where
    S: Session + ?Sized,
    I: IntoIterator<Item = R>,
    R: Into<RawRequest>,
{
    let descriptors = normalize(requests)?;
    run_batch(session, method, descriptors, options).await
}
