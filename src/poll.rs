//! One poll cycle over every active source.
//!
//! For each source, in activation order, the [`Poller`] fetches the current
//! items and walks them one at a time:
//!
//! ```text
//! fetch ─► key ─► eligible? ──no──► suppressed
//!                    │
//!                   yes
//!                    ▼
//!            store.set(today) ─► render ─► transport.publish
//! ```
//!
//! The record is written *before* publishing.  If the process dies between
//! the two, the worst case is a notification that was recorded but never
//! delivered; the reverse order could deliver the same promotion twice.
//!
//! Failures stay local:
//!
//! * a failed fetch skips that source for this cycle only,
//! * a store failure abandons the current item only,
//! * a failed publish is logged; the item stays recorded and is not retried.

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::source::GameSource;
use crate::store::NotificationStore;
use crate::transport::Transport;

/// Everything a source needs to process one cycle.
pub struct PollContext<'a> {
    pub store: &'a NotificationStore,
    pub transport: &'a dyn Transport,
    pub topic: &'a str,
    pub today: NaiveDate,
}

/// Object-safe view of a [`GameSource`], so sources with different item
/// types can sit in one list.  Implemented for every `GameSource`.
pub trait PollSource {
    fn name(&self) -> &str;

    fn poll(&self, ctx: &PollContext<'_>) -> SourceReport;
}

impl<S: GameSource> PollSource for S {
    fn name(&self) -> &str {
        GameSource::name(self)
    }

    fn poll(&self, ctx: &PollContext<'_>) -> SourceReport {
        poll_source(self, ctx)
    }
}

/// What happened to one source during a cycle.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SourceReport {
    pub source: String,
    /// The fetch failed and no items were looked at.
    pub fetch_failed: bool,
    pub fetched: usize,
    pub notified: usize,
    pub suppressed: usize,
    pub store_failures: usize,
    pub dispatch_failures: usize,
}

/// Per-source reports for one cycle, in activation order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CycleReport {
    pub sources: Vec<SourceReport>,
}

impl CycleReport {
    pub fn notified(&self) -> usize {
        self.sources.iter().map(|s| s.notified).sum()
    }

    pub fn failures(&self) -> usize {
        self.sources
            .iter()
            .map(|s| usize::from(s.fetch_failed) + s.store_failures + s.dispatch_failures)
            .sum()
    }
}

/// Drives the active sources against one store and one transport.
pub struct Poller<T> {
    sources: Vec<Box<dyn PollSource>>,
    store: NotificationStore,
    transport: T,
    topic: String,
}

impl<T: Transport> Poller<T> {
    pub fn new(
        sources: Vec<Box<dyn PollSource>>,
        store: NotificationStore,
        transport: T,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            sources,
            store,
            transport,
            topic: topic.into(),
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Poll every source once, strictly in order.
    pub fn run_cycle(&self, today: NaiveDate) -> CycleReport {
        let ctx = PollContext {
            store: &self.store,
            transport: &self.transport,
            topic: &self.topic,
            today,
        };

        CycleReport {
            sources: self.sources.iter().map(|source| source.poll(&ctx)).collect(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

enum Outcome {
    Suppressed,
    Notified,
    Undelivered(crate::error::DispatchError),
}

fn poll_source<S: GameSource>(source: &S, ctx: &PollContext<'_>) -> SourceReport {
    let name = GameSource::name(source);
    let mut report = SourceReport {
        source: name.to_string(),
        ..SourceReport::default()
    };

    let items = match source.fetch() {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(source = name, error = %e, "fetch failed, skipping source this cycle");
            report.fetch_failed = true;
            return report;
        }
    };
    report.fetched = items.len();

    for item in &items {
        let key = source.key(item);
        match announce(source, item, &key, ctx) {
            Ok(Outcome::Suppressed) => {
                tracing::debug!(source = name, key = %key, "already announced, suppressed");
                report.suppressed += 1;
            }
            Ok(Outcome::Notified) => {
                tracing::info!(source = name, key = %key, "notification sent");
                report.notified += 1;
            }
            Ok(Outcome::Undelivered(e)) => {
                tracing::warn!(
                    source = name,
                    key = %key,
                    error = %e,
                    "recorded but not delivered, will not retry"
                );
                report.dispatch_failures += 1;
            }
            Err(e) => {
                tracing::error!(source = name, key = %key, error = %e, "notification store failed, item skipped");
                report.store_failures += 1;
            }
        }
    }

    report
}

fn announce<S: GameSource>(
    source: &S,
    item: &S::Item,
    key: &str,
    ctx: &PollContext<'_>,
) -> Result<Outcome, StoreError> {
    if !source.eligible(ctx.store, key, ctx.today)? {
        return Ok(Outcome::Suppressed);
    }

    ctx.store.set(GameSource::name(source), key, ctx.today)?;

    let notification = source.render(item);
    match ctx.transport.publish(ctx.topic, &notification) {
        Ok(()) => Ok(Outcome::Notified),
        Err(e) => Ok(Outcome::Undelivered(e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
