//! Record filtering and subscriber fan-out.
//!
//! Every sensor owns one [`Dispatcher`]. A submitted record first passes the
//! active [`RecordFilter`]; if accepted it is handed to each subscriber in
//! registration order, synchronously, on the submitting thread.
//!
//! A subscriber that returns an error or panics does not stop delivery to the
//! ones after it. The failure is logged and returned in the
//! [`DispatchReport`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::SensingError;
use crate::record::{Record, SensorRecord};

/// Receives records from a sensor.
pub trait Subscriber: Send + Sync {
    /// Handle one record.
    ///
    /// # Errors
    ///
    /// Any error is reported as a delivery failure for this subscriber only.
    fn on_record(&self, record: &Record) -> anyhow::Result<()>;

    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        "subscriber"
    }
}

/// Adapts a closure into a [`Subscriber`].
pub struct FnSubscriber<F> {
    name: String,
    handler: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&Record) -> anyhow::Result<()> + Send + Sync,
{
    /// Wrap `handler` under `name`.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&Record) -> anyhow::Result<()> + Send + Sync,
{
    fn on_record(&self, record: &Record) -> anyhow::Result<()> {
        (self.handler)(record)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Per-record accept/reject decision.
pub trait RecordFilter: Send {
    /// Returns `true` to deliver `record`, `false` to drop it silently.
    fn accept(&mut self, record: &Record) -> bool;
}

impl<F> RecordFilter for F
where
    F: FnMut(&Record) -> bool + Send,
{
    fn accept(&mut self, record: &Record) -> bool {
        self(record)
    }
}

/// Accepts every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RecordFilter for AcceptAll {
    fn accept(&mut self, _record: &Record) -> bool {
        true
    }
}

/// Drops a record whose reading equals the last accepted one.
#[derive(Debug, Clone, Default)]
pub struct UnchangedFilter {
    last: Option<Record>,
}

impl RecordFilter for UnchangedFilter {
    fn accept(&mut self, record: &Record) -> bool {
        if self
            .last
            .as_ref()
            .is_some_and(|last| last.same_reading(record))
        {
            return false;
        }
        self.last = Some(record.clone());
        true
    }
}

/// Handle returned by [`Dispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Outcome of one [`Dispatcher::submit`].
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Whether the filter let the record through.
    pub accepted: bool,
    /// Subscribers that handled the record successfully.
    pub delivered: usize,
    /// One entry per subscriber that failed.
    pub failures: Vec<SensingError>,
}

impl DispatchReport {
    /// Returns `true` if the record was accepted and every subscriber succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.accepted && self.failures.is_empty()
    }
}

type Entry = (SubscriberId, Arc<dyn Subscriber>);

/// Filter plus ordered subscriber list.
pub struct Dispatcher {
    subscribers: RwLock<Vec<Entry>>,
    filter: Mutex<Box<dyn RecordFilter>>,
    next_id: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// An empty dispatcher that accepts every record.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            filter: Mutex::new(Box::new(AcceptAll)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a subscriber; it receives records after all earlier ones.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(subscriber = subscriber.name(), ?id, "subscriber added");
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Append a closure subscriber.
    pub fn subscribe_fn<F>(&self, name: impl Into<String>, handler: F) -> SubscriberId
    where
        F: Fn(&Record) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnSubscriber::new(name, handler)))
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(entry, _)| *entry != id);
        before != subscribers.len()
    }

    /// Number of current subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Replace the active filter. Applies from the next submitted record.
    pub fn set_filter(&self, filter: Box<dyn RecordFilter>) {
        *self.filter.lock() = filter;
    }

    /// Go back to accepting every record.
    pub fn reset_filter(&self) {
        self.set_filter(Box::new(AcceptAll));
    }

    /// Filter `record` and deliver it to every subscriber in order.
    pub fn submit(&self, record: &Record) -> DispatchReport {
        if !self.filter.lock().accept(record) {
            debug!(kind = %record.kind(), timestamp = record.timestamp(), "record rejected by filter");
            return DispatchReport::default();
        }

        // Snapshot so subscribers may (un)subscribe during delivery.
        let subscribers: Vec<Entry> = self.subscribers.read().clone();
        let mut report = DispatchReport {
            accepted: true,
            ..DispatchReport::default()
        };

        for (_, subscriber) in &subscribers {
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.on_record(record)));
            let message = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(err)) => format!("{err:#}"),
                Err(panic) => panic_message(panic.as_ref()),
            };
            warn!(
                kind = %record.kind(),
                subscriber = subscriber.name(),
                error = %message,
                "subscriber failed to handle record"
            );
            report.failures.push(SensingError::SubscriberDeliveryFailure {
                kind: record.kind(),
                subscriber: subscriber.name().to_string(),
                message,
            });
        }
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(|| "panicked".to_string(), |s| format!("panicked: {s}"))
}
