// crates/orion-bus/src/bus.rs
// ============================================================================
// Module: Bus
// Description: Typed pub/sub entry point over per-kind streams.
// Purpose: Implement `publish`/`subscribe`/`read` per spec.md §4.1, with
//          contract validation on publish and acknowledge-regardless-of-
//          outcome delivery semantics on subscribe.
// Dependencies: orion-core, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! [`Bus`] owns one [`crate::stream::Stream`] per [`ContractKind`] behind a
//! `tokio::sync::Mutex`. `publish` validates the message's own schema
//! (`serde`'s `deny_unknown_fields` round-trip) before appending; `subscribe`
//! runs a polling loop that reads up to `N` new messages per tick, dispatches
//! them to a handler, and always acknowledges — a failed handler is logged,
//! not redelivered, which is the amplification guard spec.md §4.1 requires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use orion_core::ContractKind;
use orion_core::contracts::Action;
use orion_core::contracts::ApprovalDecision;
use orion_core::contracts::ApprovalRequest;
use orion_core::contracts::Decision;
use orion_core::contracts::Event;
use orion_core::contracts::Incident;
use orion_core::contracts::Outcome;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::sync::Notify;

use crate::error::BusError;
use crate::stream::Entry;
use crate::stream::Stream;

/// Default approximate retention cap per stream (spec.md §6).
pub const DEFAULT_STREAM_CAP: usize = 10_000;

/// Default stream-name prefix (spec.md §6).
pub const DEFAULT_PREFIX: &str = "orion";

/// Bus-wide configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Stream-name prefix; streams are named `<prefix>:<kind>s`.
    pub prefix: String,
    /// Approximate per-stream retention cap.
    pub stream_cap: usize,
    /// Upper bound on messages read per `subscribe` poll tick.
    pub read_batch: usize,
    /// Poll interval when a read returns no new messages.
    pub poll_interval: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            stream_cap: DEFAULT_STREAM_CAP,
            read_batch: 32,
            poll_interval: Duration::from_millis(50),
        }
    }
}

struct Streams {
    event: Stream,
    incident: Stream,
    decision: Stream,
    approval_request: Stream,
    approval_decision: Stream,
    action: Stream,
    outcome: Stream,
}

impl Streams {
    fn new(cap: usize) -> Self {
        Self {
            event: Stream::new(cap),
            incident: Stream::new(cap),
            decision: Stream::new(cap),
            approval_request: Stream::new(cap),
            approval_decision: Stream::new(cap),
            action: Stream::new(cap),
            outcome: Stream::new(cap),
        }
    }

    fn get_mut(&mut self, kind: ContractKind) -> &mut Stream {
        match kind {
            ContractKind::Event => &mut self.event,
            ContractKind::Incident => &mut self.incident,
            ContractKind::Decision => &mut self.decision,
            ContractKind::ApprovalRequest => &mut self.approval_request,
            ContractKind::ApprovalDecision => &mut self.approval_decision,
            ContractKind::Action => &mut self.action,
            ContractKind::Outcome => &mut self.outcome,
        }
    }
}

/// In-process stand-in for the external stream broker assumed at spec.md §1.
///
/// # Invariants
/// - Cloning a [`Bus`] shares the same underlying streams (it wraps an
///   `Arc`); each component owns its own handle per spec.md §5.
#[derive(Clone)]
pub struct Bus {
    config: BusConfig,
    streams: Arc<Mutex<Streams>>,
    shutdown: Arc<Notify>,
}

/// A live subscription, returned so callers can drive cancellation.
pub struct Subscription {
    shutdown: Arc<Notify>,
}

impl Subscription {
    /// Requests the owning `subscribe` loop to unwind at its next await
    /// point.
    pub fn cancel(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Bus {
    /// Builds a bus with the given configuration.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        let streams = Streams::new(config.stream_cap);
        Self { config, streams: Arc::new(Mutex::new(streams)), shutdown: Arc::new(Notify::new()) }
    }

    /// Returns the stream name for a kind (`<prefix>:<kind>s`).
    #[must_use]
    pub fn stream_name(&self, kind: ContractKind) -> String {
        format!("{}:{}s", self.config.prefix, kind.as_str())
    }

    /// Publishes a contract, validating it against its own schema first.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::SchemaRejected`] if the message does not
    /// round-trip through its own contract shape. No side effect occurs on
    /// rejection.
    pub async fn publish<C>(&self, message: &C) -> Result<u64, BusError>
    where
        C: orion_core::contracts::Contract,
    {
        let value = validate_roundtrip::<C>(message, C::KIND)?;
        let mut streams = self.streams.lock().await;
        Ok(streams.get_mut(C::KIND).append(value))
    }

    /// Publishes a raw JSON payload for `kind`, validating it against that
    /// kind's registered contract shape before appending.
    ///
    /// This is the path an external, non-Rust publisher (e.g. a watcher
    /// process) would use, where the payload arrives as untyped JSON rather
    /// than a Rust value that the type system already constrained.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::SchemaRejected`] if `value` does not match the
    /// schema registered for `kind`.
    pub async fn publish_value(&self, kind: ContractKind, value: Value) -> Result<u64, BusError> {
        let validated = validate_kind(kind, value)?;
        let mut streams = self.streams.lock().await;
        Ok(streams.get_mut(kind).append(validated))
    }

    /// Reads up to `limit` entries from `kind`'s stream starting at offset
    /// `from`, ignoring consumer-group cursors. Used for tests and
    /// inspection.
    pub async fn read(&self, kind: ContractKind, from: u64, limit: usize) -> Vec<Value> {
        let streams = self.streams.lock().await;
        streams.read_from_locked(kind, from, limit)
    }

    /// Runs a subscribe loop on `kind`'s stream for `(group, consumer)`.
    ///
    /// Creates the consumer group on first call (idempotent). Loops until
    /// the returned [`Subscription`] is cancelled: each iteration blocks up
    /// to `poll_interval` waiting for new messages (or the cancellation
    /// signal, whichever comes first), reads up to `read_batch` of them,
    /// and invokes `handler` for each. The message is acknowledged (cursor
    /// advanced) regardless of whether `handler` returns an error — a
    /// failed handler is logged and not redelivered.
    pub fn subscribe<F, Fut>(
        &self,
        kind: ContractKind,
        group: impl Into<String>,
        handler: F,
    ) -> (Subscription, tokio::task::JoinHandle<()>)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BusError>> + Send,
    {
        let group = group.into();
        let shutdown = Arc::new(Notify::new());
        let subscription = Subscription { shutdown: Arc::clone(&shutdown) };
        let bus = self.clone();
        let handle = tokio::spawn(async move {
            bus.subscribe_loop(kind, group, handler, shutdown).await;
        });
        (subscription, handle)
    }

    async fn subscribe_loop<F, Fut>(
        &self,
        kind: ContractKind,
        group: String,
        handler: F,
        shutdown: Arc<Notify>,
    ) where
        F: Fn(Value) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), BusError>> + Send,
    {
        {
            let mut streams = self.streams.lock().await;
            streams.get_mut(kind).ensure_group(&group);
        }
        loop {
            let entries = {
                let mut streams = self.streams.lock().await;
                streams.get_mut(kind).read_group(&group, self.config.read_batch)
            };
            if entries.is_empty() {
                tokio::select! {
                    () = shutdown.notified() => return,
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                }
                continue;
            }
            for entry in entries {
                dispatch_one(&handler, entry, kind, &group).await;
            }
        }
    }
}

async fn dispatch_one<F, Fut>(handler: &F, entry: Entry, kind: ContractKind, group: &str)
where
    F: Fn(Value) -> Fut,
    Fut: Future<Output = Result<(), BusError>>,
{
    if let Err(err) = handler(entry.payload).await {
        tracing::error!(
            kind = kind.as_str(),
            group,
            offset = entry.offset,
            error = %err,
            "handler exception; message acknowledged, not redelivered"
        );
    }
}

impl Streams {
    fn read_from_locked(&self, kind: ContractKind, from: u64, limit: usize) -> Vec<Value> {
        let stream = match kind {
            ContractKind::Event => &self.event,
            ContractKind::Incident => &self.incident,
            ContractKind::Decision => &self.decision,
            ContractKind::ApprovalRequest => &self.approval_request,
            ContractKind::ApprovalDecision => &self.approval_decision,
            ContractKind::Action => &self.action,
            ContractKind::Outcome => &self.outcome,
        };
        stream.read_from(from, limit).into_iter().map(|entry| entry.payload).collect()
    }
}

fn validate_roundtrip<C>(message: &C, kind: ContractKind) -> Result<Value, BusError>
where
    C: serde::Serialize + DeserializeOwned,
{
    let value = serde_json::to_value(message)
        .map_err(|err| BusError::SchemaRejected { kind, reason: err.to_string() })?;
    serde_json::from_value::<C>(value.clone())
        .map_err(|err| BusError::SchemaRejected { kind, reason: err.to_string() })?;
    Ok(value)
}

fn validate_kind(kind: ContractKind, value: Value) -> Result<Value, BusError> {
    macro_rules! check {
        ($ty:ty) => {
            serde_json::from_value::<$ty>(value.clone())
                .map(|_| value)
                .map_err(|err| BusError::SchemaRejected { kind, reason: err.to_string() })
        };
    }
    match kind {
        ContractKind::Event => check!(Event),
        ContractKind::Incident => check!(Incident),
        ContractKind::Decision => check!(Decision),
        ContractKind::ApprovalRequest => check!(ApprovalRequest),
        ContractKind::ApprovalDecision => check!(ApprovalDecision),
        ContractKind::Action => check!(Action),
        ContractKind::Outcome => check!(Outcome),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use serde_json::json;
    use time::OffsetDateTime;

    use super::*;
    use orion_core::severity::EventSeverity;

    fn sample_event() -> Event {
        Event::new("watcher-a", "service_down", EventSeverity::Critical, json!({}), OffsetDateTime::now_utc())
    }

    #[tokio::test]
    async fn publish_then_read_round_trips_structurally() {
        let bus = Bus::new(BusConfig::default());
        let event = sample_event();
        bus.publish(&event).await.expect("publish");
        let read = bus.read(ContractKind::Event, 0, 10).await;
        assert_eq!(read.len(), 1);
        let round_tripped: Event = serde_json::from_value(read[0].clone()).expect("deserialize");
        assert_eq!(round_tripped, event);
    }

    #[tokio::test]
    async fn publish_value_rejects_unknown_field() {
        let bus = Bus::new(BusConfig::default());
        let mut value = serde_json::to_value(sample_event()).expect("serialize");
        value.as_object_mut().expect("object").insert("bogus".to_string(), json!(true));
        let err = bus.publish_value(ContractKind::Event, value).await.unwrap_err();
        assert!(matches!(err, BusError::SchemaRejected { .. }));
        assert!(bus.read(ContractKind::Event, 0, 10).await.is_empty());
    }

    #[tokio::test]
    async fn each_consumer_group_receives_every_message() {
        let bus = Bus::new(BusConfig::default());
        bus.publish(&sample_event()).await.expect("publish");
        bus.publish(&sample_event()).await.expect("publish");

        let counter_a = Arc::new(AtomicUsize::new(0));
        let counter_b = Arc::new(AtomicUsize::new(0));
        let (sub_a, handle_a) = {
            let counter = Arc::clone(&counter_a);
            bus.subscribe(ContractKind::Event, "group-a", move |_value| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };
        let (sub_b, handle_b) = {
            let counter = Arc::clone(&counter_b);
            bus.subscribe(ContractKind::Event, "group-b", move |_value| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        sub_a.cancel();
        sub_b.cancel();
        handle_a.abort();
        handle_b.abort();

        assert_eq!(counter_a.load(Ordering::SeqCst), 2);
        assert_eq!(counter_b.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_handler_is_acknowledged_not_redelivered() {
        let bus = Bus::new(BusConfig::default());
        bus.publish(&sample_event()).await.expect("publish");
        let calls = Arc::new(AtomicUsize::new(0));
        let (sub, handle) = {
            let calls = Arc::clone(&calls);
            bus.subscribe(ContractKind::Event, "group-a", move |_value| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(BusError::ReadFailed { kind: ContractKind::Event, reason: "boom".to_string() })
                }
            })
        };
        tokio::time::sleep(Duration::from_millis(150)).await;
        sub.cancel();
        handle.abort();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
