//! Worker bridge: outbound request queue plus the correlation table routing
//! worker responses back to their continuations.
//!
//! # Invariants
//! - Requests are transmitted in enqueue order within one flush.
//! - A correlation entry exists from the moment its request is transmitted
//!   until a terminal response arrives (or, for one-shot requests, it expires).
//! - Responses with unknown or absent ids are dropped without side effects.

use std::collections::HashMap;

use planar_common::{CorrelationId, InboundMessage, OutboundMessage, Request, Response};

/// Errors from the worker transport.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("physics worker disconnected")]
    Disconnected,
    #[error("failed to encode `{request}` request: {source}")]
    Encode {
        request: &'static str,
        #[source]
        source: planar_common::ProtocolError,
    },
}

/// Outbound half of the transport to the worker.
pub trait WorkerPort {
    fn post(&mut self, message: String) -> Result<(), BridgeError>;
}

impl WorkerPort for crossbeam_channel::Sender<String> {
    fn post(&mut self, message: String) -> Result<(), BridgeError> {
        self.send(message).map_err(|_| BridgeError::Disconnected)
    }
}

/// Invoked with the context and each response routed to its correlation id.
pub type Continuation<S> = Box<dyn FnMut(&mut S, &Response)>;

/// Unit of outbound work, owned by the bridge until flushed.
pub struct PendingRequest<S> {
    pub request: Request,
    pub continuation: Option<Continuation<S>>,
    /// Drop the correlation entry after the first response.
    pub one_shot: bool,
}

struct CorrelationEntry<S> {
    continuation: Continuation<S>,
    one_shot: bool,
    sent_at_ms: f64,
}

/// How an inbound response was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Continuation ran; the entry stays registered.
    Delivered,
    /// Continuation ran and the entry was removed.
    Completed,
    /// No continuation registered for this response.
    Unmatched,
}

pub struct WorkerBridge<S> {
    queue: Vec<PendingRequest<S>>,
    entries: HashMap<CorrelationId, CorrelationEntry<S>>,
    prefix: String,
    next_id: u64,
    timeout_ms: Option<f64>,
}

impl<S> WorkerBridge<S> {
    pub fn new(prefix: impl Into<String>, timeout_ms: Option<f64>) -> Self {
        Self {
            queue: Vec::new(),
            entries: HashMap::new(),
            prefix: prefix.into(),
            next_id: 0,
            timeout_ms,
        }
    }

    /// Queue a request. Nothing is sent until [`flush`](Self::flush).
    pub fn enqueue(
        &mut self,
        request: Request,
        continuation: Option<Continuation<S>>,
        one_shot: bool,
    ) {
        self.queue.push(PendingRequest {
            request,
            continuation,
            one_shot,
        });
    }

    /// Queue a request that expects no answer.
    pub fn send(&mut self, request: Request) {
        self.enqueue(request, None, false);
    }

    /// Queue a request whose continuation stays registered for every response.
    pub fn subscribe<F>(&mut self, request: Request, continuation: F)
    where
        F: FnMut(&mut S, &Response) + 'static,
    {
        self.enqueue(request, Some(Box::new(continuation)), false);
    }

    /// Queue a request whose continuation runs for the first response only.
    pub fn request_once<F>(&mut self, request: Request, continuation: F)
    where
        F: FnMut(&mut S, &Response) + 'static,
    {
        self.enqueue(request, Some(Box::new(continuation)), true);
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.entries.contains_key(id)
    }

    fn next_correlation_id(&mut self) -> CorrelationId {
        let id = CorrelationId::new(&self.prefix, self.next_id);
        self.next_id += 1;
        id
    }

    /// Transmit every queued request in enqueue order and empty the queue.
    ///
    /// Requests with a continuation get a fresh correlation id registered before
    /// transmission. If the port fails, the rest of the batch is dropped along
    /// with the entries registered for it.
    pub fn flush(&mut self, port: &mut dyn WorkerPort, now_ms: f64) -> Result<usize, BridgeError> {
        self.reap_expired(now_ms);

        let mut sent = 0;
        let batch = std::mem::take(&mut self.queue);
        for pending in batch {
            let name = pending.request.name();
            let id = match pending.continuation {
                Some(continuation) => {
                    let id = self.next_correlation_id();
                    self.entries.insert(
                        id.clone(),
                        CorrelationEntry {
                            continuation,
                            one_shot: pending.one_shot,
                            sent_at_ms: now_ms,
                        },
                    );
                    Some(id)
                }
                None => None,
            };
            let message = OutboundMessage {
                request: pending.request,
                id,
            };
            let text = match message.encode() {
                Ok(text) => text,
                Err(source) => {
                    if let Some(id) = &message.id {
                        self.entries.remove(id);
                    }
                    tracing::error!(request = name, error = %source, "dropping unencodable request");
                    continue;
                }
            };
            if let Err(err) = port.post(text) {
                if let Some(id) = &message.id {
                    self.entries.remove(id);
                }
                return Err(err);
            }
            tracing::trace!(request = name, id = ?message.id, "posted to worker");
            sent += 1;
        }
        Ok(sent)
    }

    /// Route a decoded response to its continuation.
    pub fn on_response(&mut self, message: &InboundMessage, ctx: &mut S) -> Dispatch {
        let Some(id) = &message.data.id else {
            return Dispatch::Unmatched;
        };
        let Some(mut entry) = self.entries.remove(id) else {
            return Dispatch::Unmatched;
        };
        (entry.continuation)(ctx, &message.data.response);
        if message.data.expd || entry.one_shot {
            Dispatch::Completed
        } else {
            self.entries.insert(id.clone(), entry);
            Dispatch::Delivered
        }
    }

    /// Decode and route a raw message. Undecodable messages count as unmatched.
    pub fn on_raw(&mut self, text: &str, ctx: &mut S) -> Dispatch {
        match InboundMessage::decode(text) {
            Ok(message) => self.on_response(&message, ctx),
            Err(_) => Dispatch::Unmatched,
        }
    }

    /// Drop one-shot entries that have waited longer than the timeout.
    pub fn reap_expired(&mut self, now_ms: f64) -> usize {
        let Some(timeout) = self.timeout_ms else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let expired = entry.one_shot && now_ms - entry.sent_at_ms > timeout;
            if expired {
                tracing::warn!(%id, waited_ms = now_ms - entry.sent_at_ms, "worker never answered, dropping request");
            }
            !expired
        });
        before - self.entries.len()
    }

    /// Forget queued requests and registered continuations.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planar_common::{Body, EntityId, Vec2};
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<String>,
        fail: bool,
    }

    impl WorkerPort for Recorder {
        fn post(&mut self, message: String) -> Result<(), BridgeError> {
            if self.fail {
                return Err(BridgeError::Disconnected);
            }
            self.sent.push(message);
            Ok(())
        }
    }

    impl Recorder {
        fn values(&self) -> Vec<serde_json::Value> {
            self.sent
                .iter()
                .map(|s| serde_json::from_str(s).unwrap())
                .collect()
        }
    }

    fn bridge() -> WorkerBridge<Vec<Response>> {
        WorkerBridge::new("CBI", Some(1_000.0))
    }

    fn overlap(id: &str, expd: bool) -> InboundMessage {
        InboundMessage::reply(
            Some(CorrelationId(id.into())),
            expd,
            Response::Overlap { entity: None },
        )
    }

    #[test]
    fn enqueue_does_not_send() {
        let mut b = bridge();
        b.send(Request::SetGravity { value: 1.0 });
        assert_eq!(b.queued_len(), 1);
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn set_gravity_is_sent_without_id() {
        let mut b = bridge();
        let mut port = Recorder::default();
        b.send(Request::SetGravity { value: 9.8 });
        assert_eq!(b.flush(&mut port, 0.0).unwrap(), 1);
        assert_eq!(port.values(), vec![json!({ "fn": "setGravity", "value": 9.8 })]);
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn flush_preserves_order_and_empties_queue() {
        let mut b = bridge();
        let mut port = Recorder::default();
        for i in 0..5 {
            b.send(Request::SetGravity { value: i as f64 });
        }
        b.flush(&mut port, 0.0).unwrap();
        let values: Vec<f64> = port
            .values()
            .iter()
            .map(|v| v["value"].as_f64().unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(b.queued_len(), 0);
    }

    #[test]
    fn continuations_get_unique_prefixed_ids() {
        let mut b = bridge();
        let mut port = Recorder::default();
        let probe = Body::new(EntityId::new(), Vec2::ZERO);
        b.request_once(Request::CheckCollision { probe: probe.clone() }, |_, _| {});
        b.send(Request::SetGravity { value: 1.0 });
        b.request_once(Request::CheckCollision { probe }, |_, _| {});
        b.flush(&mut port, 0.0).unwrap();
        let values = port.values();
        assert_eq!(values[0]["id"], "CBI0");
        assert!(values[1].get("id").is_none());
        assert_eq!(values[2]["id"], "CBI1");
        assert_eq!(b.pending_len(), 2);
    }

    #[test]
    fn expiring_response_runs_once_and_removes_entry() {
        let mut b = bridge();
        let mut port = Recorder::default();
        let mut seen = Vec::new();
        b.subscribe(Request::SetGravity { value: 1.0 }, |seen: &mut Vec<Response>, r| {
            seen.push(r.clone())
        });
        b.flush(&mut port, 0.0).unwrap();

        assert_eq!(b.on_response(&overlap("CBI0", true), &mut seen), Dispatch::Completed);
        assert_eq!(b.on_response(&overlap("CBI0", true), &mut seen), Dispatch::Unmatched);
        assert_eq!(seen.len(), 1);
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn persistent_entry_survives_non_expiring_responses() {
        let mut b = bridge();
        let mut port = Recorder::default();
        let mut seen = Vec::new();
        b.subscribe(Request::SetGravity { value: 1.0 }, |seen: &mut Vec<Response>, r| {
            seen.push(r.clone())
        });
        b.flush(&mut port, 0.0).unwrap();

        for _ in 0..3 {
            assert_eq!(b.on_response(&overlap("CBI0", false), &mut seen), Dispatch::Delivered);
        }
        assert_eq!(seen.len(), 3);
        assert!(b.is_pending(&CorrelationId("CBI0".into())));
    }

    #[test]
    fn one_shot_entry_is_removed_after_first_response() {
        let mut b = bridge();
        let mut port = Recorder::default();
        let mut seen = Vec::new();
        b.request_once(Request::SetGravity { value: 1.0 }, |seen: &mut Vec<Response>, r| {
            seen.push(r.clone())
        });
        b.flush(&mut port, 0.0).unwrap();
        assert_eq!(b.on_response(&overlap("CBI0", false), &mut seen), Dispatch::Completed);
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn unknown_or_missing_ids_are_ignored() {
        let mut b = bridge();
        let mut seen = Vec::new();
        assert_eq!(b.on_response(&overlap("CBI42", true), &mut seen), Dispatch::Unmatched);
        let anonymous = InboundMessage::reply(None, false, Response::Ack);
        assert_eq!(b.on_response(&anonymous, &mut seen), Dispatch::Unmatched);
        assert_eq!(b.on_raw("{not json", &mut seen), Dispatch::Unmatched);
        assert!(seen.is_empty());
    }

    #[test]
    fn raw_messages_are_decoded_and_routed() {
        let mut b = bridge();
        let mut port = Recorder::default();
        let mut seen = Vec::new();
        b.subscribe(Request::SetGravity { value: 1.0 }, |seen: &mut Vec<Response>, r| {
            seen.push(r.clone())
        });
        b.flush(&mut port, 0.0).unwrap();
        let text = r#"{"data":{"id":"CBI0","kind":"ack"}}"#;
        assert_eq!(b.on_raw(text, &mut seen), Dispatch::Delivered);
        assert_eq!(seen, vec![Response::Ack]);
    }

    #[test]
    fn stale_one_shot_entries_are_reaped() {
        let mut b = bridge();
        let mut port = Recorder::default();
        b.request_once(Request::SetGravity { value: 1.0 }, |_, _| {});
        b.subscribe(Request::SetGravity { value: 2.0 }, |_, _| {});
        b.flush(&mut port, 0.0).unwrap();
        assert_eq!(b.reap_expired(500.0), 0);
        assert_eq!(b.reap_expired(1_500.0), 1);
        // Subscriptions never expire.
        assert_eq!(b.pending_len(), 1);
    }

    #[test]
    fn no_timeout_keeps_entries_forever() {
        let mut b: WorkerBridge<()> = WorkerBridge::new("CBI", None);
        let mut port = Recorder::default();
        b.request_once(Request::SetGravity { value: 1.0 }, |_, _| {});
        b.flush(&mut port, 0.0).unwrap();
        assert_eq!(b.reap_expired(f64::MAX), 0);
        assert_eq!(b.pending_len(), 1);
    }

    #[test]
    fn failed_post_drops_batch_and_its_entries() {
        let mut b = bridge();
        let mut port = Recorder {
            fail: true,
            ..Recorder::default()
        };
        b.request_once(Request::SetGravity { value: 1.0 }, |_, _| {});
        b.send(Request::SetGravity { value: 2.0 });
        assert!(matches!(b.flush(&mut port, 0.0), Err(BridgeError::Disconnected)));
        assert_eq!(b.queued_len(), 0);
        assert_eq!(b.pending_len(), 0);
    }
}
