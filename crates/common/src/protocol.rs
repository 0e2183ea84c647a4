//! Wire protocol between the engine and the physics worker.
//!
//! Messages cross the boundary as JSON text. Requests look like
//! `{ "fn": <operation>, ...fields, "id"?: <correlation id> }` and responses like
//! `{ "data": { "id"?: <correlation id>, "expd"?: <bool>, "kind": <result>, ...fields } }`.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::types::{Body, EntityId};

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identifier routing a response back to the continuation that asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn new(prefix: &str, seq: u64) -> Self {
        Self(format!("{prefix}{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations the worker understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "camelCase")]
pub enum Request {
    /// Set the gravity constant used by the worker's integrator.
    SetGravity { value: f64 },
    /// Replace the worker's body list and subscribe to body updates.
    Start { bodies: Vec<Body>, delta: Vec2 },
    /// Ask which tracked body, if any, overlaps the probe.
    CheckCollision { probe: Body },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::SetGravity { .. } => "setGravity",
            Request::Start { .. } => "start",
            Request::CheckCollision { .. } => "checkCollision",
        }
    }
}

/// A request as transmitted, with its optional correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(flatten)]
    pub request: Request,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
}

impl OutboundMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Result payloads the worker sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Response {
    /// Current state of every tracked body.
    Bodies { bodies: Vec<Body> },
    /// Body overlapping a probe, if any.
    Overlap { entity: Option<EntityId> },
    Ack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    /// The sender will not answer this id again.
    #[serde(default, skip_serializing_if = "is_false")]
    pub expd: bool,
    #[serde(flatten)]
    pub response: Response,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// A response as received from the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub data: ResponseData,
}

impl InboundMessage {
    pub fn reply(id: Option<CorrelationId>, expd: bool, response: Response) -> Self {
        Self {
            data: ResponseData { id, expd, response },
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
