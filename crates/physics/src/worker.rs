use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use planar_common::{Body, CorrelationId, InboundMessage, OutboundMessage, Request, Response};

/// Channels and thread of a spawned worker.
///
/// Dropping `requests` (or every clone of it) stops the worker.
pub struct WorkerHandle {
    pub requests: Sender<String>,
    pub responses: Receiver<String>,
    pub thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Disconnect the request channel and wait for the thread to exit.
    pub fn join(self) -> thread::Result<()> {
        drop(self.requests);
        self.thread.join()
    }
}

/// Worker-side simulation state.
#[derive(Debug, Default)]
pub struct PhysicsWorker {
    bodies: Vec<Body>,
    gravity: f32,
    subscription: Option<CorrelationId>,
}

impl PhysicsWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a worker thread that integrates every `step`.
    pub fn spawn(step: Duration) -> std::io::Result<WorkerHandle> {
        let (requests, inbox) = unbounded::<String>();
        let (outbox, responses) = unbounded::<String>();
        let thread = thread::Builder::new()
            .name("planar-physics".into())
            .spawn(move || PhysicsWorker::new().run(inbox, outbox, step))?;
        Ok(WorkerHandle {
            requests,
            responses,
            thread,
        })
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    fn run(mut self, inbox: Receiver<String>, outbox: Sender<String>, step: Duration) {
        tracing::debug!(?step, "physics worker started");
        let mut last = Instant::now();
        loop {
            let wait = step.saturating_sub(last.elapsed());
            match inbox.recv_timeout(wait) {
                Ok(text) => {
                    if let Some(reply) = self.handle(&text) {
                        if !post(&outbox, &reply) {
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let elapsed = last.elapsed();
            if elapsed >= step {
                last = Instant::now();
                if let Some(reply) = self.step(elapsed.as_secs_f32()) {
                    if !post(&outbox, &reply) {
                        break;
                    }
                }
            }
        }
        tracing::debug!(bodies = self.bodies.len(), "physics worker stopped");
    }

    /// Handle one raw request, returning the immediate reply if there is one.
    pub fn handle(&mut self, text: &str) -> Option<InboundMessage> {
        let message = match OutboundMessage::decode(text) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed request");
                return None;
            }
        };
        match message.request {
            Request::SetGravity { value } => {
                self.gravity = value as f32;
                None
            }
            Request::Start { bodies, delta } => {
                self.bodies = bodies;
                for body in self.bodies.iter_mut().filter(|b| b.dynamic) {
                    body.position += delta;
                }
                self.subscription = message.id.clone();
                tracing::debug!(bodies = self.bodies.len(), "bodies registered");
                message.id.map(|id| {
                    InboundMessage::reply(
                        Some(id),
                        false,
                        Response::Bodies {
                            bodies: self.bodies.clone(),
                        },
                    )
                })
            }
            Request::CheckCollision { probe } => {
                let entity = self
                    .bodies
                    .iter()
                    .find(|b| b.entity != probe.entity && b.overlaps(&probe))
                    .map(|b| b.entity);
                message
                    .id
                    .map(|id| InboundMessage::reply(Some(id), true, Response::Overlap { entity }))
            }
        }
    }

    /// Integrate dynamic bodies over `dt` seconds and report them to the subscriber.
    pub fn step(&mut self, dt: f32) -> Option<InboundMessage> {
        for body in self.bodies.iter_mut().filter(|b| b.dynamic) {
            body.velocity.y -= self.gravity * dt;
            body.position += body.velocity * dt;
        }
        let id = self.subscription.clone()?;
        Some(InboundMessage::reply(
            Some(id),
            false,
            Response::Bodies {
                bodies: self.bodies.clone(),
            },
        ))
    }
}

/// Returns false once the engine side has hung up.
fn post(outbox: &Sender<String>, reply: &InboundMessage) -> bool {
    match reply.encode() {
        Ok(text) => outbox.send(text).is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "dropping unencodable reply");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planar_common::{Collider, EntityId, Vec2};

    fn request(request: Request, id: Option<&str>) -> String {
        OutboundMessage {
            request,
            id: id.map(|s| CorrelationId(s.into())),
        }
        .encode()
        .unwrap()
    }

    fn ball(position: Vec2) -> Body {
        Body::new(EntityId::new(), position)
            .with_collider(Collider::Circle { radius: 1.0 })
            .dynamic()
    }

    #[test]
    fn set_gravity_is_silent() {
        let mut worker = PhysicsWorker::new();
        let reply = worker.handle(&request(Request::SetGravity { value: 9.8 }, None));
        assert!(reply.is_none());
        assert!((worker.gravity() - 9.8).abs() < 1e-6);
    }

    #[test]
    fn start_replies_with_bodies_and_subscribes() {
        let mut worker = PhysicsWorker::new();
        let text = request(
            Request::Start {
                bodies: vec![ball(Vec2::ZERO)],
                delta: Vec2::new(1.0, 0.0),
            },
            Some("CBI0"),
        );
        let reply = worker.handle(&text).unwrap();
        assert_eq!(reply.data.id, Some(CorrelationId("CBI0".into())));
        assert!(!reply.data.expd);
        match reply.data.response {
            Response::Bodies { bodies } => assert_eq!(bodies[0].position, Vec2::new(1.0, 0.0)),
            other => panic!("unexpected {other:?}"),
        }
        let update = worker.step(0.1).unwrap();
        assert_eq!(update.data.id, Some(CorrelationId("CBI0".into())));
        assert!(!update.data.expd);
    }

    #[test]
    fn step_applies_gravity_to_dynamic_bodies_only() {
        let mut worker = PhysicsWorker::new();
        let wall = Body::new(EntityId::new(), Vec2::ZERO);
        worker.handle(&request(Request::SetGravity { value: 10.0 }, None));
        worker.handle(&request(
            Request::Start {
                bodies: vec![ball(Vec2::ZERO), wall],
                delta: Vec2::ZERO,
            },
            Some("CBI0"),
        ));
        worker.step(0.5);
        let bodies = worker.bodies();
        assert!((bodies[0].velocity.y + 5.0).abs() < 1e-5);
        assert!((bodies[0].position.y + 2.5).abs() < 1e-5);
        assert_eq!(bodies[1].position, Vec2::ZERO);
    }

    #[test]
    fn step_without_subscription_is_silent() {
        let mut worker = PhysicsWorker::new();
        assert!(worker.step(0.1).is_none());
    }

    #[test]
    fn collision_query_is_one_shot_and_skips_the_probe() {
        let mut worker = PhysicsWorker::new();
        let target = ball(Vec2::new(10.0, 10.0));
        let target_id = target.entity;
        let probe = Body::new(EntityId::new(), Vec2::new(10.5, 10.0)).with_collider(Collider::Box {
            half_extents: Vec2::splat(0.05),
        });
        worker.handle(&request(
            Request::Start {
                bodies: vec![probe.clone(), target],
                delta: Vec2::ZERO,
            },
            None,
        ));
        let reply = worker
            .handle(&request(Request::CheckCollision { probe }, Some("CBI7")))
            .unwrap();
        assert!(reply.data.expd);
        assert_eq!(reply.data.response, Response::Overlap { entity: Some(target_id) });
    }

    #[test]
    fn malformed_requests_are_ignored() {
        let mut worker = PhysicsWorker::new();
        assert!(worker.handle("{\"fn\":\"explode\"}").is_none());
        assert!(worker.handle("garbage").is_none());
    }

    #[test]
    fn spawned_worker_answers_over_channels() {
        let handle = PhysicsWorker::spawn(Duration::from_millis(5)).unwrap();
        handle
            .requests
            .send(request(
                Request::Start {
                    bodies: vec![ball(Vec2::ZERO)],
                    delta: Vec2::ZERO,
                },
                Some("CBI0"),
            ))
            .unwrap();
        let first = handle.responses.recv_timeout(Duration::from_secs(2)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["data"]["id"], "CBI0");
        assert_eq!(value["data"]["kind"], "bodies");
        // Periodic updates follow.
        assert!(handle.responses.recv_timeout(Duration::from_secs(2)).is_ok());
        handle.join().unwrap();
    }
}
