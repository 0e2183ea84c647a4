use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an object, shared by the scene and the physics worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and debug output.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Collision shape, centred on the owning body's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Collider {
    Box { half_extents: Vec2 },
    Circle { radius: f32 },
}

impl Collider {
    /// Half extents of the axis-aligned bounding box.
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Collider::Box { half_extents } => half_extents,
            Collider::Circle { radius } => Vec2::splat(radius),
        }
    }
}

/// Physics state of one object as exchanged with the worker.
///
/// The worker keeps its own copy; the engine's body list is only replaced
/// from worker responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub entity: EntityId,
    pub position: Vec2,
    #[serde(default)]
    pub velocity: Vec2,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default)]
    pub collider: Option<Collider>,
    /// Static bodies are never integrated.
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub selectable: bool,
}

fn default_mass() -> f32 {
    1.0
}

impl Body {
    pub fn new(entity: EntityId, position: Vec2) -> Self {
        Self {
            entity,
            position,
            velocity: Vec2::ZERO,
            mass: default_mass(),
            collider: None,
            dynamic: false,
            selectable: false,
        }
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn selectable(mut self) -> Self {
        self.selectable = true;
        self
    }

    /// Axis-aligned bounding box overlap. Bodies without a collider never overlap.
    pub fn overlaps(&self, other: &Body) -> bool {
        let (Some(a), Some(b)) = (self.collider, other.collider) else {
            return false;
        };
        let reach = a.half_extents() + b.half_extents();
        let d = (self.position - other.position).abs();
        d.x <= reach.x && d.y <= reach.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn short_id_is_eight_chars() {
        assert_eq!(EntityId::new().short().len(), 8);
    }

    #[test]
    fn boxes_overlap_when_extents_touch() {
        let a = Body::new(EntityId::new(), Vec2::ZERO).with_collider(Collider::Box {
            half_extents: Vec2::splat(1.0),
        });
        let b = Body::new(EntityId::new(), Vec2::new(1.5, 0.5))
            .with_collider(Collider::Circle { radius: 0.5 });
        let far = Body::new(EntityId::new(), Vec2::new(3.0, 0.0))
            .with_collider(Collider::Circle { radius: 0.5 });
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&far));
    }

    #[test]
    fn bodies_without_collider_never_overlap() {
        let a = Body::new(EntityId::new(), Vec2::ZERO);
        let b = Body::new(EntityId::new(), Vec2::ZERO);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn body_deserializes_with_defaults() {
        let id = EntityId::new();
        let json = serde_json::json!({ "entity": id, "position": [1.0, 2.0] });
        let body: Body = serde_json::from_value(json).unwrap();
        assert_eq!(body.mass, 1.0);
        assert_eq!(body.velocity, Vec2::ZERO);
        assert!(!body.dynamic);
    }
}
