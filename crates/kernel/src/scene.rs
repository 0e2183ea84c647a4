use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use planar_common::{Body, Collider, EntityId};
use serde::Serialize;

/// Lowest layer index an object can be registered at.
pub const LAYER_MIN: i32 = -50;
/// Highest layer index an object can be registered at.
pub const LAYER_MAX: i32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("layer {0} is outside [{LAYER_MIN}, {LAYER_MAX}]")]
    LayerOutOfRange(i32),
    #[error("entity {0:?} is already registered")]
    Duplicate(EntityId),
}

/// Position of an object in the registry: its layer and per-layer sequential id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectKey {
    pub layer: i32,
    pub id: u32,
}

/// A positioned object in the scene.
///
/// Serializes to the shape user code and debug probes see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    pub entity: EntityId,
    pub name: String,
    /// Assigned on registration.
    pub layer: i32,
    /// Assigned on registration, unique within `layer`.
    pub id: u32,
    pub position: Vec2,
    pub rotation: f32,
    pub color: String,
    pub collider: Option<Collider>,
    pub velocity: Vec2,
    pub mass: f32,
    pub dynamic: bool,
    pub selectable: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            entity: EntityId::new(),
            name: name.into(),
            layer: 0,
            id: 0,
            position,
            rotation: 0.0,
            color: "black".to_string(),
            collider: None,
            velocity: Vec2::ZERO,
            mass: 1.0,
            dynamic: false,
            selectable: false,
        }
    }

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
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

    /// Whether the physics worker should track this object.
    pub fn is_physical(&self) -> bool {
        self.collider.is_some() || self.dynamic
    }

    /// Physics snapshot handed to the worker.
    pub fn to_body(&self) -> Body {
        Body {
            entity: self.entity,
            position: self.position,
            velocity: self.velocity,
            mass: self.mass,
            collider: self.collider,
            dynamic: self.dynamic,
            selectable: self.selectable,
        }
    }
}

/// Layered object registry.
///
/// Layers iterate from [`LAYER_MIN`] to [`LAYER_MAX`]; objects within a layer
/// iterate in registration order.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    layers: BTreeMap<i32, Vec<SceneObject>>,
    index: HashMap<EntityId, (i32, usize)>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` at `layer`, assigning its per-layer id.
    pub fn add(&mut self, mut object: SceneObject, layer: i32) -> Result<ObjectKey, SceneError> {
        if !(LAYER_MIN..=LAYER_MAX).contains(&layer) {
            return Err(SceneError::LayerOutOfRange(layer));
        }
        if self.index.contains_key(&object.entity) {
            return Err(SceneError::Duplicate(object.entity));
        }
        let objects = self.layers.entry(layer).or_default();
        let slot = objects.len();
        object.layer = layer;
        object.id = slot as u32 + 1;
        let key = ObjectKey {
            layer,
            id: object.id,
        };
        tracing::debug!(entity = %object.entity.short(), layer, id = object.id, "object registered");
        self.index.insert(object.entity, (layer, slot));
        objects.push(object);
        Ok(key)
    }

    pub fn get(&self, entity: EntityId) -> Option<&SceneObject> {
        let (layer, slot) = self.index.get(&entity)?;
        self.layers.get(layer)?.get(*slot)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut SceneObject> {
        let (layer, slot) = self.index.get(&entity)?;
        self.layers.get_mut(layer)?.get_mut(*slot)
    }

    pub fn by_key(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.layers.get(&key.layer)?.get(key.id.checked_sub(1)? as usize)
    }

    /// Objects at `layer`, in registration order.
    pub fn layer(&self, layer: i32) -> &[SceneObject] {
        self.layers.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every object, lowest layer first.
    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.layers.values().flatten()
    }

    /// Non-empty layer indices, lowest first.
    pub fn layer_indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.layers
            .iter()
            .filter(|(_, objects)| !objects.is_empty())
            .map(|(layer, _)| *layer)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bodies for every object the worker should track.
    pub fn bodies(&self) -> Vec<Body> {
        self.iter()
            .filter(|o| o.is_physical())
            .map(SceneObject::to_body)
            .collect()
    }

    /// Copy worker-computed state back onto registered objects.
    ///
    /// Bodies for unregistered entities are ignored. Returns how many objects were updated.
    pub fn apply_bodies(&mut self, bodies: &[Body]) -> usize {
        let mut updated = 0;
        for body in bodies {
            if let Some(object) = self.get_mut(body.entity) {
                object.position = body.position;
                object.velocity = body.velocity;
                updated += 1;
            }
        }
        updated
    }
}

/// View origin in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Camera {
    pub position: Vec2,
}

impl Camera {
    /// Convert a screen-pixel point (origin top-left, y down) to world units (y up).
    pub fn screen_to_world(&self, screen: Vec2, screen_height: f32, zoom: f32) -> Vec2 {
        Vec2::new(
            (screen.x + self.position.x) / zoom,
            (screen_height - screen.y - self.position.y) / zoom,
        )
    }

    /// Inverse of [`screen_to_world`](Self::screen_to_world).
    pub fn world_to_screen(&self, world: Vec2, screen_height: f32, zoom: f32) -> Vec2 {
        Vec2::new(
            world.x * zoom - self.position.x,
            screen_height - world.y * zoom - self.position.y,
        )
    }
}
