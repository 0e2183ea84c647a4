use std::fmt;

use glam::Vec2;
use planar_common::{EntityId, Request, Response};

use crate::bridge::Continuation;
use crate::config::{ConfigValue, Setting};
use crate::debug::{ConsoleLevel, DebugProbe};
use crate::engine::EngineState;
use crate::scene::SceneObject;

/// A deferred engine mutation recorded by user code.
pub enum Command {
    AddObject {
        object: SceneObject,
        layer: i32,
    },
    SetPosition {
        entity: EntityId,
        position: Vec2,
    },
    ApplySetting {
        setting: Setting,
        value: ConfigValue,
    },
    Send {
        request: Request,
        continuation: Option<Continuation<EngineState>>,
        one_shot: bool,
    },
    AddProbe(DebugProbe),
    WriteConsole {
        text: String,
        level: ConsoleLevel,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddObject { object, layer } => f
                .debug_struct("AddObject")
                .field("name", &object.name)
                .field("layer", layer)
                .finish(),
            Command::SetPosition { entity, position } => f
                .debug_struct("SetPosition")
                .field("entity", entity)
                .field("position", position)
                .finish(),
            Command::ApplySetting { setting, value } => f
                .debug_struct("ApplySetting")
                .field("setting", setting)
                .field("value", value)
                .finish(),
            Command::Send {
                request,
                continuation,
                one_shot,
            } => f
                .debug_struct("Send")
                .field("request", &request.name())
                .field("continuation", &continuation.is_some())
                .field("one_shot", one_shot)
                .finish(),
            Command::AddProbe(probe) => f.debug_tuple("AddProbe").field(&probe.name).finish(),
            Command::WriteConsole { text, level } => f
                .debug_struct("WriteConsole")
                .field("text", text)
                .field("level", level)
                .finish(),
        }
    }
}

/// Mutations requested by a user callback.
///
/// The frame state handed to callbacks is read-only. Everything a callback
/// wants to change goes through here and is applied, in recording order, once
/// the callback returns and before the worker queue is flushed.
#[derive(Debug, Default)]
pub struct Commands {
    ops: Vec<Command>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object. Returns the entity the object will have.
    pub fn add_object(&mut self, object: SceneObject, layer: i32) -> EntityId {
        let entity = object.entity;
        self.ops.push(Command::AddObject { object, layer });
        entity
    }

    pub fn set_position(&mut self, entity: EntityId, position: Vec2) {
        self.ops.push(Command::SetPosition { entity, position });
    }

    pub fn apply_setting(&mut self, setting: Setting, value: impl Into<ConfigValue>) {
        self.ops.push(Command::ApplySetting {
            setting,
            value: value.into(),
        });
    }

    /// Queue a worker request with no continuation.
    pub fn send(&mut self, request: Request) {
        self.ops.push(Command::Send {
            request,
            continuation: None,
            one_shot: false,
        });
    }

    /// Queue a worker request whose continuation runs on every response.
    pub fn subscribe<F>(&mut self, request: Request, continuation: F)
    where
        F: FnMut(&mut EngineState, &Response) + 'static,
    {
        self.ops.push(Command::Send {
            request,
            continuation: Some(Box::new(continuation)),
            one_shot: false,
        });
    }

    /// Queue a worker request whose continuation runs for the first response only.
    pub fn request_once<F>(&mut self, request: Request, continuation: F)
    where
        F: FnMut(&mut EngineState, &Response) + 'static,
    {
        self.ops.push(Command::Send {
            request,
            continuation: Some(Box::new(continuation)),
            one_shot: true,
        });
    }

    pub fn add_probe(&mut self, probe: DebugProbe) {
        self.ops.push(Command::AddProbe(probe));
    }

    pub fn write_console(&mut self, text: impl Into<String>, level: ConsoleLevel) {
        self.ops.push(Command::WriteConsole {
            text: text.into(),
            level,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for Commands {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_keep_recording_order() {
        let mut commands = Commands::new();
        let entity = commands.add_object(SceneObject::new("a", Vec2::ZERO), 0);
        commands.set_position(entity, Vec2::ONE);
        commands.write_console("hello", ConsoleLevel::Info);
        let kinds: Vec<_> = commands
            .into_iter()
            .map(|c| match c {
                Command::AddObject { .. } => "add",
                Command::SetPosition { .. } => "move",
                Command::WriteConsole { .. } => "console",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["add", "move", "console"]);
    }

    #[test]
    fn request_once_is_one_shot() {
        let mut commands = Commands::new();
        commands.request_once(Request::SetGravity { value: 1.0 }, |_, _| {});
        commands.send(Request::SetGravity { value: 2.0 });
        let flags: Vec<_> = commands
            .into_iter()
            .map(|c| match c {
                Command::Send {
                    continuation,
                    one_shot,
                    ..
                } => (continuation.is_some(), one_shot),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(flags, [(true, true), (false, false)]);
    }
}
