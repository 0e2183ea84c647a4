//! On-screen debug instrumentation: attribute probes and the console history.

use std::collections::VecDeque;

use planar_common::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEntry {
    pub text: String,
    pub level: ConsoleLevel,
}

/// Bounded history of console lines; the oldest line is evicted first.
#[derive(Debug, Clone)]
pub struct ConsoleHistory {
    entries: VecDeque<ConsoleEntry>,
    capacity: usize,
}

impl ConsoleHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, level: ConsoleLevel) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ConsoleEntry {
            text: text.into(),
            level,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named read-out of one attribute of a scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugProbe {
    pub name: String,
    pub target: EntityId,
    /// Attribute path, e.g. `["position", "0"]`.
    pub path: Vec<String>,
    /// Frames left on screen. `None` shows the probe until removed.
    pub remaining_frames: Option<u32>,
}

impl DebugProbe {
    pub fn new<I, S>(name: impl Into<String>, target: EntityId, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            target,
            path: path.into_iter().map(Into::into).collect(),
            remaining_frames: None,
        }
    }

    pub fn for_frames(mut self, frames: u32) -> Self {
        self.remaining_frames = Some(frames);
        self
    }

    pub fn is_visible(&self) -> bool {
        self.remaining_frames != Some(0)
    }
}

/// Probes and console consumed by the render pass.
#[derive(Debug, Clone)]
pub struct DebugState {
    pub probes: Vec<DebugProbe>,
    pub console: ConsoleHistory,
}

impl DebugState {
    pub fn new(console_capacity: usize) -> Self {
        Self {
            probes: Vec::new(),
            console: ConsoleHistory::new(console_capacity),
        }
    }

    /// Count one displayed frame against every finite probe and prune expired ones.
    pub fn tick_probes(&mut self) {
        for probe in &mut self.probes {
            if let Some(frames) = probe.remaining_frames.as_mut() {
                *frames = frames.saturating_sub(1);
            }
        }
        self.probes.retain(DebugProbe::is_visible);
    }
}
