use std::fmt;
use std::time::Duration;

use planar_common::EntityId;
use planar_kernel::{Engine, Phase};

/// Engine inspector for developer tooling.
///
/// Read-only queries against a running or stopped engine.
pub struct EngineInspector;

impl EngineInspector {
    /// Snapshot the engine's timing and bridge counters.
    pub fn summary(engine: &Engine) -> EngineSummary {
        let clock = engine.clock();
        let costs = engine.frame_costs();
        EngineSummary {
            phase: engine.phase(),
            fps: clock.fps(),
            average_fps: clock.average_fps(),
            frames: engine.frames(),
            loss_count: clock.loss_count(),
            elapsed_ms: clock.elapsed_ms(),
            behind_time: clock.behind_time(),
            pending_requests: engine.pending_requests(),
            bodies: engine.state().bodies().len(),
            objects: engine.state().scene().len(),
            frame_cost_avg: costs.mean(),
            frame_cost_max: costs.worst(),
            frame_budget: costs.budget(),
            over_budget: costs.over_budget(),
        }
    }

    pub fn inspect_object(engine: &Engine, entity: EntityId) -> Option<ObjectInfo> {
        engine.state().scene().get(entity).map(|o| ObjectInfo {
            entity,
            name: o.name.clone(),
            layer: o.layer,
            id: o.id,
            position: [o.position.x, o.position.y],
            velocity: [o.velocity.x, o.velocity.y],
        })
    }
}

#[derive(Debug, Clone)]
pub struct EngineSummary {
    pub phase: Phase,
    pub fps: f64,
    pub average_fps: f64,
    pub frames: u64,
    pub loss_count: u64,
    pub elapsed_ms: f64,
    pub behind_time: f64,
    pub pending_requests: usize,
    pub bodies: usize,
    pub objects: usize,
    pub frame_cost_avg: Duration,
    pub frame_cost_max: Duration,
    pub frame_budget: Duration,
    pub over_budget: u64,
}

impl EngineSummary {
    pub fn is_running(&self) -> bool {
        self.phase != Phase::Stopped
    }
}

impl fmt::Display for EngineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FPS: {:.1} (avg {:.1})", self.fps, self.average_fps)?;
        writeln!(
            f,
            "Status: {}",
            if self.is_running() { "running" } else { "stopped" }
        )?;
        writeln!(f, "Frames: {} lost: {}", self.frames, self.loss_count)?;
        writeln!(f, "Time: {}", format_millis(self.elapsed_ms))?;
        writeln!(f, "Behind: {:.3}s", self.behind_time)?;
        writeln!(
            f,
            "Frame cost: avg {:.2}ms max {:.2}ms budget {:.2}ms over: {}",
            self.frame_cost_avg.as_secs_f64() * 1000.0,
            self.frame_cost_max.as_secs_f64() * 1000.0,
            self.frame_budget.as_secs_f64() * 1000.0,
            self.over_budget
        )?;
        write!(
            f,
            "Objects: {} bodies: {} pending requests: {}",
            self.objects, self.bodies, self.pending_requests
        )
    }
}

/// Detailed info about a single scene object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub entity: EntityId,
    pub name: String,
    pub layer: i32,
    pub id: u32,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
}

impl fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Object [{}] {} layer={} id={} pos=({:.2}, {:.2}) vel=({:.2}, {:.2})",
            self.entity.short(),
            self.name,
            self.layer,
            self.id,
            self.position[0],
            self.position[1],
            self.velocity[0],
            self.velocity[1],
        )
    }
}

/// Format milliseconds as `HH:MM:SS.mmm`. Negative input formats as zero.
pub fn format_millis(ms: f64) -> String {
    let total = ms.max(0.0).floor() as u64;
    let millis = total % 1000;
    let secs = total / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        millis
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use planar_common::Vec2;
    use planar_kernel::{EngineConfig, SceneObject};

    #[test]
    fn formats_millis() {
        assert_eq!(format_millis(0.0), "00:00:00.000");
        assert_eq!(format_millis(1_234.9), "00:00:01.234");
        assert_eq!(format_millis(3_723_004.0), "01:02:03.004");
        assert_eq!(format_millis(-5.0), "00:00:00.000");
    }

    #[test]
    fn summary_of_fresh_engine() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let summary = EngineInspector::summary(&engine);
        assert!(!summary.is_running());
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.loss_count, 0);
        let text = summary.to_string();
        assert!(text.contains("Status: stopped"));
        assert!(text.contains("Time: 00:00:00.000"));
        assert!(text.contains("budget 16.67ms over: 0"));
    }

    #[test]
    fn inspect_object_found_and_missing() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let object = SceneObject::new("crate", Vec2::new(1.0, 2.0));
        let entity = object.entity;
        engine.add_object(object, 3).unwrap();
        let info = EngineInspector::inspect_object(&engine, entity).unwrap();
        assert_eq!(info.layer, 3);
        assert_eq!(info.id, 1);
        assert!(info.to_string().contains("pos=(1.00, 2.00)"));
        assert!(EngineInspector::inspect_object(&engine, EntityId::new()).is_none());
    }
}
