use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use planar_kernel::{ConsoleLevel, RenderPass, RenderStatus, RenderView};
use planar_tools::read_probe;

/// Console lines shown under the debug overlay.
const CONSOLE_LINES: usize = 5;

/// Shared handle to the most recent frame a [`DebugTextRenderer`] produced.
#[derive(Debug, Clone, Default)]
pub struct TextOutput(Rc<RefCell<String>>);

impl TextOutput {
    pub fn latest(&self) -> String {
        self.0.borrow().clone()
    }
}

/// Headless renderer producing a human-readable description of each frame.
///
/// Useful for CLI output, logging, and testing the render seam.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    output: TextOutput,
    frames: u64,
    log_every: Option<u64>,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also emit every `n`th frame at debug level.
    pub fn log_every(mut self, n: u64) -> Self {
        self.log_every = Some(n.max(1));
        self
    }

    pub fn output(&self) -> TextOutput {
        self.output.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderPass for DebugTextRenderer {
    fn render(&mut self, view: &RenderView<'_>) -> RenderStatus {
        let text = render_text(view);
        if let Some(n) = self.log_every {
            if self.frames % n == 0 {
                tracing::debug!(frame = self.frames, "\n{text}");
            }
        }
        *self.output.0.borrow_mut() = text;
        self.frames += 1;
        RenderStatus::Presented
    }
}

/// Describe one frame as text.
pub fn render_text(view: &RenderView<'_>) -> String {
    let frame = &view.frame;
    let screen_h = frame.screen_size.y;
    let zoom = frame.zoom as f32;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "=== Frame (fps={:.1}, dt={:.4}, t={:.2}s) ===",
        frame.fps, frame.delta_time, frame.total_time
    );
    let _ = writeln!(
        out,
        "Surface: {}x{} bg={} fg={}",
        frame.screen_size.x, frame.screen_size.y, view.background, view.text_color
    );
    let _ = writeln!(
        out,
        "Camera: ({:.1}, {:.1}) zoom={:.2}",
        frame.camera.position.x, frame.camera.position.y, frame.zoom
    );
    let _ = writeln!(out, "Objects: {}", frame.objects.len());

    for layer in frame.objects.layer_indices() {
        let _ = writeln!(out, " layer {layer}:");
        for object in frame.objects.layer(layer) {
            let screen = frame.camera.world_to_screen(object.position, screen_h, zoom);
            let mut marks = String::new();
            if frame.selected.contains(&object.entity) {
                marks.push('*');
            }
            if frame.over == Some(object.entity) {
                marks.push('^');
            }
            let _ = writeln!(
                out,
                "  #{} {}{} world=({:.2}, {:.2}) screen=({:.0}, {:.0})",
                object.id,
                object.name,
                marks,
                object.position.x,
                object.position.y,
                screen.x,
                screen.y
            );
        }
    }

    if view.show_debug {
        let _ = writeln!(out, "Mouse: ({:.2}, {:.2})", frame.mouse.x, frame.mouse.y);
        for probe in view.debug.probes.iter().filter(|p| p.is_visible()) {
            let reading = read_probe(frame.objects, probe);
            let _ = writeln!(out, "{}: {}", reading.name, reading.value);
        }
        let console: Vec<_> = view.debug.console.iter().collect();
        let start = console.len().saturating_sub(CONSOLE_LINES);
        for entry in &console[start..] {
            let tag = match entry.level {
                ConsoleLevel::Info => "",
                ConsoleLevel::Warn => "[warn] ",
                ConsoleLevel::Error => "[error] ",
            };
            let _ = writeln!(out, "> {tag}{}", entry.text);
        }
    }

    out
}
