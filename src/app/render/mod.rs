mod scene;

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use eframe::egui::Vec2;

use crate::theme::ThemeColors;

pub use scene::{FramePlan, PaintCmd};
use scene::Scene;

/// Everything the worker needs to build its scene. Sent once as the first
/// message; a later `Init` replaces the scene wholesale.
pub struct SceneInit {
    pub radii: Vec<f32>,
    pub labels: Vec<String>,
    pub link_sources: Vec<i32>,
    pub link_targets: Vec<i32>,
    pub width: f32,
    pub height: f32,
    pub colors: ThemeColors,
}

/// Control protocol for the render thread. `Draw` transfers ownership of the
/// position snapshot; the sender keeps no alias.
pub enum RenderMessage {
    Init(Box<SceneInit>),
    Draw(Vec<f32>),
    Resize { width: f32, height: f32 },
    UpdateCamera { offset: Vec2, scale: f32 },
    UpdateInteraction { hovered_node: i32, grabbed_node: i32 },
    UpdateColors(ThemeColors),
    SetActive { node: i32 },
    Shutdown,
}

/// Handle to the render thread. Sends are fire-and-forget; completed frames
/// come back over a channel and are coalesced to the newest one.
pub struct RenderWorker {
    tx: Sender<RenderMessage>,
    frames: Receiver<FramePlan>,
    handle: Option<JoinHandle<()>>,
    latest: Option<FramePlan>,
    hovered_node: i32,
    grabbed_node: i32,
}

impl RenderWorker {
    pub fn spawn(init: SceneInit) -> Self {
        let (tx, rx) = mpsc::channel();
        let (frame_tx, frames) = mpsc::channel();

        let handle = thread::spawn(move || run_worker(rx, frame_tx));
        let worker = Self {
            tx,
            frames,
            handle: Some(handle),
            latest: None,
            hovered_node: -1,
            grabbed_node: -1,
        };
        worker.send(RenderMessage::Init(Box::new(init)));
        worker
    }

    fn send(&self, message: RenderMessage) {
        let _ = self.tx.send(message);
    }

    pub fn draw(&self, positions: Vec<f32>) {
        self.send(RenderMessage::Draw(positions));
    }

    pub fn resize(&self, width: f32, height: f32) {
        self.send(RenderMessage::Resize { width, height });
    }

    pub fn update_camera(&self, offset: Vec2, scale: f32) {
        self.send(RenderMessage::UpdateCamera { offset, scale });
    }

    /// Deduplicated: only forwards when hovered/grabbed actually changed.
    pub fn set_interaction(&mut self, hovered_node: i32, grabbed_node: i32) {
        if self.hovered_node == hovered_node && self.grabbed_node == grabbed_node {
            return;
        }
        self.hovered_node = hovered_node;
        self.grabbed_node = grabbed_node;
        self.send(RenderMessage::UpdateInteraction {
            hovered_node,
            grabbed_node,
        });
    }

    pub fn update_colors(&self, colors: ThemeColors) {
        self.send(RenderMessage::UpdateColors(colors));
    }

    pub fn set_active(&self, node: i32) {
        self.send(RenderMessage::SetActive { node });
    }

    /// Drains finished frames and returns the newest. Older frames that were
    /// superseded before the UI consumed them are simply dropped.
    pub fn latest_frame(&mut self) -> Option<&FramePlan> {
        while let Ok(frame) = self.frames.try_recv() {
            self.latest = Some(frame);
        }
        self.latest.as_ref()
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(RenderMessage::Shutdown);
            let _ = handle.join();
            tracing::debug!("render worker shut down");
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerState {
    scene: Option<Scene>,
    pending_viewport: Option<(f32, f32)>,
    pending_draw: Option<Vec<f32>>,
}

fn run_worker(rx: Receiver<RenderMessage>, frames: Sender<FramePlan>) {
    let mut state = WorkerState {
        scene: None,
        pending_viewport: None,
        pending_draw: None,
    };

    'running: loop {
        let Ok(first) = rx.recv() else {
            break;
        };
        if apply_message(&mut state, first) {
            break;
        }

        // Coalesce whatever queued up while we were busy; a newer draw
        // supersedes an unconsumed one.
        while let Ok(next) = rx.try_recv() {
            if apply_message(&mut state, next) {
                break 'running;
            }
        }

        if let (Some(scene), Some(positions)) =
            (state.scene.as_mut(), state.pending_draw.take())
        {
            if frames.send(scene.draw(positions)).is_err() {
                break;
            }
        }
    }
}

/// Returns true on shutdown. Control messages arriving before `Init` are
/// stashed (viewport) or dropped rather than crashing the loop.
fn apply_message(state: &mut WorkerState, message: RenderMessage) -> bool {
    match message {
        RenderMessage::Init(init) => {
            let mut scene = Scene::new(*init);
            if let Some((width, height)) = state.pending_viewport.take() {
                scene.resize(width, height);
            }
            state.scene = Some(scene);
        }
        RenderMessage::Draw(positions) => {
            state.pending_draw = Some(positions);
        }
        RenderMessage::Resize { width, height } => match state.scene.as_mut() {
            Some(scene) => scene.resize(width, height),
            None => state.pending_viewport = Some((width, height)),
        },
        RenderMessage::UpdateCamera { offset, scale } => {
            if let Some(scene) = state.scene.as_mut() {
                scene.set_camera(offset, scale);
            }
        }
        RenderMessage::UpdateInteraction {
            hovered_node,
            grabbed_node,
        } => {
            if let Some(scene) = state.scene.as_mut() {
                scene.set_interaction(hovered_node, grabbed_node);
            }
        }
        RenderMessage::UpdateColors(colors) => {
            if let Some(scene) = state.scene.as_mut() {
                scene.set_colors(colors);
            }
        }
        RenderMessage::SetActive { node } => {
            if let Some(scene) = state.scene.as_mut() {
                scene.set_active(node);
            }
        }
        RenderMessage::Shutdown => return true,
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn init() -> SceneInit {
        SceneInit {
            radii: vec![5.0, 5.0],
            labels: vec!["a".into(), "b".into()],
            link_sources: vec![0],
            link_targets: vec![1],
            width: 200.0,
            height: 200.0,
            colors: ThemeColors::dark(),
        }
    }

    #[test]
    fn worker_produces_frames_for_draw_messages() {
        let mut worker = RenderWorker::spawn(init());
        worker.draw(vec![-20.0, 0.0, 20.0, 0.0]);

        let mut frame_seen = false;
        for _ in 0..200 {
            if worker.latest_frame().is_some() {
                frame_seen = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(frame_seen, "no frame arrived from the render worker");

        worker.shutdown();
    }

    #[test]
    fn messages_before_init_are_stashed_or_dropped() {
        let mut state = WorkerState {
            scene: None,
            pending_viewport: None,
            pending_draw: None,
        };

        // Out-of-order control traffic must not panic.
        assert!(!apply_message(
            &mut state,
            RenderMessage::Resize {
                width: 640.0,
                height: 480.0
            }
        ));
        assert!(!apply_message(
            &mut state,
            RenderMessage::UpdateInteraction {
                hovered_node: 1,
                grabbed_node: -1
            }
        ));
        assert_eq!(state.pending_viewport, Some((640.0, 480.0)));

        assert!(!apply_message(
            &mut state,
            RenderMessage::Init(Box::new(init()))
        ));
        assert!(state.scene.is_some());
        assert!(state.pending_viewport.is_none());

        assert!(apply_message(&mut state, RenderMessage::Shutdown));
    }

    #[test]
    fn newest_draw_supersedes_the_pending_one() {
        let mut state = WorkerState {
            scene: None,
            pending_viewport: None,
            pending_draw: None,
        };
        apply_message(&mut state, RenderMessage::Draw(vec![1.0, 1.0]));
        apply_message(&mut state, RenderMessage::Draw(vec![2.0, 2.0]));

        assert_eq!(state.pending_draw.as_deref(), Some(&[2.0, 2.0][..]));
    }
}
