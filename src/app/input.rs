use eframe::egui::{Pos2, PointerButton, Vec2};

use super::camera::Camera;

const CLICK_MAX_DISPLACEMENT: f32 = 4.0;
const CLICK_MAX_SECONDS: f64 = 0.3;
const SCROLL_START_VELOCITY: f32 = 0.09;
const SCROLL_GAIN: f32 = 1.4;
const SCROLL_DECAY: f32 = 0.65;
const SCROLL_EPSILON: f32 = 0.001;

/// One state instead of the pile of correlated booleans the gesture logic
/// would otherwise need; invalid combinations cannot be represented.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    Idle,
    /// Primary button down on empty space; becomes `Panning` on movement.
    Pressed { start: Pos2, start_time: f64 },
    Panning { button: PointerButton },
    /// Primary button down on a node; the node follows the pointer until
    /// release. A quick release with little movement activates the node.
    NodeGrabbed {
        node: u32,
        start: Pos2,
        start_time: f64,
    },
    Pinching {
        last_distance: f32,
        last_midpoint: Pos2,
    },
}

/// Pointer/touch/wheel tracking for the graph canvas. All positions are in
/// canvas-local screen coordinates; event times are injected seconds.
pub struct InputState {
    gesture: Gesture,
    touches: Vec<(u64, Pos2)>,
    pointer_screen: Option<Pos2>,
    last_pointer_screen: Option<Pos2>,
    scroll_velocity: f32,
    hovered_node: i32,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            gesture: Gesture::Idle,
            touches: Vec::new(),
            pointer_screen: None,
            last_pointer_screen: None,
            scroll_velocity: 0.0,
            hovered_node: -1,
        }
    }
}

impl InputState {
    /// Mirrors the kernel's hover result so the next press can grab it.
    pub fn set_hovered(&mut self, node: i32) {
        self.hovered_node = node;
    }

    pub fn grabbed_node(&self) -> i32 {
        match self.gesture {
            Gesture::NodeGrabbed { node, .. } => node as i32,
            _ => -1,
        }
    }

    pub fn pointer_world(&self, camera: &Camera) -> Option<Vec2> {
        self.pointer_screen.map(|screen| camera.to_world(screen))
    }

    /// Drops all transient gesture state, e.g. when the view is paused.
    pub fn clear(&mut self) {
        self.gesture = Gesture::Idle;
        self.touches.clear();
        self.pointer_screen = None;
        self.last_pointer_screen = None;
        self.scroll_velocity = 0.0;
    }

    pub fn on_pointer_down(&mut self, pos: Pos2, button: PointerButton, time: f64) {
        self.pointer_screen = Some(pos);
        self.last_pointer_screen = Some(pos);

        match button {
            PointerButton::Primary => {
                if self.gesture == Gesture::Idle {
                    self.gesture = if self.hovered_node >= 0 {
                        Gesture::NodeGrabbed {
                            node: self.hovered_node as u32,
                            start: pos,
                            start_time: time,
                        }
                    } else {
                        Gesture::Pressed {
                            start: pos,
                            start_time: time,
                        }
                    };
                }
            }
            PointerButton::Middle => {
                if matches!(self.gesture, Gesture::Idle | Gesture::Pressed { .. }) {
                    self.gesture = Gesture::Panning { button };
                }
            }
            _ => {}
        }
    }

    pub fn on_pointer_move(&mut self, pos: Pos2, camera: &mut Camera) {
        if self.last_pointer_screen == Some(pos) {
            return;
        }
        let delta = self
            .last_pointer_screen
            .map(|last| pos - last)
            .unwrap_or(Vec2::ZERO);
        self.pointer_screen = Some(pos);
        self.last_pointer_screen = Some(pos);

        match self.gesture {
            Gesture::Pressed { .. } => {
                self.gesture = Gesture::Panning {
                    button: PointerButton::Primary,
                };
                camera.offset += delta;
            }
            Gesture::Panning { .. } => {
                camera.offset += delta;
            }
            _ => {}
        }
    }

    /// Returns the node to activate when the press/release pair reads as a
    /// click rather than a drag.
    pub fn on_pointer_up(
        &mut self,
        pos: Pos2,
        button: PointerButton,
        time: f64,
    ) -> Option<usize> {
        self.pointer_screen = Some(pos);
        self.last_pointer_screen = Some(pos);

        match self.gesture {
            Gesture::NodeGrabbed {
                node,
                start,
                start_time,
            } if button == PointerButton::Primary => {
                self.gesture = Gesture::Idle;
                let within_displacement = (pos.x - start.x).abs() <= CLICK_MAX_DISPLACEMENT
                    && (pos.y - start.y).abs() <= CLICK_MAX_DISPLACEMENT;
                let within_time = time - start_time < CLICK_MAX_SECONDS;
                (within_displacement && within_time).then_some(node as usize)
            }
            Gesture::Pressed { .. } if button == PointerButton::Primary => {
                self.gesture = Gesture::Idle;
                None
            }
            Gesture::Panning { button: active } if active == button => {
                self.gesture = Gesture::Idle;
                None
            }
            _ => None,
        }
    }

    pub fn on_pointer_gone(&mut self) {
        if matches!(self.gesture, Gesture::Idle) {
            self.pointer_screen = None;
            self.last_pointer_screen = None;
        }
    }

    pub fn on_touch_start(&mut self, id: u64, pos: Pos2, time: f64) {
        if let Some(entry) = self.touches.iter_mut().find(|(touch, _)| *touch == id) {
            entry.1 = pos;
        } else {
            self.touches.push((id, pos));
        }

        match self.touches.len() {
            1 => self.on_pointer_down(pos, PointerButton::Primary, time),
            2 => self.begin_pinch(),
            _ => {}
        }
    }

    /// The first pinch frame only records the starting distance/midpoint, so
    /// the camera cannot jump; any grab or hover is dropped.
    fn begin_pinch(&mut self) {
        let (first, second) = (self.touches[0].1, self.touches[1].1);
        self.gesture = Gesture::Pinching {
            last_distance: (first - second).length().max(0.0001),
            last_midpoint: first + (second - first) * 0.5,
        };
        self.hovered_node = -1;
        self.pointer_screen = None;
        self.last_pointer_screen = None;
    }

    pub fn on_touch_move(&mut self, id: u64, pos: Pos2, camera: &mut Camera) {
        if let Some(entry) = self.touches.iter_mut().find(|(touch, _)| *touch == id) {
            entry.1 = pos;
        }

        if let Gesture::Pinching {
            last_distance,
            last_midpoint,
        } = &mut self.gesture
        {
            if self.touches.len() < 2 {
                return;
            }
            let (first, second) = (self.touches[0].1, self.touches[1].1);
            let distance = (first - second).length().max(0.0001);
            let midpoint = first + (second - first) * 0.5;

            let scale_delta = (distance - *last_distance) / *last_distance;
            let pan = midpoint - *last_midpoint;
            *last_distance = distance;
            *last_midpoint = midpoint;

            if scale_delta != 0.0 {
                camera.scale_around(camera.to_world(midpoint), 1.0 + scale_delta);
            }
            if pan != Vec2::ZERO {
                camera.offset += pan;
            }
        } else if self.touches.len() == 1 {
            self.on_pointer_move(pos, camera);
        }
    }

    pub fn on_touch_end(&mut self, id: u64, time: f64) -> Option<usize> {
        let ended_at = self
            .touches
            .iter()
            .find(|(touch, _)| *touch == id)
            .map(|(_, pos)| *pos);
        self.touches.retain(|(touch, _)| *touch != id);

        match self.touches.len() {
            0 => {
                if matches!(self.gesture, Gesture::Pinching { .. }) {
                    self.gesture = Gesture::Idle;
                    return None;
                }
                ended_at.and_then(|pos| self.on_pointer_up(pos, PointerButton::Primary, time))
            }
            1 => {
                if matches!(self.gesture, Gesture::Pinching { .. }) {
                    self.gesture = Gesture::Idle;
                    let remaining = self.touches[0].1;
                    self.pointer_screen = Some(remaining);
                    self.last_pointer_screen = Some(remaining);
                }
                None
            }
            _ => None,
        }
    }

    /// Wheel events feed a velocity; zooming happens over the following
    /// frames in `apply_scroll_zoom`. Positive delta (scroll up) zooms in.
    pub fn on_wheel(&mut self, scroll_delta: f32) {
        if scroll_delta > 0.0 {
            if self.scroll_velocity <= SCROLL_START_VELOCITY {
                self.scroll_velocity = SCROLL_START_VELOCITY;
            }
            self.scroll_velocity *= SCROLL_GAIN;
        } else if scroll_delta < 0.0 {
            if self.scroll_velocity >= -SCROLL_START_VELOCITY {
                self.scroll_velocity = -SCROLL_START_VELOCITY;
            }
            self.scroll_velocity *= SCROLL_GAIN;
        }
    }

    /// Per-frame zoom toward the cursor while the accumulated velocity is
    /// nonzero; geometric decay, snapped to zero below a small epsilon.
    pub fn apply_scroll_zoom(&mut self, camera: &mut Camera) {
        if self.scroll_velocity == 0.0 {
            return;
        }
        if self.scroll_velocity.abs() < SCROLL_EPSILON {
            self.scroll_velocity = 0.0;
            return;
        }

        let target = self
            .pointer_world(camera)
            .unwrap_or_else(|| camera.center_worldspace());
        camera.zoom_around(target, self.scroll_velocity);
        self.scroll_velocity *= SCROLL_DECAY;
    }
}
