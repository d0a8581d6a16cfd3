use eframe::egui::{Pos2, Rect, Vec2, pos2, vec2};

pub const MIN_SCALE: f32 = 0.15;
pub const MAX_SCALE: f32 = 15.0;

/// Screen/world transform for the graph canvas. Screen coordinates are local
/// to the canvas rect; `screen = world * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub offset: Vec2,
    pub scale: f32,
    width: f32,
    height: f32,
}

impl Camera {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            offset: vec2(width * 0.5, height * 0.5),
            scale: 1.0,
            width,
            height,
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    pub fn to_screen(&self, world: Vec2) -> Pos2 {
        pos2(
            world.x * self.scale + self.offset.x,
            world.y * self.scale + self.offset.y,
        )
    }

    pub fn to_world(&self, screen: Pos2) -> Vec2 {
        vec2(
            (screen.x - self.offset.x) / self.scale,
            (screen.y - self.offset.y) / self.scale,
        )
    }

    /// Moves the camera so the world origin maps to the viewport center.
    pub fn center(&mut self) {
        self.offset = vec2(self.width * 0.5, self.height * 0.5);
    }

    pub fn center_worldspace(&self) -> Vec2 {
        self.to_world(pos2(self.width * 0.5, self.height * 0.5))
    }

    pub fn set_center_worldspace(&mut self, point: Vec2) {
        self.offset = vec2(
            self.width * 0.5 - point.x * self.scale,
            self.height * 0.5 - point.y * self.scale,
        );
    }

    /// Picks the scale that makes `rect` exactly fill the viewport and
    /// centers it.
    pub fn fit_to_rect(&mut self, rect: Rect) {
        let rect_width = rect.width().max(0.001);
        let rect_height = rect.height().max(0.001);

        self.scale = 1.0 / (rect_width / self.width).min(rect_height / self.height);
        self.offset = vec2(
            self.width * 0.5 - (rect.min.x + rect_width * 0.5) * self.scale,
            self.height * 0.5 - (rect.min.y + rect_height * 0.5) * self.scale,
        );
    }

    /// Additive zoom step toward a world point, used by wheel scrolling.
    /// `zoom` is the signed velocity; the view center drifts toward the
    /// point proportionally so the cursor location stays roughly fixed.
    pub fn zoom_around(&mut self, point: Vec2, zoom: f32) {
        let center = self.center_worldspace();
        let before = self.scale;
        self.scale = (self.scale + zoom * self.scale).clamp(MIN_SCALE, MAX_SCALE);

        if self.scale != before {
            let around_diff = point - center;
            self.set_center_worldspace(center + around_diff * zoom);
        } else {
            self.set_center_worldspace(center);
        }
    }

    /// Multiplicative zoom around a world point, used by pinch gestures. The
    /// pivot keeps its screen position exactly.
    pub fn scale_around(&mut self, point: Vec2, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        let anchor = self.to_screen(point);
        self.scale = (factor * self.scale).clamp(MIN_SCALE, MAX_SCALE);
        self.offset = vec2(
            anchor.x - point.x * self.scale,
            anchor.y - point.y * self.scale,
        );
    }
}
