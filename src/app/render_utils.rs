use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke};

use super::render::{FramePlan, PaintCmd};

pub(super) fn mix_colors(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgb(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
    )
}

pub(super) fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (alpha.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Black or white, whichever reads against the given background.
pub(super) fn contrast_color(background: Color32) -> Color32 {
    let luminance = background.r() as f32 * 0.299
        + background.g() as f32 * 0.587
        + background.b() as f32 * 0.114;
    if luminance > 186.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

/// Replays a worker-built frame onto the canvas rect. The frame's
/// coordinates are canvas-local, so everything shifts by the rect origin.
pub(super) fn paint_frame(painter: &Painter, rect: Rect, plan: &FramePlan) {
    painter.rect_filled(rect, 0.0, plan.background);

    let origin = rect.min.to_vec2();
    for command in &plan.commands {
        match command {
            PaintCmd::Line {
                start,
                end,
                width,
                color,
            } => {
                painter.line_segment([*start + origin, *end + origin], Stroke::new(*width, *color));
            }
            PaintCmd::Circle {
                center,
                radius,
                fill,
            } => {
                painter.circle_filled(*center + origin, *radius, *fill);
            }
            PaintCmd::CircleOutline {
                center,
                radius,
                width,
                color,
            } => {
                painter.circle_stroke(*center + origin, *radius, Stroke::new(*width, *color));
            }
            PaintCmd::Text {
                pos,
                text,
                size,
                color,
            } => {
                painter.text(
                    *pos + origin,
                    Align2::CENTER_TOP,
                    text.as_ref(),
                    FontId::proportional(*size),
                    *color,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::pos2;

    #[test]
    fn mix_colors_interpolates_channels() {
        let mixed = mix_colors(
            Color32::from_rgb(0, 0, 0),
            Color32::from_rgb(200, 100, 50),
            0.5,
        );
        assert_eq!(mixed, Color32::from_rgb(100, 50, 25));
    }

    #[test]
    fn contrast_color_flips_on_light_backgrounds() {
        assert_eq!(contrast_color(Color32::from_rgb(20, 20, 20)), Color32::WHITE);
        assert_eq!(
            contrast_color(Color32::from_rgb(240, 240, 240)),
            Color32::BLACK
        );
    }

    #[test]
    fn edge_visibility_handles_crossing_segments() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));

        // Both endpoints outside, but the segment crosses the rect.
        assert!(edge_visible(
            rect,
            pos2(-50.0, 50.0),
            pos2(150.0, 50.0),
            0.0
        ));
        // Fully off to one side.
        assert!(!edge_visible(
            rect,
            pos2(-50.0, -10.0),
            pos2(-20.0, -40.0),
            0.0
        ));
    }

    #[test]
    fn circle_visibility_uses_the_radius() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));
        assert!(circle_visible(rect, pos2(-5.0, 50.0), 10.0));
        assert!(!circle_visible(rect, pos2(-25.0, 50.0), 10.0));
    }
}
