use std::sync::Arc;

use eframe::egui::{Color32, Pos2, Rect, Vec2, pos2, vec2};

use crate::theme::ThemeColors;
use crate::util::lerp;

use super::super::render_utils::{
    circle_visible, contrast_color, edge_visible, mix_colors, with_alpha,
};
use super::SceneInit;

const HOVER_FADE_SPEED: f32 = 0.04;
const HOVER_FADE_SECONDARY_SPEED: f32 = 0.08;
const NORMAL_FONT_SIZE: f32 = 12.0;
const HOVER_FONT_SIZE: f32 = 15.0;
const LABEL_OFFSET: f32 = 9.0;
const MIN_EDGE_SCREEN_LENGTH: f32 = 1.5;

/// Ready-to-paint frame: a background fill plus draw commands in paint
/// order. Positions are canvas-local pixels.
pub struct FramePlan {
    pub background: Color32,
    pub commands: Vec<PaintCmd>,
}

pub enum PaintCmd {
    Line {
        start: Pos2,
        end: Pos2,
        width: f32,
        color: Color32,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
    },
    CircleOutline {
        center: Pos2,
        radius: f32,
        width: f32,
        color: Color32,
    },
    Text {
        pos: Pos2,
        text: Arc<str>,
        size: f32,
        color: Color32,
    },
}

/// Worker-side scene state. Owns the drawing inputs (topology, radii,
/// labels, camera mirror, interaction highlights) and turns each position
/// snapshot into a `FramePlan`. Never touches simulation state.
pub(super) struct Scene {
    radii: Vec<f32>,
    labels: Vec<Arc<str>>,
    edges: Vec<(usize, usize)>,
    positions: Vec<f32>,
    width: f32,
    height: f32,
    camera_offset: Vec2,
    camera_scale: f32,
    camera_scale_root: f32,
    colors: ThemeColors,
    hovered_node: i32,
    last_hovered_node: i32,
    grabbed_node: i32,
    active_node: i32,
    update_attached: bool,
    attached_to_hovered: Vec<usize>,
    hover_fade: f32,
    hover_fade_secondary: f32,
    label_fade: Vec<f32>,
}

impl Scene {
    pub(super) fn new(init: SceneInit) -> Self {
        let node_count = init.radii.len();
        let edges = init
            .link_sources
            .iter()
            .zip(&init.link_targets)
            .map(|(&source, &target)| (source, target))
            .filter(|&(source, target)| {
                source >= 0
                    && target >= 0
                    && (source as usize) < node_count
                    && (target as usize) < node_count
            })
            .map(|(source, target)| (source as usize, target as usize))
            .collect();

        Self {
            radii: init.radii,
            labels: init.labels.into_iter().map(Arc::from).collect(),
            edges,
            positions: Vec::new(),
            width: init.width,
            height: init.height,
            camera_offset: vec2(init.width * 0.5, init.height * 0.5),
            camera_scale: 1.0,
            camera_scale_root: 1.0,
            colors: init.colors,
            hovered_node: -1,
            last_hovered_node: -1,
            grabbed_node: -1,
            active_node: -1,
            update_attached: false,
            attached_to_hovered: Vec::new(),
            hover_fade: 0.0,
            hover_fade_secondary: 0.0,
            label_fade: vec![0.0; node_count],
        }
    }

    pub(super) fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    pub(super) fn set_camera(&mut self, offset: Vec2, scale: f32) {
        self.camera_offset = offset;
        self.camera_scale = scale;
        self.camera_scale_root = scale.max(0.0001).sqrt();
    }

    pub(super) fn set_interaction(&mut self, hovered_node: i32, grabbed_node: i32) {
        // Stale ids from before a re-init are treated as "none".
        let node_count = self.node_count() as i32;
        let hovered_node = if hovered_node < node_count { hovered_node } else { -1 };
        let grabbed_node = if grabbed_node < node_count { grabbed_node } else { -1 };

        if self.hovered_node != hovered_node && hovered_node != -1 {
            self.update_attached = true;
        }
        if self.grabbed_node != grabbed_node && hovered_node != -1 {
            self.update_attached = true;
        }

        self.last_hovered_node = if hovered_node == -1 {
            self.hovered_node
        } else {
            -1
        };
        self.hovered_node = hovered_node;
        self.grabbed_node = grabbed_node;
    }

    pub(super) fn set_active(&mut self, node: i32) {
        self.active_node = node;
    }

    pub(super) fn set_colors(&mut self, colors: ThemeColors) {
        self.colors = colors;
    }

    fn node_count(&self) -> usize {
        self.radii.len()
    }

    fn position_of(&self, index: usize) -> Vec2 {
        vec2(self.positions[index * 2], self.positions[index * 2 + 1])
    }

    fn to_screen(&self, world: Vec2) -> Pos2 {
        pos2(
            (world.x * self.camera_scale + self.camera_offset.x).floor(),
            (world.y * self.camera_scale + self.camera_offset.y).floor(),
        )
    }

    fn screen_radius(&self, index: usize) -> f32 {
        self.radii[index] * self.camera_scale_root
    }

    /// Consumes one position snapshot (the buffer is moved in, fulfilling
    /// the transfer contract) and produces the frame's draw commands.
    pub(super) fn draw(&mut self, positions: Vec<f32>) -> FramePlan {
        self.positions = positions;

        let mut plan = FramePlan {
            background: self.colors.background,
            commands: Vec::new(),
        };

        // A stale snapshot from before a re-init is ignored, not fatal.
        if self.positions.len() != self.node_count() * 2 {
            return plan;
        }
        if self.node_count() == 0 {
            return plan;
        }

        let canvas = Rect::from_min_size(pos2(0.0, 0.0), vec2(self.width, self.height));
        let hover_active = self.hovered_node != -1 || self.grabbed_node != -1;
        if hover_active {
            self.hover_fade = (self.hover_fade + HOVER_FADE_SPEED).min(1.0);
            self.hover_fade_secondary =
                (self.hover_fade_secondary + HOVER_FADE_SECONDARY_SPEED).min(1.0);
        } else {
            self.hover_fade = (self.hover_fade - HOVER_FADE_SPEED).max(0.0);
            self.hover_fade_secondary =
                (self.hover_fade_secondary - HOVER_FADE_SECONDARY_SPEED).max(0.0);
        }

        if self.update_attached {
            self.attached_to_hovered.clear();
        }

        let mut labels = Vec::new();
        let mut top_lines = Vec::new();

        let base_line_color = with_alpha(
            mix_colors(
                self.colors.link,
                self.colors.background,
                self.hover_fade * 0.5,
            ),
            0.7,
        );

        for (edge_index, &(source, target)) in self.edges.iter().enumerate() {
            let hovered = self.hovered_node;
            let last_hovered = self.last_hovered_node;
            let endpoint_hovered = hovered == source as i32 || hovered == target as i32;
            let endpoint_fading = (last_hovered == source as i32 || last_hovered == target as i32)
                && self.hover_fade != 0.0;

            if endpoint_hovered || endpoint_fading {
                if self.update_attached && hovered == source as i32 {
                    self.attached_to_hovered.push(target);
                } else if self.update_attached && hovered == target as i32 {
                    self.attached_to_hovered.push(source);
                }
                top_lines.push(edge_index);
            }

            let start = self.to_screen(self.position_of(source));
            let end = self.to_screen(self.position_of(target));
            if !edge_visible(canvas, start, end, 2.0) {
                continue;
            }
            if (end - start).length_sq() < MIN_EDGE_SCREEN_LENGTH * MIN_EDGE_SCREEN_LENGTH {
                continue;
            }

            plan.commands.push(PaintCmd::Line {
                start,
                end,
                width: 1.0,
                color: base_line_color,
            });
        }

        let node_fill = with_alpha(
            mix_colors(
                self.colors.node,
                self.colors.background,
                self.hover_fade * 0.5,
            ),
            1.0 - self.hover_fade * 0.5,
        );

        for index in 0..self.node_count() {
            let screen_radius = self.screen_radius(index);

            if self.hovered_node != index as i32 {
                if screen_radius > 2.0 {
                    let fade = lerp(
                        0.0,
                        (screen_radius - 4.0) / 8.0
                            - (1.0 / self.camera_scale_root) / 6.0 * 0.9,
                        (1.0 - self.hover_fade).max(0.2),
                    )
                    .clamp(0.0, 1.0);
                    self.label_fade[index] = fade;
                } else {
                    self.label_fade[index] = 0.0;
                }
            }

            let highlighted = self.hovered_node == index as i32
                || (self.last_hovered_node == index as i32 && self.hover_fade != 0.0)
                || (self.hovered_node != -1 && self.attached_to_hovered.contains(&index));
            if highlighted {
                continue;
            }

            let center = self.to_screen(self.position_of(index));
            if !circle_visible(canvas, center, screen_radius) {
                continue;
            }

            plan.commands.push(PaintCmd::Circle {
                center,
                radius: screen_radius,
                fill: node_fill,
            });

            if self.label_fade[index] > 0.01 {
                labels.push(self.label_command(index, self.label_fade[index], 0.0));
            }
        }

        // Edges attached to the hovered node repeat on top in the accent mix.
        let top_line_color = with_alpha(
            mix_colors(
                mix_colors(self.colors.link, self.colors.accent, self.hover_fade),
                self.colors.background,
                0.2,
            ),
            self.hover_fade * 0.7,
        );
        for &edge_index in &top_lines {
            let (source, target) = self.edges[edge_index];
            plan.commands.push(PaintCmd::Line {
                start: self.to_screen(self.position_of(source)),
                end: self.to_screen(self.position_of(target)),
                width: 1.0,
                color: top_line_color,
            });
        }

        if self.hovered_node != -1 || (self.last_hovered_node != -1 && self.hover_fade != 0.0) {
            let attached_fill = with_alpha(
                mix_colors(
                    self.colors.node,
                    self.colors.accent,
                    self.hover_fade * 0.2,
                ),
                0.9,
            );
            for &index in &self.attached_to_hovered {
                plan.commands.push(PaintCmd::Circle {
                    center: self.to_screen(self.position_of(index)),
                    radius: self.screen_radius(index),
                    fill: attached_fill,
                });
                let fade = (self.hover_fade * 0.6).max(self.label_fade[index]);
                if fade > 0.01 {
                    labels.push(self.label_command(index, fade, 0.0));
                }
            }

            let focus = if self.hovered_node != -1 {
                self.hovered_node as usize
            } else {
                self.last_hovered_node as usize
            };
            let center = self.to_screen(self.position_of(focus));
            let radius = self.screen_radius(focus);

            plan.commands.push(PaintCmd::Circle {
                center,
                radius,
                fill: mix_colors(self.colors.node, self.colors.accent, self.hover_fade),
            });
            if self.hover_fade > 0.0 {
                plan.commands.push(PaintCmd::CircleOutline {
                    center,
                    radius,
                    width: self.hover_fade,
                    color: mix_colors(
                        contrast_color(self.colors.background),
                        self.colors.accent,
                        0.5,
                    ),
                });
            }

            let fade = self.hover_fade.max(self.label_fade[focus]);
            if fade > 0.01 {
                labels.push(self.label_command(focus, fade, self.hover_fade_secondary));
            }
        }

        self.update_attached = false;

        if self.active_node >= 0 && (self.active_node as usize) < self.node_count() {
            let active = self.active_node as usize;
            plan.commands.push(PaintCmd::CircleOutline {
                center: self.to_screen(self.position_of(active)),
                radius: self.screen_radius(active) + 4.0,
                width: 2.0,
                color: self.colors.accent,
            });
        }

        plan.commands.append(&mut labels);
        plan
    }

    fn label_command(&self, index: usize, fade: f32, hover_emphasis: f32) -> PaintCmd {
        let center = self.to_screen(self.position_of(index));
        PaintCmd::Text {
            pos: pos2(
                center.x,
                center.y + self.screen_radius(index) + LABEL_OFFSET,
            ),
            text: Arc::clone(&self.labels[index]),
            size: lerp(NORMAL_FONT_SIZE, HOVER_FONT_SIZE, hover_emphasis),
            color: with_alpha(self.colors.text, fade),
        }
    }
}
