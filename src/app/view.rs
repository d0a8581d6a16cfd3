use std::f32::consts::TAU;
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::egui::{
    CursorIcon, Event, PointerButton, Rect, Sense, TouchPhase, Ui, Vec2, pos2, vec2,
};

use crate::data::{GraphDataset, GraphOptions};
use crate::theme::ThemeColors;

use super::camera::{Camera, MAX_SCALE, MIN_SCALE};
use super::input::InputState;
use super::persist::{self, CameraRecord, StoredView};
use super::render::{RenderWorker, SceneInit};
use super::render_utils::paint_frame;
use super::sim::{KernelConfig, SimKernel};
use super::throttle::ThrottleController;

const SPIRAL_TURNS: f32 = 7.41;
const FIT_MARGIN: f32 = 50.0;
const DEFAULT_DT: f32 = 1.0;

/// One interactive graph view: the kernel, its buffers, the camera and
/// gesture state, the render worker, and the throttle controller. Exactly
/// one exists per visible graph; dropping it tears everything down.
pub struct GraphView {
    dataset: GraphDataset,
    kernel: SimKernel,
    camera: Camera,
    input: InputState,
    worker: RenderWorker,
    throttle: ThrottleController,
    theme: ThemeColors,
    starting_rect: Rect,
    pending_camera: Option<CameraRecord>,
    camera_ready: bool,
    last_size: Vec2,
    compensate_next_resize: bool,
    recenter_on_resume: bool,
    paused: bool,
    hovered_node: i32,
    active_node: i32,
    pending_navigation: Option<String>,
    last_sent_camera: Option<(Vec2, f32)>,
    sim_dt: f32,
    pub(super) tuning: GraphOptions,
    pub(super) last_navigation: Option<String>,
    pub(super) show_fps: bool,
    pub(super) fps_current: f32,
}

impl GraphView {
    pub fn new(
        dataset: GraphDataset,
        theme: ThemeColors,
        target_fps: f32,
        stored: StoredView,
    ) -> Result<Self> {
        let seed = stored
            .positions(dataset.node_count)
            .unwrap_or_else(|| spiral_seed_positions(&dataset.radii));
        let starting_rect = bounding_rect(&seed, FIT_MARGIN);
        let pending_camera = stored.camera();

        let kernel = SimKernel::init(
            seed,
            dataset.radii.clone(),
            &dataset.link_sources,
            &dataset.link_targets,
            KernelConfig {
                batch_fraction: 1.0,
                dt: DEFAULT_DT,
                attraction_force: dataset.options.attraction_force,
                link_length: dataset.options.link_length,
                repulsion_force: dataset.options.repulsion_force,
                central_force: dataset.options.central_force,
                edge_pruning: dataset.options.edge_pruning,
            },
        )
        .context("failed to initialize the simulation kernel")?;

        let worker = RenderWorker::spawn(SceneInit {
            radii: dataset.radii.clone(),
            labels: dataset.labels.clone(),
            link_sources: dataset.link_sources.clone(),
            link_targets: dataset.link_targets.clone(),
            width: 0.0,
            height: 0.0,
            colors: theme,
        });

        tracing::info!(
            nodes = dataset.node_count,
            links = dataset.link_count,
            "graph view initialized"
        );

        Ok(Self {
            tuning: dataset.options,
            dataset,
            kernel,
            camera: Camera::new(1.0, 1.0),
            input: InputState::default(),
            worker,
            throttle: ThrottleController::new(target_fps),
            theme,
            starting_rect,
            pending_camera,
            camera_ready: false,
            last_size: Vec2::ZERO,
            compensate_next_resize: false,
            recenter_on_resume: false,
            paused: false,
            hovered_node: -1,
            active_node: -1,
            pending_navigation: None,
            last_sent_camera: None,
            sim_dt: DEFAULT_DT,
            last_navigation: None,
            show_fps: true,
            fps_current: 0.0,
        })
    }

    /// The collapsed-sidebar signal: while collapsed nothing runs, no kernel
    /// steps and no renders. Un-collapsing resizes and recenters.
    pub fn set_collapsed(&mut self, collapsed: bool) {
        if collapsed == self.paused {
            return;
        }
        self.paused = collapsed;
        if collapsed {
            self.input.clear();
        } else {
            self.recenter_on_resume = true;
            self.last_size = Vec2::ZERO;
        }
    }

    /// Arms the scale-compensating zoom for the next resize, so an
    /// expand/collapse of the container keeps the graph visually stable.
    pub fn prepare_expand_toggle(&mut self) {
        self.compensate_next_resize = true;
    }

    pub fn take_navigation(&mut self) -> Option<String> {
        self.pending_navigation.take()
    }

    pub fn save(&self, storage: &mut dyn eframe::Storage) {
        persist::save_view_state(storage, self.kernel.positions(), &self.camera);
    }

    pub fn shutdown(&mut self) {
        self.worker.shutdown();
    }

    pub fn set_theme(&mut self, theme: ThemeColors) {
        self.theme = theme;
        self.worker.update_colors(theme);
    }

    pub(super) fn apply_tuning(&mut self) {
        self.kernel.set_attraction_force(self.tuning.attraction_force);
        self.kernel.set_repulsion_force(self.tuning.repulsion_force);
        self.kernel.set_central_force(self.tuning.central_force);
        self.kernel.set_link_length(self.tuning.link_length);
    }

    pub(super) fn set_target_fps(&mut self, target_fps: f32) {
        self.throttle.set_target_fps(target_fps);
    }

    pub(super) fn sim_dt(&self) -> f32 {
        self.sim_dt
    }

    pub(super) fn set_sim_dt(&mut self, dt: f32) {
        self.sim_dt = dt;
        self.kernel.set_dt(dt);
    }

    pub(super) fn target_fps(&self) -> f32 {
        self.throttle.target_fps()
    }

    pub(super) fn batch_fraction(&self) -> f32 {
        self.throttle.batch_fraction()
    }

    pub(super) fn average_fps(&self) -> f32 {
        self.throttle.average_fps()
    }

    pub(super) fn node_count(&self) -> usize {
        self.dataset.node_count
    }

    pub(super) fn link_count(&self) -> usize {
        self.dataset.link_count
    }

    /// Per-frame entry point. The sequence is fixed: interaction sample →
    /// kernel step → render dispatch → throttle adjust, then the newest
    /// worker frame is painted.
    pub fn frame(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.handle_resize(rect.size());

        if !self.paused {
            self.sample_input(ui, rect, &response);
            self.step_and_dispatch(ui);
        }

        let painter = ui.painter_at(rect);
        match self.worker.latest_frame() {
            Some(plan) => paint_frame(&painter, rect, plan),
            None => {
                painter.rect_filled(rect, 0.0, self.theme.background);
            }
        }

        if !self.paused {
            ui.ctx()
                .request_repaint_after(Duration::from_secs_f32(1.0 / self.target_fps()));
        }
    }

    fn handle_resize(&mut self, size: Vec2) {
        if size.x < 1.0 || size.y < 1.0 {
            return;
        }

        if (size.x - self.last_size.x).abs() > 0.5 || (size.y - self.last_size.y).abs() > 0.5 {
            let previous = self.last_size;
            self.camera.set_viewport(size.x, size.y);
            self.worker.resize(size.x, size.y);

            if self.camera_ready {
                self.camera.center();
                if self.compensate_next_resize && previous.x > 0.0 && previous.y > 0.0 {
                    let compensation = ((size.x / previous.x) + (size.y / previous.y)) * 0.5;
                    self.camera.scale =
                        (self.camera.scale * compensation).clamp(MIN_SCALE, MAX_SCALE);
                }
            } else {
                // First frame with a real surface: restore the persisted
                // framing, or fit the seeded layout.
                match self.pending_camera.take() {
                    Some(record) => {
                        self.camera.offset = vec2(record.offset_x, record.offset_y);
                        self.camera.scale = record.scale.clamp(MIN_SCALE, MAX_SCALE);
                    }
                    None => self.camera.fit_to_rect(self.starting_rect),
                }
                self.camera_ready = true;
            }

            self.compensate_next_resize = false;
            self.last_size = size;
        }

        if self.recenter_on_resume {
            self.camera.center();
            self.recenter_on_resume = false;
        }
    }

    fn sample_input(&mut self, ui: &Ui, rect: Rect, response: &eframe::egui::Response) {
        let now = ui.input(|input| input.time);

        let events = ui.input(|input| input.events.clone());
        for event in events {
            let Event::Touch { id, phase, pos, .. } = event else {
                continue;
            };
            let local = pos2(pos.x - rect.min.x, pos.y - rect.min.y);
            match phase {
                TouchPhase::Start => {
                    if rect.contains(pos) {
                        self.input.on_touch_start(id.0, local, now);
                    }
                }
                TouchPhase::Move => self.input.on_touch_move(id.0, local, &mut self.camera),
                TouchPhase::End | TouchPhase::Cancel => {
                    if let Some(node) = self.input.on_touch_end(id.0, now) {
                        self.activate_node(node);
                    }
                }
            }
        }

        let pointer = ui.input(|input| input.pointer.hover_pos());
        let (primary_down, primary_up, middle_down, middle_up) = ui.input(|input| {
            (
                input.pointer.button_pressed(PointerButton::Primary),
                input.pointer.button_released(PointerButton::Primary),
                input.pointer.button_pressed(PointerButton::Middle),
                input.pointer.button_released(PointerButton::Middle),
            )
        });

        match pointer {
            Some(pos) => {
                let local = pos2(pos.x - rect.min.x, pos.y - rect.min.y);
                self.input.on_pointer_move(local, &mut self.camera);

                if rect.contains(pos) {
                    if primary_down {
                        self.input.on_pointer_down(local, PointerButton::Primary, now);
                    }
                    if middle_down {
                        self.input.on_pointer_down(local, PointerButton::Middle, now);
                    }
                }
                if primary_up {
                    if let Some(node) = self.input.on_pointer_up(local, PointerButton::Primary, now)
                    {
                        self.activate_node(node);
                    }
                }
                if middle_up {
                    let _ = self.input.on_pointer_up(local, PointerButton::Middle, now);
                }
            }
            None => self.input.on_pointer_gone(),
        }

        if response.hovered() {
            let scroll = ui.input(|input| input.raw_scroll_delta.y);
            if scroll.abs() > f32::EPSILON {
                self.input.on_wheel(scroll);
            }
        }

        if response.double_clicked() {
            self.camera.fit_to_rect(self.starting_rect);
        }
    }

    fn step_and_dispatch(&mut self, ui: &Ui) {
        let pointer_world = self.input.pointer_world(&self.camera);
        let grabbed = self.input.grabbed_node();

        let hovered = self.kernel.step(pointer_world, grabbed, self.camera.scale);
        if hovered != self.hovered_node {
            self.hovered_node = hovered;
            self.input.set_hovered(hovered);
        }
        self.worker.set_interaction(hovered, grabbed);
        if hovered != -1 {
            ui.ctx()
                .output_mut(|output| output.cursor_icon = CursorIcon::PointingHand);
        }

        // The snapshot buffer is moved into the draw message; nothing on
        // this side can alias it afterwards.
        let mut snapshot = Vec::new();
        self.kernel.snapshot_into(&mut snapshot);
        self.worker.draw(snapshot);

        let frame_seconds = ui.input(|input| input.stable_dt).max(0.0001);
        self.fps_current = (1.0 / frame_seconds).clamp(0.0, 1000.0);
        if let Some(fraction) = self.throttle.observe(self.fps_current) {
            self.kernel.set_batch_fraction(fraction);
        }

        self.input.apply_scroll_zoom(&mut self.camera);
        let camera_state = (self.camera.offset, self.camera.scale);
        if self.last_sent_camera != Some(camera_state) {
            self.worker.update_camera(self.camera.offset, self.camera.scale);
            self.last_sent_camera = Some(camera_state);
        }
    }

    /// A node activation is a navigation request; fulfilling it is the
    /// router's job, not ours.
    fn activate_node(&mut self, node: usize) {
        let Some(path) = self.dataset.paths.get(node) else {
            return;
        };
        tracing::info!(path = %path, "node activated, requesting navigation");
        self.pending_navigation = Some(path.clone());
        self.last_navigation = Some(path.clone());
        self.active_node = node as i32;
        self.worker.set_active(self.active_node);
    }
}

/// Procedural fallback layout: a spiral sweep with large nodes spawned near
/// the center, so hubs start where they will end up.
pub(super) fn spiral_seed_positions(radii: &[f32]) -> Vec<f32> {
    let node_count = radii.len();
    let mut positions = vec![0.0_f32; node_count * 2];
    if node_count == 0 {
        return positions;
    }

    let max_radius = radii.iter().copied().fold(0.0_f32, f32::max).max(0.0001);
    let average_radius = radii.iter().sum::<f32>() / node_count as f32;
    let spawn_radius = average_radius * (node_count as f32).sqrt() * 2.0;

    for (index, radius) in radii.iter().enumerate() {
        let distance = (1.0 - radius / max_radius) * spawn_radius;
        let angle = index as f32 / node_count as f32 * SPIRAL_TURNS * TAU;
        positions[index * 2] = angle.cos() * distance;
        positions[index * 2 + 1] = angle.sin() * distance;
    }

    positions
}

pub(super) fn bounding_rect(positions: &[f32], margin: f32) -> Rect {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for pair in positions.chunks_exact(2) {
        min_x = min_x.min(pair[0]);
        max_x = max_x.max(pair[0]);
        min_y = min_y.min(pair[1]);
        max_y = max_y.max(pair[1]);
    }

    if !min_x.is_finite() || !min_y.is_finite() {
        return Rect::from_min_max(pos2(-1.0, -1.0), pos2(1.0, 1.0));
    }

    Rect::from_min_max(
        pos2(min_x - margin, min_y - margin),
        pos2(max_x + margin, max_y + margin),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::demo_dataset;
    use eframe::Storage;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStorage(HashMap<String, String>);

    impl eframe::Storage for MemStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.0.insert(key.to_owned(), value);
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn spiral_seed_puts_large_nodes_near_the_center() {
        let positions = spiral_seed_positions(&[2.0, 10.0, 2.0, 5.0]);
        let distance = |index: usize| {
            let x = positions[index * 2];
            let y = positions[index * 2 + 1];
            (x * x + y * y).sqrt()
        };

        // Radius 10 is the maximum, so that node spawns at the origin.
        assert!(distance(1) < 0.001);
        assert!(distance(0) > distance(3));
        assert!(distance(0) > distance(1));
    }

    #[test]
    fn spiral_seed_is_deterministic() {
        let radii = vec![3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(spiral_seed_positions(&radii), spiral_seed_positions(&radii));
    }

    #[test]
    fn bounding_rect_covers_all_points_with_margin() {
        let rect = bounding_rect(&[-10.0, 5.0, 30.0, -20.0, 0.0, 0.0], 50.0);
        assert_eq!(rect.min.x, -60.0);
        assert_eq!(rect.min.y, -70.0);
        assert_eq!(rect.max.x, 80.0);
        assert_eq!(rect.max.y, 55.0);
    }

    #[test]
    fn bounding_rect_of_nothing_is_the_unit_rect() {
        let rect = bounding_rect(&[], 50.0);
        assert_eq!(rect.min, pos2(-1.0, -1.0));
        assert_eq!(rect.max, pos2(1.0, 1.0));
    }

    #[test]
    fn view_seeds_from_storage_when_lengths_match() {
        let dataset = demo_dataset();
        let mut storage = MemStorage::default();
        let encoded = (0..dataset.node_count * 2)
            .map(|value| value as i32)
            .collect::<Vec<_>>();
        storage.set_string(
            persist::POSITIONS_KEY,
            serde_json::to_string(&encoded).expect("encode positions"),
        );

        let mut view = GraphView::new(
            dataset,
            ThemeColors::dark(),
            40.0,
            StoredView::capture(&storage),
        )
        .expect("view init");

        let first = view.kernel.positions()[0];
        assert_eq!(first.x, 0.0);
        assert_eq!(first.y, 1.0);
        view.shutdown();
    }

    #[test]
    fn wrong_length_storage_falls_back_to_the_spiral() {
        let dataset = demo_dataset();
        let mut storage = MemStorage::default();
        storage.set_string(persist::POSITIONS_KEY, "[1, 2, 3]".to_owned());

        let expected = spiral_seed_positions(&dataset.radii);
        let mut view = GraphView::new(
            dataset,
            ThemeColors::dark(),
            40.0,
            StoredView::capture(&storage),
        )
        .expect("view init");

        let seeded = view.kernel.positions();
        assert_eq!(seeded[0].x, expected[0]);
        assert_eq!(seeded[0].y, expected[1]);
        view.shutdown();
    }

    #[test]
    fn expand_resize_applies_a_compensating_zoom() {
        let mut view =
            GraphView::new(demo_dataset(), ThemeColors::dark(), 40.0, StoredView::default())
                .expect("view init");

        view.handle_resize(vec2(400.0, 300.0));
        let scale_before = view.camera.scale;

        view.prepare_expand_toggle();
        view.handle_resize(vec2(800.0, 600.0));

        let expected = (scale_before * 2.0).clamp(MIN_SCALE, MAX_SCALE);
        assert!((view.camera.scale - expected).abs() < 0.001);
        view.shutdown();
    }

    #[test]
    fn collapse_pauses_and_resume_recenters() {
        let mut view =
            GraphView::new(demo_dataset(), ThemeColors::dark(), 40.0, StoredView::default())
                .expect("view init");
        view.handle_resize(vec2(400.0, 300.0));

        view.set_collapsed(true);
        assert!(view.paused);

        view.set_collapsed(false);
        assert!(!view.paused);
        view.handle_resize(vec2(400.0, 300.0));
        // Recentered: the world origin maps to the viewport center again.
        let origin = view.camera.to_screen(vec2(0.0, 0.0));
        assert!((origin.x - 200.0).abs() < 0.001);
        assert!((origin.y - 150.0).abs() < 0.001);
        view.shutdown();
    }

    #[test]
    fn save_round_trips_through_the_kernel_positions() {
        let dataset = demo_dataset();
        let node_count = dataset.node_count;
        let mut view = GraphView::new(dataset, ThemeColors::dark(), 40.0, StoredView::default())
            .expect("view init");

        let mut storage = MemStorage::default();
        view.save(&mut storage);
        let stored = StoredView::capture(&storage);
        assert!(stored.positions(node_count).is_some());
        assert!(stored.camera().is_some());
        view.shutdown();
    }
}
