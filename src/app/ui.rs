use eframe::egui::{self, Align, Layout, Ui};

use super::view::GraphView;

/// App-level toggles mirrored into the panels each frame; the shell applies
/// whatever changed after drawing.
pub(super) struct UiFlags {
    pub collapsed: bool,
    pub graph_expanded: bool,
    pub light_theme: bool,
}

pub(super) fn draw_header(view: &GraphView, ui: &mut Ui, flags: &mut UiFlags) {
    ui.horizontal(|ui| {
        ui.toggle_value(&mut flags.graph_expanded, "Expand graph")
            .on_hover_text("Give the graph the full window; the view rescales to stay stable.");
        ui.toggle_value(&mut flags.collapsed, "Hide graph")
            .on_hover_text("Pause the simulation and rendering entirely.");

        let theme_label = if flags.light_theme { "Dark theme" } else { "Light theme" };
        if ui.button(theme_label).clicked() {
            flags.light_theme = !flags.light_theme;
        }

        if let Some(text) = fps_text(view) {
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(text);
            });
        }
    });
}

pub(super) fn fps_text(view: &GraphView) -> Option<String> {
    view.show_fps.then(|| {
        format!(
            "FPS {:.0} | avg {:.0} | batch {:.2}",
            view.fps_current,
            view.average_fps(),
            view.batch_fraction()
        )
    })
}

pub(super) fn draw_controls(view: &mut GraphView, ui: &mut Ui) {
    ui.heading("Graph Controls");
    ui.separator();
    ui.add_space(4.0);

    ui.label(format!(
        "{} documents, {} links",
        view.node_count(),
        view.link_count()
    ));

    ui.separator();

    let mut changed = false;
    changed |= ui
        .add(egui::Slider::new(&mut view.tuning.attraction_force, 0.0..=50.0).text("Attraction"))
        .on_hover_text("Spring strength pulling linked documents together.")
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut view.tuning.link_length, 0.0..=300.0).text("Link length"))
        .on_hover_text("Preferred distance between linked documents.")
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut view.tuning.repulsion_force, 0.0..=500.0).text("Repulsion"))
        .on_hover_text("How strongly documents push away from each other.")
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut view.tuning.central_force, 0.0..=20.0).text("Central pull"))
        .on_hover_text("Weak pull toward the center that keeps the graph from drifting.")
        .changed();
    if changed {
        view.apply_tuning();
    }

    ui.separator();

    let mut target_fps = view.target_fps();
    let fps_slider = ui
        .add(egui::Slider::new(&mut target_fps, 20.0..=120.0).text("Target FPS"))
        .on_hover_text("Frame rate the adaptive throttle aims for.");
    if fps_slider.changed() {
        view.set_target_fps(target_fps);
    }

    let mut sim_dt = view.sim_dt();
    let dt_slider = ui
        .add(egui::Slider::new(&mut sim_dt, 0.2..=2.0).text("Time step"))
        .on_hover_text("Simulation step size; larger settles faster but less smoothly.");
    if dt_slider.changed() {
        view.set_sim_dt(sim_dt);
    }

    ui.checkbox(&mut view.show_fps, "FPS display")
        .on_hover_text("Show the live frame rate and batch fraction in the header.");

    if let Some(path) = &view.last_navigation {
        ui.separator();
        ui.label("Navigation requested:");
        ui.monospace(path.as_str());
    }
}
