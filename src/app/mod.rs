use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use eframe::egui::{self, Context};

use crate::data::{self, GraphDataset};
use crate::theme::ThemeColors;

mod camera;
mod input;
mod persist;
mod render;
mod render_utils;
mod sim;
mod throttle;
mod ui;
mod view;

use persist::StoredView;
use ui::UiFlags;
use view::GraphView;

pub struct SiteGraphApp {
    graph_path: Option<PathBuf>,
    target_fps: f32,
    light_theme: bool,
    collapsed: bool,
    graph_expanded: bool,
    stored: StoredView,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<GraphDataset, String>>,
    },
    Ready(Box<GraphView>),
    Error(String),
}

impl SiteGraphApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        graph_path: Option<PathBuf>,
        target_fps: f32,
        light_theme: bool,
    ) -> Self {
        cc.egui_ctx.set_visuals(if light_theme {
            egui::Visuals::light()
        } else {
            egui::Visuals::dark()
        });

        let stored = cc
            .storage
            .map(StoredView::capture)
            .unwrap_or_default();

        Self {
            state: Self::start_load(graph_path.clone()),
            graph_path,
            target_fps,
            light_theme,
            collapsed: false,
            graph_expanded: false,
            stored,
        }
    }

    fn spawn_load(graph_path: Option<PathBuf>) -> Receiver<Result<GraphDataset, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = match graph_path {
                Some(path) => {
                    data::load_graph_dataset(&path).map_err(|error| format!("{error:#}"))
                }
                None => Ok(data::demo_dataset()),
            };
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(graph_path: Option<PathBuf>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(graph_path),
        }
    }
}

impl eframe::App for SiteGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(dataset) => {
                            match GraphView::new(
                                dataset,
                                theme_colors(self.light_theme),
                                self.target_fps,
                                self.stored.clone(),
                            ) {
                                Ok(view) => AppState::Ready(Box::new(view)),
                                // If the kernel cannot start, show nothing
                                // rather than a broken graph.
                                Err(error) => AppState::Error(format!("{error:#}")),
                            }
                        }
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to open the graph view");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.graph_path.clone()));
                    }
                });
            }
            AppState::Ready(view) => {
                let mut flags = UiFlags {
                    collapsed: self.collapsed,
                    graph_expanded: self.graph_expanded,
                    light_theme: self.light_theme,
                };

                egui::TopBottomPanel::top("header").show(ctx, |ui| {
                    ui::draw_header(view, ui, &mut flags);
                });

                if !flags.graph_expanded {
                    egui::SidePanel::left("controls")
                        .resizable(false)
                        .default_width(260.0)
                        .show(ctx, |ui| {
                            ui::draw_controls(view, ui);
                        });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    if flags.collapsed {
                        ui.vertical_centered(|ui| {
                            ui.add_space(80.0);
                            ui.label("Graph hidden");
                        });
                    } else {
                        view.frame(ui);
                    }
                });

                if flags.collapsed != self.collapsed {
                    self.collapsed = flags.collapsed;
                    view.set_collapsed(self.collapsed);
                }
                if flags.graph_expanded != self.graph_expanded {
                    self.graph_expanded = flags.graph_expanded;
                    view.prepare_expand_toggle();
                }
                if flags.light_theme != self.light_theme {
                    self.light_theme = flags.light_theme;
                    ctx.set_visuals(if self.light_theme {
                        egui::Visuals::light()
                    } else {
                        egui::Visuals::dark()
                    });
                    view.set_theme(theme_colors(self.light_theme));
                }

                // Navigation is fulfilled by an external router; the view
                // only emits the request.
                if let Some(path) = view.take_navigation() {
                    tracing::info!(path = %path, "navigation request ready for the router");
                }
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let AppState::Ready(view) = &self.state {
            view.save(storage);
        }
    }
}

fn theme_colors(light: bool) -> ThemeColors {
    if light {
        ThemeColors::light()
    } else {
        ThemeColors::dark()
    }
}
