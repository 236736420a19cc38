//! The main application window.
//!
//! Quad layout: analysis plot (center), signal tree with search and file
//! buttons (right), data-insight readout (right, below the tree), time
//! scrubber (bottom). Double-click toggles a signal in the plot; a
//! right-click toggles it in the insight-only store.

use crate::config::AppState;
use crate::frontend::signal_color;
use crate::loader::{MatfileSource, SyntheticSource};
use crate::scripting::ScriptEngine;
use crate::store::{SelectionKind, SignalStore, StoreEvent};
use crate::tree::{FilterDebouncer, NodeId, SignalTree};
use crate::types::{SignalValue, CUSTOM_GROUP};
use crossbeam_channel::Receiver;
use egui::{Color32, RichText, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints, VLine};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, Instant};

/// Interactions collected while rendering the tree, applied afterwards
enum TreeAction {
    TogglePlot(NodeId),
    ToggleInsight(NodeId),
}

/// The eframe application
pub struct QuadViewApp {
    store: SignalStore,
    events: Receiver<StoreEvent>,
    engine: ScriptEngine,
    source: MatfileSource,
    app_state: AppState,

    tree: SignalTree,
    visible: Option<HashSet<NodeId>>,
    debouncer: FilterDebouncer,
    filter_text: String,

    ts_ref_input: String,
    ts_ref_placeholder: String,
    scrub_time: f64,
    /// Stable color slot per qualified signal name
    color_slots: HashMap<String, usize>,
    last_error: Option<String>,
}

impl QuadViewApp {
    pub fn new(cc: &eframe::CreationContext<'_>, app_state: AppState) -> Self {
        if app_state.dark_mode {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        }

        let (store, events) = SignalStore::new();
        let filter_text = app_state.last_filter.clone();
        Self {
            store,
            events,
            engine: ScriptEngine::new(),
            source: MatfileSource,
            app_state,
            tree: SignalTree::new(),
            visible: None,
            debouncer: FilterDebouncer::new(),
            filter_text,
            ts_ref_input: String::new(),
            ts_ref_placeholder: String::new(),
            scrub_time: 0.0,
            color_slots: HashMap::new(),
            last_error: None,
        }
    }

    /// Load the built-in synthetic recording (`--demo`)
    pub fn load_demo(&mut self) {
        if let Err(e) = self
            .store
            .load_file(&SyntheticSource::demo(), Path::new("demo.mat"))
        {
            self.last_error = Some(e.to_string());
        }
    }

    fn load_mat(&mut self, path: &Path) {
        match self.store.load_file(&self.source, path) {
            Ok(()) => {
                self.app_state.add_recent_file(path);
                self.last_error = None;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load MAT file");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn load_script(&mut self, path: &Path) {
        match self.store.add_custom_data_points(&self.engine, path) {
            Ok(names) if names.is_empty() => {
                self.last_error = Some("script produced no usable signals".to_string());
            }
            Ok(_) => self.last_error = None,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to run custom script");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn process_store_events(&mut self) {
        for event in self.events.try_iter().collect::<Vec<_>>() {
            match event {
                StoreEvent::NewDataLoaded => {
                    self.tree = match self.store.dataset() {
                        Some(data) => SignalTree::build(data),
                        None => SignalTree::new(),
                    };
                    self.visible = self.tree.filter(&self.filter_text);
                    self.color_slots.clear();
                    self.scrub_time = 0.0;
                }
                StoreEvent::TreeNodesAdded => {
                    let names: Vec<String> = self
                        .store
                        .dataset()
                        .and_then(|data| data.get(CUSTOM_GROUP))
                        .and_then(crate::types::Value::as_struct)
                        .map(|group| group.keys().cloned().collect())
                        .unwrap_or_default();
                    self.tree.add_custom_nodes(CUSTOM_GROUP, &names);
                    self.visible = self.tree.filter(&self.filter_text);
                }
                StoreEvent::TsRefPlaceholderChanged => {
                    self.ts_ref_placeholder = self
                        .store
                        .loaded_ts_ref()
                        .map(|v| format!("{:.3}", v))
                        .unwrap_or_default();
                }
                StoreEvent::SelectionChanged => {}
            }
        }
    }

    /// Time span covered by the currently plotted signals
    fn plotted_time_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for entry in self.store.plot_selection().values() {
            let mut axes: Vec<&[f64]> = Vec::new();
            if let Some(time) = entry.time.as_ref() {
                axes.push(&time.ts);
            }
            for value in entry.children.values() {
                if let SignalValue::Derived { ts, .. } = value {
                    axes.push(ts);
                }
            }
            for ts in axes {
                let (Some(first), Some(last)) = (ts.first(), ts.last()) else {
                    continue;
                };
                let (low, high) = (first.min(*last), first.max(*last));
                range = Some(match range {
                    Some((min, max)) => (min.min(low), max.max(high)),
                    None => (low, high),
                });
            }
        }
        range
    }

    fn color_for(&mut self, name: &str) -> Color32 {
        let next = self.color_slots.len();
        let slot = *self.color_slots.entry(name.to_string()).or_insert(next);
        signal_color(slot)
    }

    fn render_side_panel(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            if ui.button("Load MAT…").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("MATLAB MAT-file", &["mat"])
                    .pick_file()
                {
                    self.load_mat(&path);
                }
            }
            if ui.button("Clear").on_hover_text("Deselect all signals").clicked() {
                self.store.deselect_all_signals();
                self.color_slots.clear();
            }
            if ui.button("Conf…").on_hover_text("Apply a signal list").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Signal list", &["conf"])
                    .pick_file()
                {
                    self.store.apply_conf(&path);
                }
            }
            if ui
                .button("Script…")
                .on_hover_text("Add custom xy-signals")
                .clicked()
            {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Signal script", &["rhai"])
                    .pick_file()
                {
                    self.load_script(&path);
                }
            }
        });

        let search = egui::TextEdit::singleline(&mut self.filter_text)
            .hint_text("Search…")
            .desired_width(f32::INFINITY);
        if ui.add(search).changed() {
            self.debouncer.submit(self.filter_text.clone(), Instant::now());
        }

        ui.separator();

        let mut actions = Vec::new();
        egui::ScrollArea::vertical()
            .id_salt("signal_tree")
            .max_height(ui.available_height() * 0.55)
            .show(ui, |ui| {
                let roots: Vec<NodeId> = self.tree.roots().map(|n| n.id).collect();
                for id in roots {
                    render_tree_node(ui, &self.tree, &self.store, &self.visible, id, &mut actions);
                }
            });
        for action in actions {
            self.apply_tree_action(action);
        }

        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Time ref:");
            let input = egui::TextEdit::singleline(&mut self.ts_ref_input)
                .hint_text(self.ts_ref_placeholder.clone())
                .desired_width(100.0);
            let response = ui.add(input);
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let apply = ui.button("Apply").clicked();
            if (submitted || apply)
                && !self.ts_ref_input.trim().is_empty()
                && self.store.update_global_ts_ref_text(&self.ts_ref_input)
            {
                self.ts_ref_input.clear();
            }
            if ui.button("Reset").clicked() {
                self.store.reset_global_ts_ref();
            }
        });

        if let Some(error) = &self.last_error {
            ui.label(RichText::new(error).color(ui.visuals().error_fg_color).small());
        }

        ui.separator();
        ui.label(RichText::new("Data insight").strong());
        let insight = if self.store.plot_selection().is_empty()
            && self.store.insight_selection().is_empty()
        {
            String::new()
        } else if self.plotted_time_range().is_some() {
            self.store.time_based_insight_text(&[], self.scrub_time)
        } else {
            self.store.default_insight_text()
        };
        egui::ScrollArea::vertical()
            .id_salt("insight_text")
            .show(ui, |ui| {
                ui.label(RichText::new(insight).monospace());
            });
    }

    fn apply_tree_action(&mut self, action: TreeAction) {
        let (id, kind) = match action {
            TreeAction::TogglePlot(id) => (id, SelectionKind::Plot),
            TreeAction::ToggleInsight(id) => (id, SelectionKind::InsightOnly),
        };
        let path = self.tree.node_to_path(id);
        if self.store.is_selected(&path, kind) {
            self.store.deselect(&path, kind);
        } else {
            self.store.select(&path, kind);
        }
    }

    fn render_plot(&mut self, ui: &mut Ui) {
        // Snapshot the lines first; color assignment needs &mut self
        let mut lines: Vec<(String, Vec<[f64; 2]>)> = Vec::new();
        for (parent, entry) in self.store.plot_selection() {
            for (child, value) in &entry.children {
                let name = crate::types::qualified_name(parent, child);
                let (ts, val): (&[f64], &[f64]) = match value {
                    SignalValue::Plain(val) => {
                        let Some(time) = entry.time.as_ref() else {
                            continue;
                        };
                        (&time.ts, val)
                    }
                    SignalValue::Derived { ts, val, .. } => (ts, val),
                };
                let points: Vec<[f64; 2]> =
                    ts.iter().zip(val.iter()).map(|(&t, &v)| [t, v]).collect();
                if !points.is_empty() {
                    lines.push((name, points));
                }
            }
        }

        let scrub = self.scrub_time;
        let colored: Vec<(String, Vec<[f64; 2]>, Color32)> = lines
            .into_iter()
            .map(|(name, points)| {
                let color = self.color_for(&name);
                (name, points, color)
            })
            .collect();

        Plot::new("analysis_plot")
            .legend(Legend::default().position(Corner::RightTop))
            .show(ui, |plot_ui| {
                for (name, points, color) in colored {
                    plot_ui.line(
                        Line::new(name, PlotPoints::from(points))
                            .color(color)
                            .width(2.0),
                    );
                }
                if scrub != 0.0 {
                    plot_ui.vline(VLine::new("scrub", scrub).color(Color32::GRAY));
                }
            });
    }

    fn render_scrubber(&mut self, ui: &mut Ui) {
        match self.plotted_time_range() {
            Some((min, max)) if max > min => {
                self.scrub_time = self.scrub_time.clamp(min, max);
                ui.add(
                    egui::Slider::new(&mut self.scrub_time, min..=max)
                        .show_value(true)
                        .text("t"),
                );
            }
            _ => {
                ui.add_enabled(false, egui::Slider::new(&mut self.scrub_time, 0.0..=1.0));
            }
        }
    }
}

impl eframe::App for QuadViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_store_events();

        if let Some(text) = self.debouncer.poll(Instant::now()) {
            self.visible = self.tree.filter(&text);
            self.app_state.last_filter = text;
        }
        if self.debouncer.is_pending() {
            // Wake up again for the trailing edge
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        egui::TopBottomPanel::bottom("scrubber_panel").show(ctx, |ui| {
            self.render_scrubber(ui);
        });

        egui::SidePanel::right("signal_panel")
            .default_width(320.0)
            .show(ctx, |ui| {
                self.render_side_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_plot(ui);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.app_state.save() {
            tracing::warn!(error = %e, "could not persist app state");
        }
    }
}

/// Render one tree node (and, for groups, its children) into `ui`.
///
/// Collects interactions instead of applying them so the tree and the
/// store are not borrowed at the same time.
fn render_tree_node(
    ui: &mut Ui,
    tree: &SignalTree,
    store: &SignalStore,
    visible: &Option<HashSet<NodeId>>,
    id: NodeId,
    actions: &mut Vec<TreeAction>,
) {
    if let Some(visible) = visible {
        if !visible.contains(&id) {
            return;
        }
    }
    let Some(node) = tree.get(id) else {
        return;
    };

    if node.is_leaf {
        let path = tree.node_to_path(id);
        let plotted = store.is_selected(&path, SelectionKind::Plot);
        let insight = store.is_selected(&path, SelectionKind::InsightOnly);
        let label = if insight {
            RichText::new(&node.name).italics()
        } else {
            RichText::new(&node.name)
        };
        let response = ui.selectable_label(plotted, label);
        if response.double_clicked() {
            actions.push(TreeAction::TogglePlot(id));
        } else if response.secondary_clicked() {
            actions.push(TreeAction::ToggleInsight(id));
        }
        return;
    }

    let children: Vec<NodeId> = tree.children(id).map(|n| n.id).collect();
    egui::CollapsingHeader::new(&node.name)
        .id_salt(id.0)
        .show(ui, |ui| {
            for child in children {
                render_tree_node(ui, tree, store, visible, child, actions);
            }
        });
}
