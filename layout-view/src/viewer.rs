//! Interactive planting layout viewer built with eframe/egui.
//!
//! [`Viewer`] owns a specimen catalog, the run configuration and the most
//! recent layout, and renders the final exposure grid as a heat map with
//! the placed specimens on top.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use eframe::App;
use glam::{DVec2, Vec2};
use layout_core::{
    Config, ExposureMode, FixedSunModel, LayoutResponse, ShadowPathCache, Specimen,
    service::{layout_specimens, layout_with_model},
    specimen::load_catalog_json,
};
use rand::{Rng, rng};

/// Catalog shown when no file is given on the command line.
const DEMO_CATALOG: &str = r#"[
    { "scientific_name": "Pinus densiflora", "kr_name": "소나무", "life_form": "tree", "max_height_m": 4.0, "light_requirement_1_5": 4 },
    { "scientific_name": "Acer palmatum", "kr_name": "단풍나무", "life_form": "tree", "max_height_m": 3.0, "light_requirement_1_5": 3 },
    { "scientific_name": "Cornus officinalis", "kr_name": "산수유", "life_form": "tree", "max_height_m": 2.5, "light_requirement_1_5": 3 },
    { "scientific_name": "Rhododendron schlippenbachii", "kr_name": "철쭉", "life_form": "shrub", "max_height_m": 1.5, "light_requirement_1_5": 2.5 },
    { "scientific_name": "Forsythia koreana", "kr_name": "개나리", "life_form": "shrub", "max_height_m": 1.2, "light_requirement_1_5": 3 },
    { "scientific_name": "Hosta plantaginea", "kr_name": "옥잠화", "life_form": "perennial", "max_height_m": 0.5, "light_requirement_1_5": 1 },
    { "scientific_name": "Iris sanguinea", "kr_name": "붓꽃", "life_form": "perennial", "max_height_m": 0.6, "light_requirement_1_5": 2.5 },
    { "scientific_name": "Aster koraiensis", "kr_name": "벌개미취", "life_form": "perennial", "max_height_m": 0.6, "light_requirement_1_5": 2.5 },
    { "scientific_name": "Chrysanthemum indicum", "kr_name": "감국", "life_form": "perennial", "max_height_m": 0.3, "light_requirement_1_5": 1.5 },
    { "scientific_name": "Liriope muscari", "kr_name": "맥문동", "life_form": "perennial", "max_height_m": 0.3, "light_requirement_1_5": 1 }
]"#;

/// The built-in demo catalog.
pub fn demo_catalog() -> Vec<Specimen> {
    load_catalog_json(DEMO_CATALOG).unwrap_or_else(|err| {
        tracing::error!(error = %err, "demo catalog is malformed");
        Vec::new()
    })
}

/// Writes the placement records of `layout` as a pretty-printed JSON array
/// of `{scientific_name, kr_name, x, y}` objects.
fn write_placements(layout: &LayoutResponse, path: &Path) -> std::io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &layout.placements)?;
    Ok(())
}

/// Maps an exposure fraction in `[0, 1]` from deep shade to full sun.
fn heat_color(fraction: f64) -> egui::Color32 {
    const SHADE: [f32; 3] = [38.0, 28.0, 64.0];
    const SUN: [f32; 3] = [250.0, 222.0, 82.0];

    let t = fraction.clamp(0.0, 1.0) as f32;
    let channel = |i: usize| (SHADE[i] + (SUN[i] - SHADE[i]) * t).round() as u8;
    egui::Color32::from_rgb(channel(0), channel(1), channel(2))
}

/// Main application state for the interactive viewer.
///
/// ### Fields
/// - `catalog` - Specimens placed on every run.
/// - `cfg` - Layout configuration. `cfg.seed` is overwritten with `seed` on each run.
/// - `plot_width`, `plot_height` - Plot extent in metres.
/// - `fixed_sun` - Use the 12-position heuristic instead of the solar model.
/// - `seed` - Seed of the current layout; [`Viewer::reseed`] draws a new one.
/// - `cache` - Shadow paths shared across runs.
/// - `layout` - Result of the most recent successful run.
/// - `last_error` - Message from the most recent failed run.
///
/// - `rng` - Source of fresh seeds.
///
/// - `zoom` - Pixels per metre.
/// - `pan` - Screen-space pan offset in pixels.
/// - `hover_cell` - Grid cell under the pointer, if any.
pub struct Viewer {
    catalog: Vec<Specimen>,
    cfg: Config,
    plot_width: f64,
    plot_height: f64,
    fixed_sun: bool,
    seed: u64,
    cache: ShadowPathCache,
    layout: Option<LayoutResponse>,
    last_error: Option<String>,

    rng: rand::rngs::ThreadRng,

    zoom: f32,
    pan: egui::Vec2,
    hover_cell: Option<(usize, usize)>,
}

impl Viewer {
    /// Creates a viewer over `catalog` on a 10 m x 6 m plot and runs a first layout.
    pub fn new(catalog: Vec<Specimen>) -> Self {
        let mut rng = rng();
        let seed = rng.random();

        let mut viewer = Self {
            catalog,
            cfg: Config::default(),
            plot_width: 10.0,
            plot_height: 6.0,
            fixed_sun: false,
            seed,
            cache: ShadowPathCache::new(),
            layout: None,
            last_error: None,
            rng,
            zoom: 60.0,
            pan: egui::vec2(0.0, 0.0),
            hover_cell: None,
        };
        viewer.relayout();
        viewer
    }

    /// Runs the layout again with the current seed and configuration.
    ///
    /// On failure the previous layout is dropped and the error message kept
    /// for the status bar.
    fn relayout(&mut self) {
        self.cfg.seed = Some(self.seed);
        let result = if self.fixed_sun {
            layout_with_model(
                self.plot_width,
                self.plot_height,
                &self.catalog,
                &self.cfg,
                &FixedSunModel,
                &mut self.cache,
            )
        } else {
            layout_specimens(
                self.plot_width,
                self.plot_height,
                &self.catalog,
                &self.cfg,
                &mut self.cache,
            )
        };

        match result {
            Ok(layout) => {
                tracing::info!(
                    seed = self.seed,
                    placed = layout.placements.len(),
                    unplaced = layout.unplaced,
                    "layout finished"
                );
                self.layout = Some(layout);
                self.last_error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "layout failed");
                self.layout = None;
                self.last_error = Some(err.to_string());
            }
        }
        self.hover_cell = None;
    }

    /// Draws a new seed and runs the layout with it.
    fn reseed(&mut self) {
        self.seed = self.rng.random();
        self.relayout();
    }

    /// Drops the current layout and every cached shadow path.
    fn clear(&mut self) {
        self.layout = None;
        self.last_error = None;
        self.hover_cell = None;
        self.cache.clear();
    }

    fn export(&mut self, path: &Path) {
        let Some(layout) = &self.layout else {
            return;
        };
        match write_placements(layout, path) {
            Ok(()) => tracing::info!(path = %path.display(), "placements exported"),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "export failed");
                self.last_error = Some(format!("export failed: {err}"));
            }
        }
    }

    fn plot_center(&self) -> Vec2 {
        DVec2::new(self.plot_width, self.plot_height).as_vec2() * 0.5
    }

    /// Converts a plot position (metres) to screen-space.
    ///
    /// The plot centre sits at the centre of `rect`, scaled by `zoom` and
    /// offset by `pan`. The y-axis is flipped so that north is up.
    ///
    /// ### Parameters
    /// - `p` - Plot position in metres.
    /// - `rect` - Screen-space rectangle representing the drawing area.
    ///
    /// ### Returns
    /// The corresponding egui position in screen-space.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        let p = p - self.plot_center();
        egui::pos2(
            center.x + p.x * self.zoom + self.pan.x,
            center.y - p.y * self.zoom + self.pan.y,
        )
    }

    /// Inverse of [`Viewer::world_to_screen`], up to floating point rounding.
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        let center = rect.center();
        let x = (p.x - center.x - self.pan.x) / self.zoom;
        let y = (center.y - p.y + self.pan.y) / self.zoom;
        Vec2::new(x, y) + self.plot_center()
    }

    /// Labeled `usize` [`egui::DragValue`]. Returns whether the value changed.
    fn labeled_drag_usize(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut usize,
        range: std::ops::RangeInclusive<usize>,
        speed: f64,
    ) -> bool {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed))
                .changed()
        })
        .inner
    }

    /// Labeled `f64` [`egui::DragValue`]. Returns whether the value changed.
    fn labeled_drag_f64(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f64,
        range: std::ops::RangeInclusive<f64>,
        speed: f64,
    ) -> bool {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(value).range(range).speed(speed))
                .changed()
        })
        .inner
    }

    /// Builds the top panel UI (run, reseed, clear, export, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("▶ Run").clicked() {
                    self.relayout();
                }

                if ui.button("🎲 Reseed").clicked() {
                    self.reseed();
                }

                if ui.button("Clear").clicked() {
                    self.clear();
                }

                if ui
                    .add_enabled(self.layout.is_some(), egui::Button::new("Export placement.json"))
                    .clicked()
                {
                    self.export(Path::new("placement.json"));
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 5.0..=200.0).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar (counts, hovered cell, last error).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!(
                    "shadow cache = {} ({} hits / {} misses)",
                    self.cache.len(),
                    self.cache.hits(),
                    self.cache.misses()
                ));
                ui.separator();

                if let Some(layout) = &self.layout {
                    ui.label(format!("suns = {}", layout.suns.len()));
                    ui.label(format!("unplaced = {}", layout.unplaced));
                    ui.label(format!("placed = {}", layout.placements.len()));

                    if let Some((row, col)) = self.hover_cell {
                        ui.separator();
                        let grid = &layout.grid;
                        ui.label(format!(
                            "cell ({row}, {col}): exposure {:.2} ({:.0}%){}",
                            grid.exposure(row, col),
                            grid.exposure_fraction(row, col) * 100.0,
                            if grid.is_occupied(row, col) { ", occupied" } else { "" }
                        ));
                    }
                }

                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
            });
        });
    }

    /// Builds the right-hand configuration panel. Any edit re-runs the layout.
    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Config");
                let mut changed = false;

                ui.separator();
                ui.label("Plot");
                changed |= Self::labeled_drag_f64(ui, "width (m):", &mut self.plot_width, 0.5..=100.0, 0.1);
                changed |= Self::labeled_drag_f64(ui, "height (m):", &mut self.plot_height, 0.5..=100.0, 0.1);
                changed |= Self::labeled_drag_f64(ui, "cell_size (m):", &mut self.cfg.cell_size, 0.05..=5.0, 0.01);

                ui.separator();
                ui.label("Sun");
                changed |= ui.checkbox(&mut self.fixed_sun, "fixed 12-position model").changed();
                ui.add_enabled_ui(!self.fixed_sun, |ui| {
                    changed |= Self::labeled_drag_f64(ui, "latitude (°):", &mut self.cfg.latitude, -90.0..=90.0, 0.1);
                    changed |= Self::labeled_drag_usize(
                        ui,
                        "samples_per_day:",
                        &mut self.cfg.samples_per_day,
                        1..=24,
                        1.0,
                    );
                });

                ui.separator();
                ui.label("Exposure");
                ui.horizontal(|ui| {
                    changed |= ui
                        .radio_value(&mut self.cfg.exposure_mode, ExposureMode::Weighted, "weighted")
                        .changed();
                    changed |= ui
                        .radio_value(&mut self.cfg.exposure_mode, ExposureMode::Unit, "unit")
                        .changed();
                });

                ui.separator();
                ui.label("Placement");
                changed |= Self::labeled_drag_usize(ui, "attempt_cap:", &mut self.cfg.attempt_cap, 0..=1000, 1.0);
                ui.horizontal(|ui| {
                    ui.label("seed:");
                    changed |= ui.add(egui::DragValue::new(&mut self.seed)).changed();
                });

                ui.separator();
                egui::CollapsingHeader::new(format!("Catalog ({})", self.catalog.len())).show(ui, |ui| {
                    egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                        for s in &self.catalog {
                            ui.label(format!(
                                "{}  h={:.1} m  light={:.1}",
                                s.display_name(),
                                s.max_height,
                                s.light_requirement
                            ));
                        }
                    });
                });

                ui.separator();
                if ui.button("Reset cfg to default").clicked() {
                    self.cfg = Config::default();
                    self.fixed_sun = false;
                    changed = true;
                }

                if changed {
                    self.relayout();
                }
            });
    }

    /// Builds the central panel: exposure heat map, plot outline and placements.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Pan with drag.
            if response.dragged() {
                self.pan += response.drag_delta();
            }

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(5.0, 200.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            let Some(layout) = &self.layout else {
                self.hover_cell = None;
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No layout. Press Run.",
                    egui::FontId::proportional(16.0),
                    egui::Color32::GRAY,
                );
                return;
            };
            let grid = &layout.grid;

            let hover_cell = response.hover_pos().and_then(|p| {
                let world = self.screen_to_world(p, rect).as_dvec2();
                grid.in_bounds(grid.cell_indices(world))
            });
            self.hover_cell = hover_cell;

            // Exposure heat map.
            let cs = grid.cell_size() as f32;
            for row in 0..grid.rows() {
                for col in 0..grid.cols() {
                    let min = Vec2::new(col as f32 * cs, row as f32 * cs);
                    let cell = egui::Rect::from_two_pos(
                        self.world_to_screen(min, rect),
                        self.world_to_screen(min + Vec2::splat(cs), rect),
                    );
                    painter.rect_filled(cell, 0.0, heat_color(grid.exposure_fraction(row, col)));
                }
            }

            if let Some((row, col)) = hover_cell {
                let min = Vec2::new(col as f32 * cs, row as f32 * cs);
                let cell = egui::Rect::from_two_pos(
                    self.world_to_screen(min, rect),
                    self.world_to_screen(min + Vec2::splat(cs), rect),
                );
                painter.rect_stroke(
                    cell,
                    0.0,
                    egui::Stroke::new(1.5, egui::Color32::WHITE),
                    egui::StrokeKind::Inside,
                );
            }

            // Plot outline.
            let outline = egui::Rect::from_two_pos(
                self.world_to_screen(Vec2::ZERO, rect),
                self.world_to_screen(DVec2::new(grid.width(), grid.height()).as_vec2(), rect),
            );
            painter.rect_stroke(
                outline,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::LIGHT_GRAY),
                egui::StrokeKind::Outside,
            );

            // Placed specimens.
            let r = (cs * self.zoom * 0.35).max(3.0);
            for record in &layout.placements {
                let p = self.world_to_screen(DVec2::new(record.x, record.y).as_vec2(), rect);
                painter.circle_filled(p, r, egui::Color32::from_rgb(46, 139, 87));
                painter.circle_stroke(p, r, egui::Stroke::new(1.0, egui::Color32::BLACK));

                let label = if record.kr_name.is_empty() {
                    &record.scientific_name
                } else {
                    &record.kr_name
                };
                painter.text(
                    p - egui::vec2(0.0, r + 2.0),
                    egui::Align2::CENTER_BOTTOM,
                    label,
                    egui::FontId::proportional(11.0),
                    egui::Color32::WHITE,
                );
            }
        });
    }
}

impl App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::Pos2::new(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    #[test]
    fn demo_catalog_loads() {
        let catalog = demo_catalog();
        assert_eq!(catalog.len(), 10);
        assert!(catalog.iter().all(|s| !s.common_name.is_empty()));
    }

    #[test]
    fn world_to_screen_and_back_is_roundtrip() {
        let mut viewer = Viewer::new(Vec::new());
        viewer.zoom = 40.0;
        viewer.pan = egui::vec2(15.0, -7.0);
        let rect = test_rect();

        let eps = 1e-4;
        for p in [Vec2::new(0.0, 0.0), Vec2::new(10.0, 6.0), Vec2::new(3.5, 2.25)] {
            let back = viewer.screen_to_world(viewer.world_to_screen(p, rect), rect);
            assert!(
                (back.x - p.x).abs() < eps && (back.y - p.y).abs() < eps,
                "roundtrip mismatch: p={p:?}, back={back:?}"
            );
        }
    }

    #[test]
    fn plot_centre_maps_to_rect_centre_without_pan() {
        let viewer = Viewer::new(Vec::new());
        let rect = test_rect();
        let screen = viewer.world_to_screen(Vec2::new(5.0, 3.0), rect);
        assert_eq!(screen, rect.center());

        // North is up.
        let north = viewer.world_to_screen(Vec2::new(5.0, 4.0), rect);
        assert!(north.y < screen.y);
    }

    #[test]
    fn new_runs_a_first_layout() {
        let viewer = Viewer::new(demo_catalog());
        let layout = viewer.layout.as_ref().unwrap();

        assert_eq!(layout.placements.len() + layout.unplaced, viewer.catalog.len());
        assert_eq!(layout.grid.cols(), 20);
        assert_eq!(layout.grid.rows(), 12);
        assert!(viewer.last_error.is_none());
    }

    #[test]
    fn relayout_with_same_seed_is_reproducible() {
        let mut viewer = Viewer::new(demo_catalog());
        let first = viewer.layout.clone().unwrap();

        viewer.relayout();
        let second = viewer.layout.as_ref().unwrap();

        assert_eq!(first.placements, second.placements);
        assert_eq!(viewer.cfg.seed, Some(viewer.seed));
    }

    #[test]
    fn reseed_draws_a_new_seed() {
        let mut viewer = Viewer::new(demo_catalog());
        let old = viewer.seed;
        viewer.reseed();
        assert_ne!(viewer.seed, old);
        assert!(viewer.layout.is_some());
    }

    #[test]
    fn clear_removes_layout_and_cache() {
        let mut viewer = Viewer::new(demo_catalog());
        assert!(!viewer.cache.is_empty());

        viewer.hover_cell = Some((0, 0));
        viewer.clear();

        assert!(viewer.layout.is_none());
        assert!(viewer.hover_cell.is_none());
        assert!(viewer.cache.is_empty());
    }

    #[test]
    fn invalid_config_reports_error() {
        let mut viewer = Viewer::new(demo_catalog());
        viewer.cfg.cell_size = 0.0;
        viewer.relayout();

        assert!(viewer.layout.is_none());
        assert!(viewer.last_error.as_deref().unwrap().contains("cell_size"));
    }

    #[test]
    fn fixed_sun_model_gives_twelve_samples() {
        let mut viewer = Viewer::new(demo_catalog());
        viewer.fixed_sun = true;
        viewer.cfg.latitude = 0.0;
        viewer.relayout();
        assert_eq!(viewer.layout.unwrap().suns.len(), 12);
    }

    #[test]
    fn heat_color_spans_shade_to_sun() {
        assert_eq!(heat_color(0.0), egui::Color32::from_rgb(38, 28, 64));
        assert_eq!(heat_color(1.0), egui::Color32::from_rgb(250, 222, 82));
        assert_eq!(heat_color(-3.0), heat_color(0.0));
        assert_eq!(heat_color(7.0), heat_color(1.0));
    }

    #[test]
    fn export_writes_placement_records() {
        let viewer = Viewer::new(demo_catalog());
        let layout = viewer.layout.as_ref().unwrap();
        let path = std::env::temp_dir().join(format!("placement-{}.json", std::process::id()));

        write_placements(layout, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let placements = json.as_array().unwrap();
        assert_eq!(placements.len(), layout.placements.len());
        for p in placements {
            let keys: Vec<&str> = p.as_object().unwrap().keys().map(String::as_str).collect();
            assert_eq!(keys.len(), 4);
            for key in ["scientific_name", "kr_name", "x", "y"] {
                assert!(keys.contains(&key), "missing {key}");
            }
            assert!(p["x"].is_number() && p["y"].is_number());
        }
    }
}
