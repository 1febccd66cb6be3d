//! Application entry point for the planting layout viewer.
//!
//! Usage: `layout-view [catalog.json]`. Without a catalog path, or if the
//! file cannot be read, a small built-in demo catalog is used.

mod viewer;

use std::fs::File;
use std::io::BufReader;

use layout_core::Specimen;
use layout_core::specimen::load_catalog_reader;
use tracing_subscriber::EnvFilter;
use viewer::Viewer;

/// Reads a JSON catalog from `path`.
fn load_catalog(path: &str) -> Result<Vec<Specimen>, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    Ok(load_catalog_reader(BufReader::new(file))?)
}

/// Starts the native eframe application.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if eframe fails to create the native window or event loop.
fn main() -> eframe::Result<()> {
    // Default to INFO level if RUST_LOG is not set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let catalog = match std::env::args().nth(1) {
        Some(path) => match load_catalog(&path) {
            Ok(catalog) => {
                tracing::info!(%path, count = catalog.len(), "catalog loaded");
                catalog
            }
            Err(err) => {
                tracing::error!(%path, error = %err, "could not load catalog, using demo");
                viewer::demo_catalog()
            }
        },
        None => viewer::demo_catalog(),
    };

    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "Planting Layout",
        options,
        Box::new(|_cc| Ok(Box::new(Viewer::new(catalog)))),
    )
}
