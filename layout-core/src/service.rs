//! Request-level entry point: catalog records and plot size in, placement
//! records and the final exposure grid out.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::grid::ExposureGrid;
use crate::placement::{PlacementEngine, PlacementRecord};
use crate::shadow::ShadowPathCache;
use crate::specimen::{Specimen, validate_all};
use crate::sun::{SolarSunModel, SunModel, SunPosition};

/// A layout job, as posted by a client.
#[derive(Clone, Debug, Deserialize)]
pub struct LayoutRequest {
    /// Plot width in metres (x axis).
    pub width: f64,
    /// Plot depth in metres (y axis).
    pub height: f64,
    pub plants: Vec<Specimen>,
    #[serde(flatten)]
    pub config: Config,
}

/// Result of a layout job.
#[derive(Clone, Debug, Serialize)]
pub struct LayoutResponse {
    pub placements: Vec<PlacementRecord>,
    /// Number of specimens that found no feasible cell.
    pub unplaced: usize,
    #[serde(skip)]
    pub suns: Vec<SunPosition>,
    /// Final exposure grid, for heat-map rendering.
    #[serde(skip)]
    pub grid: ExposureGrid,
}

/// Builds an RNG from the configured seed, or from OS entropy without one.
pub fn rng_for(config: &Config) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Places `specimens` on a `width` x `height` plot under the solar model
/// configured in `config`.
///
/// ### Errors
/// Fails before any placement if the plot dimensions, the sun geometry or a
/// specimen are invalid. Unplaceable specimens are counted, not errors.
pub fn layout_specimens(
    width: f64,
    height: f64,
    specimens: &[Specimen],
    config: &Config,
    cache: &mut ShadowPathCache,
) -> Result<LayoutResponse> {
    let model = SolarSunModel {
        latitude: config.latitude,
        samples_per_day: config.samples_per_day,
    };
    layout_with_model(width, height, specimens, config, &model, cache)
}

/// Like [`layout_specimens`], with the sun samples taken from `model`.
pub fn layout_with_model<M: SunModel + ?Sized>(
    width: f64,
    height: f64,
    specimens: &[Specimen],
    config: &Config,
    model: &M,
    cache: &mut ShadowPathCache,
) -> Result<LayoutResponse> {
    validate_all(specimens)?;
    let suns = model.positions()?;

    let mut grid = ExposureGrid::new(width, height, config.cell_size, config.exposure_mode)?;
    grid.initialize_exposure(&suns);
    tracing::info!(
        rows = grid.rows(),
        cols = grid.cols(),
        suns = suns.len(),
        specimens = specimens.len(),
        "starting layout"
    );

    let mut rng = rng_for(config);
    let report = PlacementEngine::new(config.attempt_cap)
        .place_plants(&mut grid, &suns, specimens, cache, &mut rng);

    Ok(LayoutResponse {
        placements: report.records(),
        unplaced: report.unplaced.len(),
        suns,
        grid,
    })
}

/// Runs a whole [`LayoutRequest`] with a fresh shadow cache.
pub fn run_layout(request: &LayoutRequest) -> Result<LayoutResponse> {
    let mut cache = ShadowPathCache::new();
    layout_specimens(
        request.width,
        request.height,
        &request.plants,
        &request.config,
        &mut cache,
    )
}

/// Parses a JSON request body and runs it.
pub fn run_layout_json(body: &str) -> Result<LayoutResponse> {
    let request: LayoutRequest = serde_json::from_str(body)?;
    run_layout(&request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;

    const BODY: &str = r#"{
        "width": 6,
        "height": 4,
        "seed": 99,
        "plants": [
            { "scientific_name": "Pinus densiflora", "kr_name": "소나무", "max_height_m": 3, "light_requirement_1_5": 4 },
            { "학명": "Hosta plantaginea", "국명": "옥잠화", "최대높이(m)": "0.5", "필요광량(1-5)": "2" },
            { "scientific_name": "Acer palmatum", "max_height_m": 2, "light_requirement_1_5": 3 }
        ]
    }"#;

    #[test]
    fn json_request_round_trips_to_placements() {
        let response = run_layout_json(BODY).unwrap();

        assert_eq!(response.placements.len() + response.unplaced, 3);
        assert_eq!(response.grid.cols(), 12);
        assert_eq!(response.grid.rows(), 8);
        assert_eq!(response.suns.len(), 12);
        for p in &response.placements {
            assert!(p.x > 0.0 && p.x < 6.0);
            assert!(p.y > 0.0 && p.y < 4.0);
        }

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("placements").is_some());
        assert!(json.get("grid").is_none());
    }

    #[test]
    fn seeded_requests_are_reproducible() {
        let a = run_layout_json(BODY).unwrap();
        let b = run_layout_json(BODY).unwrap();
        assert_eq!(a.placements, b.placements);
        assert_eq!(a.grid.exposures(), b.grid.exposures());
    }

    #[test]
    fn config_fields_flatten_into_the_request() {
        let request: LayoutRequest = serde_json::from_str(
            r#"{ "width": 2, "height": 2, "plants": [], "cell_size": 1.0, "attempt_cap": 5 }"#,
        )
        .unwrap();

        assert_eq!(request.config.cell_size, 1.0);
        assert_eq!(request.config.attempt_cap, 5);
        assert_eq!(request.config.seed, None);

        let response = run_layout(&request).unwrap();
        assert!(response.placements.is_empty());
        assert_eq!(response.unplaced, 0);
    }

    #[test]
    fn bad_dimensions_fail_fast() {
        let err = run_layout_json(r#"{ "width": 0, "height": 2, "plants": [] }"#).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDimension { name: "width", .. }));
    }

    #[test]
    fn huge_plot_is_rejected_not_allocated() {
        let err = run_layout_json(r#"{ "width": 1e12, "height": 1e12, "plants": [] }"#).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidDimension { .. }));
    }

    #[test]
    fn bad_latitude_is_degenerate_geometry() {
        let err = run_layout_json(r#"{ "width": 2, "height": 2, "plants": [], "latitude": 200 }"#)
            .unwrap_err();
        assert!(matches!(err, LayoutError::DegenerateSunGeometry { .. }));
    }

    #[test]
    fn malformed_body_is_a_json_error() {
        let err = run_layout_json(r#"{ "width": "wide" }"#).unwrap_err();
        assert!(matches!(err, LayoutError::Json(_)));
    }

    #[test]
    fn fixed_model_ignores_latitude() {
        let plants = vec![Specimen::new("a", 1.0, 0.0)];
        let config = Config {
            latitude: 200.0,
            seed: Some(4),
            ..Config::default()
        };
        let mut cache = ShadowPathCache::new();

        let response =
            layout_with_model(3.0, 3.0, &plants, &config, &crate::sun::FixedSunModel, &mut cache)
                .unwrap();

        assert_eq!(response.suns.len(), 12);
        assert_eq!(response.placements.len(), 1);
    }

    #[test]
    fn invalid_specimen_is_rejected_before_placement() {
        let plants = vec![Specimen::new("bad", -1.0, 1.0)];
        let mut cache = ShadowPathCache::new();
        let err = layout_specimens(3.0, 3.0, &plants, &Config::default(), &mut cache).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidSpecimen { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn shared_cache_is_reused_across_runs() {
        let plants = vec![Specimen::new("a", 2.0, 0.0), Specimen::new("b", 2.0, 0.0)];
        let config = Config {
            seed: Some(1),
            ..Config::default()
        };
        let mut cache = ShadowPathCache::new();

        layout_specimens(5.0, 5.0, &plants, &config, &mut cache).unwrap();
        layout_specimens(5.0, 5.0, &plants, &config, &mut cache).unwrap();

        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 3);
    }
}
