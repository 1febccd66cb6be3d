//! Representative sun positions over a year.
//!
//! A layout is evaluated against a small fixed set of sun samples rather
//! than a continuous sky. Two strategies produce that set:
//! - [`SolarSunModel`] - declination / hour-angle solar geometry for a
//!   latitude (the default).
//! - [`FixedSunModel`] - a fixed 12-position seasonal heuristic.

use glam::DVec3;
use serde::Serialize;

use crate::config::{DEFAULT_SAMPLES_PER_DAY, REFERENCE_LATITUDE};
use crate::error::{LayoutError, Result};

pub const EARTH_AXIAL_TILT: f64 = 23.44;

/// March equinox, June solstice, September equinox, December solstice.
pub const REPRESENTATIVE_DAYS: [i32; 4] = [80, 172, 266, 355];

/// Samples closer to the horizon than this (degrees) are dropped.
///
/// Sunrise and sunset samples sit at zero elevation in exact arithmetic;
/// rounding can leave them a hair above it, where they would cast
/// full-diagonal shadows.
pub const HORIZON_TOLERANCE_DEG: f64 = 1e-6;

/// One sun sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SunPosition {
    /// Degrees above the horizon, never negative.
    pub elevation: f64,
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// Relative intensity in `[0, 1]`.
    pub weight: f64,
}

impl SunPosition {
    /// Builds a sample with the `sin(elevation)` intensity proxy.
    pub fn new(elevation: f64, azimuth: f64) -> Self {
        Self {
            elevation,
            azimuth,
            weight: elevation.to_radians().sin().max(0.0),
        }
    }
}

/// A source of sun samples for a layout run.
pub trait SunModel {
    fn positions(&self) -> Result<Vec<SunPosition>>;
}

/// Latitude-driven solar geometry sampled on four days of the year.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolarSunModel {
    pub latitude: f64,
    pub samples_per_day: usize,
}

impl Default for SolarSunModel {
    fn default() -> Self {
        Self {
            latitude: REFERENCE_LATITUDE,
            samples_per_day: DEFAULT_SAMPLES_PER_DAY,
        }
    }
}

impl SunModel for SolarSunModel {
    fn positions(&self) -> Result<Vec<SunPosition>> {
        solar_positions(self.latitude, self.samples_per_day)
    }
}

/// Four seasons times morning / noon / afternoon, independent of latitude.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FixedSunModel;

impl SunModel for FixedSunModel {
    fn positions(&self) -> Result<Vec<SunPosition>> {
        let mut out = Vec::with_capacity(12);
        for season in 0..4 {
            let base = 15.0 + 15.0 * season as f64;
            out.push(SunPosition::new(base, 90.0));
            out.push(SunPosition::new(base + 30.0, 180.0));
            out.push(SunPosition::new(base + 15.0, 270.0));
        }
        Ok(out)
    }
}

/// Solar declination in degrees for a day of year.
pub fn solar_declination(day_of_year: i32) -> f64 {
    EARTH_AXIAL_TILT * (360.0 * (284 + day_of_year) as f64 / 365.0).to_radians().sin()
}

/// Sunset hour angle in degrees.
///
/// Falls back to a half-day span (90°) when the sun never rises or never
/// sets on that day, i.e. when the arccos argument leaves `[-1, 1]`.
pub fn sunset_hour_angle(latitude: f64, declination: f64) -> f64 {
    let cos_ws = -latitude.to_radians().tan() * declination.to_radians().tan();
    if (-1.0..=1.0).contains(&cos_ws) {
        cos_ws.acos().to_degrees()
    } else {
        90.0
    }
}

/// Solar elevation in degrees above the horizon.
pub fn solar_elevation(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let (lat, dec, ha) = (
        latitude.to_radians(),
        declination.to_radians(),
        hour_angle.to_radians(),
    );
    let sin_el = lat.sin() * dec.sin() + lat.cos() * dec.cos() * ha.cos();
    sin_el.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Solar azimuth in degrees clockwise from north, in `[0, 360)`.
///
/// The atan2 form keeps morning (east) and afternoon (west) apart.
pub fn solar_azimuth(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let (lat, dec, ha) = (
        latitude.to_radians(),
        declination.to_radians(),
        hour_angle.to_radians(),
    );
    let sin_az = -dec.cos() * ha.sin();
    let cos_az = dec.sin() * lat.cos() - dec.cos() * lat.sin() * ha.cos();
    sin_az.atan2(cos_az).to_degrees().rem_euclid(360.0)
}

/// Evenly spaced hour angles over `[-span, span]`, endpoints included.
fn hour_angles(span: f64, samples: usize) -> impl Iterator<Item = f64> {
    (0..samples).map(move |i| {
        if samples == 1 {
            0.0
        } else {
            -span + 2.0 * span * i as f64 / (samples - 1) as f64
        }
    })
}

/// Sun samples above the horizon for `latitude`, in day then hour order.
///
/// ### Errors
/// [`LayoutError::DegenerateSunGeometry`] if the latitude is not a valid
/// finite angle, `samples_per_day` is zero, or no sample clears the horizon.
pub fn solar_positions(latitude: f64, samples_per_day: usize) -> Result<Vec<SunPosition>> {
    let degenerate = || LayoutError::DegenerateSunGeometry {
        latitude,
        samples_per_day,
    };
    if !latitude.is_finite() || latitude.abs() > 90.0 || samples_per_day == 0 {
        return Err(degenerate());
    }

    let mut out = Vec::with_capacity(REPRESENTATIVE_DAYS.len() * samples_per_day);
    for day in REPRESENTATIVE_DAYS {
        let decl = solar_declination(day);
        let span = sunset_hour_angle(latitude, decl);
        for ha in hour_angles(span, samples_per_day) {
            let elevation = solar_elevation(latitude, decl, ha);
            if elevation < HORIZON_TOLERANCE_DEG {
                continue;
            }
            let azimuth = solar_azimuth(latitude, decl, ha);
            out.push(SunPosition::new(elevation, azimuth));
        }
    }

    if out.is_empty() {
        return Err(degenerate());
    }
    tracing::debug!(latitude, samples_per_day, kept = out.len(), "computed sun positions");
    Ok(out)
}

/// Solar samples at the reference latitude with the default sample count.
pub fn default_sun_positions() -> Result<Vec<SunPosition>> {
    SolarSunModel::default().positions()
}

/// Unit vector toward the sun; `z` is up, `y` north, `x` east.
pub fn sun_vector(pos: &SunPosition) -> DVec3 {
    let el = pos.elevation.to_radians();
    let az = pos.azimuth.to_radians();
    DVec3::new(el.cos() * az.sin(), el.cos() * az.cos(), el.sin())
}

/// Sun vectors for a whole sample set, in the same order.
pub fn sun_vectors(positions: &[SunPosition]) -> Vec<DVec3> {
    positions.iter().map(sun_vector).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn declination_peaks_near_solstices() {
        assert_relative_eq!(solar_declination(172), 23.44, epsilon = 0.1);
        assert_relative_eq!(solar_declination(355), -23.44, epsilon = 0.1);
        assert!(solar_declination(80).abs() < 1.0);
    }

    #[test]
    fn sunset_hour_angle_is_quarter_turn_at_equator_and_equinox() {
        assert_relative_eq!(sunset_hour_angle(0.0, 0.0), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn sunset_hour_angle_falls_back_for_polar_day_and_night() {
        assert_eq!(sunset_hour_angle(80.0, 23.0), 90.0);
        assert_eq!(sunset_hour_angle(80.0, -23.0), 90.0);
    }

    #[test]
    fn noon_elevation_matches_colatitude_plus_declination() {
        let el = solar_elevation(40.0, 10.0, 0.0);
        assert_relative_eq!(el, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn azimuth_separates_morning_and_afternoon() {
        let morning = solar_azimuth(40.0, 0.0, -45.0);
        let afternoon = solar_azimuth(40.0, 0.0, 45.0);
        assert!(morning > 0.0 && morning < 180.0, "morning az {morning}");
        assert!(afternoon > 180.0 && afternoon < 360.0, "afternoon az {afternoon}");
        assert_relative_eq!(solar_azimuth(40.0, 0.0, 0.0), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn default_positions_keep_three_samples_per_day() {
        let positions = default_sun_positions().unwrap();

        assert_eq!(positions.len(), 12);
        for p in &positions {
            assert!(p.elevation >= 0.0);
            assert!((0.0..=1.0).contains(&p.weight));
            assert_relative_eq!(p.weight, p.elevation.to_radians().sin(), epsilon = 1e-12);
        }
    }

    #[test]
    fn positions_are_deterministic() {
        let a = solar_positions(51.0, 7).unwrap();
        let b = solar_positions(51.0, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_sample_is_solar_noon() {
        let positions = solar_positions(37.5, 1).unwrap();

        assert_eq!(positions.len(), 4);
        for p in &positions {
            assert_relative_eq!(p.azimuth, 180.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn polar_summer_still_produces_samples() {
        let positions = solar_positions(89.0, 5).unwrap();
        assert!(!positions.is_empty());
        assert!(positions.iter().all(|p| p.elevation >= 0.0));
    }

    #[test]
    fn invalid_inputs_are_degenerate() {
        for (lat, n) in [(f64::NAN, 5), (91.0, 5), (-120.0, 5), (40.0, 0)] {
            let err = solar_positions(lat, n).unwrap_err();
            assert!(matches!(err, LayoutError::DegenerateSunGeometry { .. }));
        }
    }

    #[test]
    fn fixed_model_yields_twelve_weighted_positions() {
        let positions = FixedSunModel.positions().unwrap();

        assert_eq!(positions.len(), 12);
        assert_eq!(positions[1], SunPosition::new(45.0, 180.0));
        assert_relative_eq!(positions[0].weight, 15f64.to_radians().sin(), epsilon = 1e-12);
    }

    #[test]
    fn sun_vector_components() {
        let overhead = sun_vector(&SunPosition::new(90.0, 0.0));
        assert_relative_eq!(overhead.z, 1.0, epsilon = 1e-12);
        assert!(overhead.x.abs() < 1e-12 && overhead.y.abs() < 1e-12);

        let east = sun_vector(&SunPosition::new(0.0, 90.0));
        assert_relative_eq!(east.x, 1.0, epsilon = 1e-12);
        assert!(east.y.abs() < 1e-12 && east.z.abs() < 1e-12);

        let v = sun_vector(&SunPosition::new(30.0, 200.0));
        assert_relative_eq!(v.length(), 1.0, epsilon = 1e-12);
    }
}
