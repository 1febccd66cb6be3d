//! Plant specimens and catalog loading.
//!
//! Catalog records come from spreadsheets exported with either English or
//! Korean column names, and with numbers that are often strings. The serde
//! attributes below accept both spellings and both representations.

use std::io::Read;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{LayoutError, Result};

/// Light requirement assumed when a record leaves it blank (1–5 scale).
pub const DEFAULT_LIGHT_REQUIREMENT: f64 = 3.0;

/// Root depth range in centimetres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RootDepth {
    pub min: f64,
    pub max: f64,
}

/// One plant to be placed. Read-only to the placement engine.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Specimen {
    #[serde(default, alias = "학명")]
    pub scientific_name: String,
    #[serde(rename = "kr_name", default, alias = "국명")]
    pub common_name: String,
    #[serde(default, alias = "생활형")]
    pub life_form: String,
    /// Mature height in metres.
    #[serde(
        rename = "max_height_m",
        alias = "최대높이(m)",
        default,
        deserialize_with = "lenient_height"
    )]
    pub max_height: f64,
    #[serde(
        rename = "root_depth_cm_range",
        alias = "뿌리깊이(cm·범위)",
        default,
        deserialize_with = "root_depth"
    )]
    pub root_depth: RootDepth,
    /// Minimum cell exposure this specimen needs.
    #[serde(
        rename = "light_requirement_1_5",
        alias = "필요광량(1-5)",
        default = "default_light_requirement",
        deserialize_with = "lenient_light_requirement"
    )]
    pub light_requirement: f64,
    #[serde(
        rename = "lifespan_yr",
        alias = "전형수명(년)",
        default,
        deserialize_with = "lenient_lifespan"
    )]
    pub lifespan_years: u32,
}

impl Specimen {
    /// A specimen with just the fields placement cares about.
    pub fn new(scientific_name: impl Into<String>, max_height: f64, light_requirement: f64) -> Self {
        Self {
            scientific_name: scientific_name.into(),
            common_name: String::new(),
            life_form: String::new(),
            max_height,
            root_depth: RootDepth::default(),
            light_requirement,
            lifespan_years: 0,
        }
    }

    /// Common name when known, otherwise the scientific name.
    pub fn display_name(&self) -> &str {
        if self.common_name.is_empty() {
            &self.scientific_name
        } else {
            &self.common_name
        }
    }

    /// Rejects heights and light requirements that are negative or not finite.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason| LayoutError::InvalidSpecimen {
            name: self.display_name().to_owned(),
            reason,
        };
        if !self.max_height.is_finite() || self.max_height < 0.0 {
            return Err(invalid("height must be a non-negative number"));
        }
        if !self.light_requirement.is_finite() || self.light_requirement < 0.0 {
            return Err(invalid("light requirement must be a non-negative number"));
        }
        Ok(())
    }
}

fn default_light_requirement() -> f64 {
    DEFAULT_LIGHT_REQUIREMENT
}

/// Reads a number written either as a JSON number or as a string.
/// Blank strings and `null` read as `None`.
fn lenient_number<E: serde::de::Error>(value: Option<Value>) -> std::result::Result<Option<f64>, E> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| E::custom(format!("number {n} out of range"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| E::custom(format!("expected a number, got `{s}`"))),
        Some(other) => Err(E::custom(format!("expected a number, got {other}"))),
    }
}

fn lenient_height<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(lenient_number::<D::Error>(Option::<Value>::deserialize(d)?)?.unwrap_or(0.0))
}

fn lenient_light_requirement<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<f64, D::Error> {
    Ok(lenient_number::<D::Error>(Option::<Value>::deserialize(d)?)?.unwrap_or(DEFAULT_LIGHT_REQUIREMENT))
}

fn lenient_lifespan<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let years = lenient_number::<D::Error>(Option::<Value>::deserialize(d)?)?.unwrap_or(0.0);
    if !years.is_finite() || years < 0.0 {
        return Err(serde::de::Error::custom(format!("lifespan must be non-negative, got {years}")));
    }
    Ok(years as u32)
}

/// Accepts `"30-100"`, `"50"`, `[30, 100]`, `50` or blank.
fn root_depth<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<RootDepth, D::Error> {
    use serde::de::Error;

    let single = |v: f64| RootDepth { min: v, max: v };
    match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => {
            let nums = items
                .into_iter()
                .map(|v| lenient_number::<D::Error>(Some(v)).map(|n| n.unwrap_or(0.0)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            match nums.as_slice() {
                [] => Ok(RootDepth::default()),
                [v] => Ok(single(*v)),
                [min, max] => Ok(RootDepth { min: *min, max: *max }),
                _ => Err(D::Error::custom("root depth range takes at most two values")),
            }
        }
        Some(Value::String(s)) => {
            let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
            // Split on the first dash after the leading character so a
            // negative lower bound is not mistaken for a separator.
            match compact.get(1..).and_then(|rest| rest.find('-')).map(|i| i + 1) {
                Some(split) => {
                    let min = lenient_number::<D::Error>(Some(Value::String(compact[..split].into())))?;
                    let max = lenient_number::<D::Error>(Some(Value::String(compact[split + 1..].into())))?;
                    Ok(RootDepth {
                        min: min.unwrap_or(0.0),
                        max: max.unwrap_or(0.0),
                    })
                }
                None => Ok(single(
                    lenient_number::<D::Error>(Some(Value::String(compact)))?.unwrap_or(0.0),
                )),
            }
        }
        other => Ok(single(lenient_number::<D::Error>(other)?.unwrap_or(0.0))),
    }
}

/// Parses a JSON array of catalog records and validates each specimen.
pub fn load_catalog_json(json: &str) -> Result<Vec<Specimen>> {
    let specimens: Vec<Specimen> = serde_json::from_str(json)?;
    validate_all(&specimens)?;
    tracing::debug!(count = specimens.len(), "loaded catalog");
    Ok(specimens)
}

/// Like [`load_catalog_json`], reading from any byte source.
pub fn load_catalog_reader<R: Read>(reader: R) -> Result<Vec<Specimen>> {
    let specimens: Vec<Specimen> = serde_json::from_reader(reader)?;
    validate_all(&specimens)?;
    tracing::debug!(count = specimens.len(), "loaded catalog");
    Ok(specimens)
}

pub fn validate_all(specimens: &[Specimen]) -> Result<()> {
    specimens.iter().try_for_each(Specimen::validate)
}
