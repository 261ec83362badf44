//! Search configuration: loading, validation, and expansion into the
//! per-day search batch.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Valid bounds per numeric search parameter, checked before any scraping.
const RANGE_LIMITS: &[(&str, f64, f64)] = &[
    ("price_min", 0.0, 10000.0),
    ("price_max", 0.0, 10000.0),
    ("price_multiplier", 1.0, 20.0),
    ("star_rating_min", 1.0, 5.0),
    ("star_rating_max", 1.0, 5.0),
    ("guest_rating_min", 1.0, 9.0),
    ("guest_rating_max", 1.0, 9.0),
    ("distance_centre", 0.0, 50.0),
    ("rooms", 1.0, 10.0),
    ("adults", 1.0, 10.0),
    ("children", 0.0, 20.0),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("must specify {0}")]
    MissingKey(&'static str),
    #[error("{name} is out of range: {value} [{min} <= {name} <= {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{name} has unusable value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// One entry of the search config file, as written on disk.
///
/// Scalars may arrive as JSON numbers or as strings; strings are coerced
/// through [`recast`]. `null` and the literal `"None"` both mean unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub destination: Option<Destination>,
    #[serde(default)]
    pub checkin_datetime: Option<Value>,
    #[serde(default)]
    pub checkout_datetime: Option<Value>,
    #[serde(default)]
    pub price_min: Option<Value>,
    #[serde(default)]
    pub price_max: Option<Value>,
    #[serde(default)]
    pub price_multiplier: Option<Value>,
    #[serde(default)]
    pub star_rating_min: Option<Value>,
    #[serde(default)]
    pub star_rating_max: Option<Value>,
    #[serde(default)]
    pub guest_rating_min: Option<Value>,
    #[serde(default)]
    pub guest_rating_max: Option<Value>,
    #[serde(default)]
    pub distance_centre: Option<Value>,
    #[serde(default)]
    pub rooms: Option<Value>,
    #[serde(default)]
    pub adults: Option<Value>,
    #[serde(default)]
    pub children: Option<Value>,
    #[serde(default)]
    pub currency: Option<Value>,
    #[serde(default)]
    pub nights: Option<Value>,
    #[serde(default)]
    pub search_span: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A validated search entry with defaults applied, ready for expansion.
#[derive(Debug, Clone)]
pub struct SearchPlan {
    pub city: String,
    pub state: String,
    pub country: String,
    pub checkin_datetime: Option<DateTime<Utc>>,
    pub checkout_datetime: Option<DateTime<Utc>>,
    pub price_min: i64,
    pub price_max: i64,
    pub price_multiplier: i64,
    pub star_rating_min: i64,
    pub star_rating_max: i64,
    pub guest_rating_min: i64,
    pub guest_rating_max: i64,
    pub distance_centre: Option<f64>,
    pub rooms: i64,
    pub adults: i64,
    pub children: i64,
    pub currency: String,
    pub nights: i64,
    pub search_span: u32,
}

/// One concrete search to execute, with resolved check-in/check-out dates.
#[derive(Debug, Clone)]
pub struct Search {
    pub city: String,
    pub state: String,
    pub country: String,
    pub checkin_datetime: DateTime<Utc>,
    pub checkout_datetime: DateTime<Utc>,
    pub price_min: i64,
    pub price_max: i64,
    pub price_multiplier: i64,
    pub star_rating_min: i64,
    pub star_rating_max: i64,
    pub guest_rating_min: i64,
    pub guest_rating_max: i64,
    pub distance_centre: Option<f64>,
    pub rooms: i64,
    pub adults: i64,
    pub children: i64,
    pub currency: String,
    /// 1-based position within the plan's search span.
    pub ordinal: u32,
}

/// Load and validate the search config file.
pub fn load_search_plans(path: &str) -> Result<Vec<SearchPlan>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading search config {:?}", path))?;
    let configs: Vec<SearchConfig> =
        serde_json::from_str(&raw).context("search config is not a JSON array of searches")?;
    configs
        .iter()
        .map(|c| c.resolve().map_err(Into::into))
        .collect()
}

impl SearchConfig {
    /// Apply defaults, coerce scalars, and range-check every parameter.
    pub fn resolve(&self) -> Result<SearchPlan, ConfigError> {
        let destination = self
            .destination
            .as_ref()
            .ok_or(ConfigError::MissingKey("destination"))?;
        let city = required_text(&destination.city, "destination.city")?;
        let state = required_text(&destination.state, "destination.state")?;
        let country = required_text(&destination.country, "destination.country")?;

        let plan = SearchPlan {
            city,
            state,
            country,
            checkin_datetime: datetime_field("checkin_datetime", &self.checkin_datetime)?,
            checkout_datetime: datetime_field("checkout_datetime", &self.checkout_datetime)?,
            price_min: int_field("price_min", &self.price_min, 0)?,
            price_max: int_field("price_max", &self.price_max, 10000)?,
            price_multiplier: int_field("price_multiplier", &self.price_multiplier, 1)?,
            star_rating_min: int_field("star_rating_min", &self.star_rating_min, 1)?,
            star_rating_max: int_field("star_rating_max", &self.star_rating_max, 5)?,
            guest_rating_min: int_field("guest_rating_min", &self.guest_rating_min, 1)?,
            guest_rating_max: int_field("guest_rating_max", &self.guest_rating_max, 9)?,
            distance_centre: float_field("distance_centre", &self.distance_centre)?,
            rooms: int_field("rooms", &self.rooms, 1)?,
            adults: int_field("adults", &self.adults, 2)?,
            children: int_field("children", &self.children, 0)?,
            currency: text_field("currency", &self.currency, "USD")?,
            nights: int_field("nights", &self.nights, 1)?,
            search_span: int_field("search_span", &self.search_span, 182)?.max(0) as u32,
        };
        plan.validate()?;
        Ok(plan)
    }
}

impl SearchPlan {
    fn validate(&self) -> Result<(), ConfigError> {
        for &(name, min, max) in RANGE_LIMITS {
            if let Some(value) = self.range_value(name) {
                if value < min || value > max {
                    return Err(ConfigError::OutOfRange {
                        name,
                        value,
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Current value per range-checked parameter name. `distance_centre`
    /// is the only one allowed to be unset.
    fn range_value(&self, name: &str) -> Option<f64> {
        match name {
            "price_min" => Some(self.price_min as f64),
            "price_max" => Some(self.price_max as f64),
            "price_multiplier" => Some(self.price_multiplier as f64),
            "star_rating_min" => Some(self.star_rating_min as f64),
            "star_rating_max" => Some(self.star_rating_max as f64),
            "guest_rating_min" => Some(self.guest_rating_min as f64),
            "guest_rating_max" => Some(self.guest_rating_max as f64),
            "distance_centre" => self.distance_centre,
            "rooms" => Some(self.rooms as f64),
            "adults" => Some(self.adults as f64),
            "children" => Some(self.children as f64),
            _ => None,
        }
    }
}

/// Expand a plan into its search span: one search per day offset, with a
/// 1-based ordinal.
///
/// An unset check-in starts at `now` plus the ordinal; a configured
/// check-in advances by one day per ordinal from its own date. Check-out
/// defaults to check-in plus the plan's nights.
pub fn expand(plan: &SearchPlan, now: DateTime<Utc>) -> Vec<Search> {
    (1..=plan.search_span)
        .map(|ordinal| {
            let checkin = match plan.checkin_datetime {
                Some(t) => t + Duration::days(i64::from(ordinal) - 1),
                None => now + Duration::days(i64::from(ordinal)),
            };
            let checkout = plan
                .checkout_datetime
                .unwrap_or_else(|| checkin + Duration::days(plan.nights));
            Search {
                city: plan.city.clone(),
                state: plan.state.clone(),
                country: plan.country.clone(),
                checkin_datetime: checkin,
                checkout_datetime: checkout,
                price_min: plan.price_min,
                price_max: plan.price_max,
                price_multiplier: plan.price_multiplier,
                star_rating_min: plan.star_rating_min,
                star_rating_max: plan.star_rating_max,
                guest_rating_min: plan.guest_rating_min,
                guest_rating_max: plan.guest_rating_max,
                distance_centre: plan.distance_centre,
                rooms: plan.rooms,
                adults: plan.adults,
                children: plan.children,
                currency: plan.currency.clone(),
                ordinal,
            }
        })
        .collect()
}

// ── Scalar coercion ──

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Coerce a raw string: the first of integer, float, or raw text that
/// parses wins.
pub(crate) fn recast(raw: &str) -> Scalar {
    if let Ok(n) = raw.parse::<i64>() {
        return Scalar::Int(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Scalar::Float(f);
    }
    Scalar::Text(raw.to_string())
}

/// Config scalar from JSON. `null`, `"None"`, and the empty string all
/// read as unset.
fn scalar(value: &Value) -> Option<Scalar> {
    match value {
        Value::Null => None,
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Int)
            .or_else(|| n.as_f64().map(Scalar::Float)),
        Value::String(s) if s == "None" || s.is_empty() => None,
        Value::String(s) => Some(recast(s)),
        _ => None,
    }
}

fn required_text(
    value: &Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(ConfigError::MissingKey(name)),
    }
}

fn int_field(
    name: &'static str,
    value: &Option<Value>,
    default: i64,
) -> Result<i64, ConfigError> {
    match value.as_ref().and_then(scalar) {
        None => Ok(default),
        Some(Scalar::Int(n)) => Ok(n),
        Some(Scalar::Float(f)) if f.fract() == 0.0 => Ok(f as i64),
        Some(other) => Err(invalid(name, &other)),
    }
}

fn float_field(
    name: &'static str,
    value: &Option<Value>,
) -> Result<Option<f64>, ConfigError> {
    match value.as_ref().and_then(scalar) {
        None => Ok(None),
        Some(Scalar::Int(n)) => Ok(Some(n as f64)),
        Some(Scalar::Float(f)) => Ok(Some(f)),
        Some(other) => Err(invalid(name, &other)),
    }
}

fn text_field(
    name: &'static str,
    value: &Option<Value>,
    default: &str,
) -> Result<String, ConfigError> {
    match value.as_ref().and_then(scalar) {
        None => Ok(default.to_string()),
        Some(Scalar::Text(s)) => Ok(s),
        Some(other) => Err(invalid(name, &other)),
    }
}

fn datetime_field(
    name: &'static str,
    value: &Option<Value>,
) -> Result<Option<DateTime<Utc>>, ConfigError> {
    match value.as_ref().and_then(scalar) {
        None => Ok(None),
        Some(Scalar::Text(s)) => parse_datetime(&s)
            .map(Some)
            .ok_or_else(|| ConfigError::Invalid {
                name,
                value: s.clone(),
            }),
        Some(other) => Err(invalid(name, &other)),
    }
}

fn invalid(name: &'static str, scalar: &Scalar) -> ConfigError {
    let value = match scalar {
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s.clone(),
    };
    ConfigError::Invalid { name, value }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, or a
/// bare `YYYY-MM-DD` date (taken as midnight UTC).
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// ── Tests ──
