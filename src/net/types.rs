//! REST record types for building predisposition and TFO endpoints.
//!
//! Dates travel as ISO `YYYY-MM-DD` strings. Read models are lenient (the
//! backing rows allow nulls); create payloads carry exactly what the API
//! requires.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use time::Date;
use time::format_description::well_known::Iso8601;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

// =============================================================================
// PREDISPOSIZIONI
// =============================================================================

/// A building registered as fiber-ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predisposizione {
    pub id: i64,
    #[serde(default)]
    pub indirizzo: Option<String>,
    #[serde(default)]
    pub comune: Option<String>,
    #[serde(default)]
    pub codice_catastale: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub data_predisposizione: Option<Date>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub uso_edificio: Option<String>,
    #[serde(default)]
    pub codice_belfiore: Option<String>,
    #[serde(default)]
    pub predisposto_fibra: Option<bool>,
}

/// Payload for `POST /predisposizioni`. `id` is the building identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredisposizioneCreate {
    pub id: i64,
    pub indirizzo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uso_edificio: Option<String>,
    pub comune: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codice_belfiore: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codice_catastale: Option<String>,
    #[serde(with = "iso_date")]
    pub data_predisposizione: Date,
}

// =============================================================================
// TFO
// =============================================================================

/// Payload for `POST /tfos` and `PUT /tfos/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TfoCreate {
    pub id_abitazione: i64,
    #[serde(default, with = "iso_date::option")]
    pub data_predisposizione_tfo: Option<Date>,
    #[serde(default)]
    pub scala: Option<String>,
    #[serde(default)]
    pub piano: Option<String>,
    #[serde(default)]
    pub interno: Option<String>,
    #[serde(default)]
    pub id_operatore: Option<String>,
    #[serde(default)]
    pub id_tfo: Option<String>,
    #[serde(default)]
    pub id_roe: Option<String>,
}

/// A termination point as stored, joined with its building row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tfo {
    pub id: i64,
    #[serde(flatten)]
    pub fields: TfoCreate,
    #[serde(default)]
    pub indirizzo: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub codice_catastale: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub data_predisposizione: Option<Date>,
}

// =============================================================================
// MISC
// =============================================================================

/// Body of delete confirmations and the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Parse an ISO `YYYY-MM-DD` date as used on the wire.
///
/// # Errors
///
/// Returns the underlying parse error when `raw` is not a calendar date.
pub fn parse_iso_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), &Iso8601::DATE)
}
