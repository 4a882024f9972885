//! Fiber termination points (TFO) of a predisposed building.

#[cfg(test)]
#[path = "tfo_test.rs"]
mod tests;

use tracing::info;

use super::{ServiceError, ValidationError, require_positive, require_text};
use crate::net::api::RecordsApi;
use crate::net::types::{MessageResponse, Tfo, TfoCreate};

/// A TFO needs its building, an install date, and its code.
///
/// # Errors
///
/// [`ValidationError`] naming the first missing or invalid field.
pub fn validate(payload: &TfoCreate) -> Result<(), ValidationError> {
    require_positive("id_abitazione", payload.id_abitazione)?;
    if payload.data_predisposizione_tfo.is_none() {
        return Err(ValidationError::MissingField("data_predisposizione_tfo"));
    }
    require_text("id_tfo", payload.id_tfo.as_deref().unwrap_or_default())?;
    Ok(())
}

/// TFOs registered on one building.
///
/// # Errors
///
/// [`ServiceError::Api`] on any request failure.
pub async fn list_tfos(api: &dyn RecordsApi, building_id: i64) -> Result<Vec<Tfo>, ServiceError> {
    require_positive("id_abitazione", building_id)?;
    Ok(api.list_tfos(building_id).await?)
}

/// # Errors
///
/// [`ServiceError::Validation`] before any request, or [`ServiceError::Api`].
pub async fn create_tfo(api: &dyn RecordsApi, payload: &TfoCreate) -> Result<Tfo, ServiceError> {
    validate(payload)?;
    let created = api.create_tfo(payload).await?;
    info!(id = created.id, building = created.fields.id_abitazione, "tfo created");
    Ok(created)
}

/// # Errors
///
/// [`ServiceError::Validation`] before any request, or [`ServiceError::Api`].
pub async fn update_tfo(api: &dyn RecordsApi, id: i64, payload: &TfoCreate) -> Result<Tfo, ServiceError> {
    require_positive("id", id)?;
    validate(payload)?;
    let updated = api.update_tfo(id, payload).await?;
    info!(id, building = updated.fields.id_abitazione, "tfo updated");
    Ok(updated)
}

/// # Errors
///
/// [`ServiceError::Api`] on any request failure.
pub async fn delete_tfo(api: &dyn RecordsApi, id: i64) -> Result<MessageResponse, ServiceError> {
    let response = api.delete_tfo(id).await?;
    info!(id, "tfo deleted");
    Ok(response)
}
