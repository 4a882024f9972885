//! Save, delete, and list fiber-ready buildings.
//!
//! A successful save marks the building on the map; a successful delete
//! unmarks it. The map edit is provisional and the next viewport fetch
//! replaces it with the server's view.

#[cfg(test)]
#[path = "predisposizioni_test.rs"]
mod tests;

use tracing::{info, warn};

use super::{ServiceError, ValidationError, require_positive, require_text};
use crate::map::feature::FeatureId;
use crate::map::session::PredisposedSink;
use crate::net::api::RecordsApi;
use crate::net::types::{MessageResponse, Predisposizione, PredisposizioneCreate};

/// Reject a payload the API would refuse.
///
/// # Errors
///
/// [`ValidationError`] naming the first missing or invalid field.
pub fn validate(payload: &PredisposizioneCreate) -> Result<(), ValidationError> {
    require_positive("id", payload.id)?;
    require_text("indirizzo", &payload.indirizzo)?;
    require_text("comune", &payload.comune)?;
    Ok(())
}

/// Create or update the record for a building, then mark it on the map.
///
/// # Errors
///
/// [`ServiceError::Validation`] before any request is made, or
/// [`ServiceError::Api`] if the server rejects the save. The map is not
/// touched in either case.
pub async fn save_predisposizione(
    api: &dyn RecordsApi,
    sink: &dyn PredisposedSink,
    payload: &PredisposizioneCreate,
) -> Result<Predisposizione, ServiceError> {
    validate(payload)?;
    let saved = api.create_predisposizione(payload).await.inspect_err(|e| {
        warn!(id = payload.id, error = %e, "predisposizione save failed");
    })?;

    info!(id = saved.id, comune = ?saved.comune, "predisposizione saved");
    sink.mark_predisposed(FeatureId::from(saved.id)).await;
    Ok(saved)
}

/// Delete the record (and reset its TFOs server-side), then unmark it.
///
/// # Errors
///
/// [`ServiceError::Api`] if the delete fails; the map keeps the building
/// marked.
pub async fn delete_predisposizione(
    api: &dyn RecordsApi,
    sink: &dyn PredisposedSink,
    id: i64,
) -> Result<MessageResponse, ServiceError> {
    let response = api.delete_predisposizione(id).await.inspect_err(|e| {
        warn!(id, error = %e, "predisposizione delete failed");
    })?;

    info!(id, message = ?response.message, "predisposizione deleted");
    sink.unmark_predisposed(FeatureId::from(id)).await;
    Ok(response)
}

/// All registered buildings.
///
/// # Errors
///
/// [`ServiceError::Api`] on any request failure.
pub async fn list_predisposizioni(api: &dyn RecordsApi) -> Result<Vec<Predisposizione>, ServiceError> {
    Ok(api.list_predisposizioni().await?)
}
