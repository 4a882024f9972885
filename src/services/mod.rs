//! Record workflows used by the CLI and any other front end.
//!
//! ARCHITECTURE
//! ============
//! Service functions validate input, call the REST API through the
//! [`RecordsApi`](crate::net::RecordsApi) trait, and on success notify the
//! map through a [`PredisposedSink`](crate::map::PredisposedSink). A
//! failed round-trip never reaches the sink, so the map only reflects
//! changes the server accepted.

pub mod predisposizioni;
pub mod tfo;

use crate::net::error::ApiError;

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("`{0}` is required")]
    MissingField(&'static str),
    #[error("`{field}` must be a positive identifier (got {value})")]
    NotPositive { field: &'static str, value: i64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { Err(ValidationError::MissingField(field)) } else { Ok(()) }
}

pub(crate) fn require_positive(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value > 0 { Ok(()) } else { Err(ValidationError::NotPositive { field, value }) }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::map::feature::FeatureId;
    use crate::map::session::PredisposedSink;
    use crate::net::api::RecordsApi;
    use crate::net::error::ApiError;
    use crate::net::types::{MessageResponse, Predisposizione, PredisposizioneCreate, Tfo, TfoCreate};

    /// Records every call; fails all of them when `fail_with` is set.
    #[derive(Default)]
    pub struct MockRecordsApi {
        pub calls: Mutex<Vec<String>>,
        pub fail_with: Option<u16>,
    }

    impl MockRecordsApi {
        pub fn failing(status: u16) -> Self {
            Self { fail_with: Some(status), ..Self::default() }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            match self.fail_with {
                Some(status) => Err(ApiError::Status { status, message: format!("HTTP error {status}") }),
                None => Ok(()),
            }
        }
    }

    pub fn saved_row(payload: &PredisposizioneCreate) -> Predisposizione {
        Predisposizione {
            id: payload.id,
            indirizzo: Some(payload.indirizzo.clone()),
            comune: Some(payload.comune.clone()),
            codice_catastale: payload.codice_catastale.clone(),
            data_predisposizione: Some(payload.data_predisposizione),
            lat: payload.lat,
            lon: payload.lon,
            uso_edificio: payload.uso_edificio.clone(),
            codice_belfiore: payload.codice_belfiore.clone(),
            predisposto_fibra: Some(true),
        }
    }

    fn stored_tfo(id: i64, payload: &TfoCreate) -> Tfo {
        Tfo {
            id,
            fields: payload.clone(),
            indirizzo: None,
            lat: None,
            lon: None,
            codice_catastale: None,
            data_predisposizione: None,
        }
    }

    #[async_trait]
    impl RecordsApi for MockRecordsApi {
        async fn list_predisposizioni(&self) -> Result<Vec<Predisposizione>, ApiError> {
            self.record("list_predisposizioni".into())?;
            Ok(Vec::new())
        }

        async fn create_predisposizione(&self, payload: &PredisposizioneCreate) -> Result<Predisposizione, ApiError> {
            self.record(format!("create_predisposizione {}", payload.id))?;
            Ok(saved_row(payload))
        }

        async fn delete_predisposizione(&self, id: i64) -> Result<MessageResponse, ApiError> {
            self.record(format!("delete_predisposizione {id}"))?;
            Ok(MessageResponse { status: Some("success".into()), message: Some(format!("deleted {id}")) })
        }

        async fn list_tfos(&self, building_id: i64) -> Result<Vec<Tfo>, ApiError> {
            self.record(format!("list_tfos {building_id}"))?;
            Ok(Vec::new())
        }

        async fn create_tfo(&self, payload: &TfoCreate) -> Result<Tfo, ApiError> {
            self.record(format!("create_tfo {}", payload.id_abitazione))?;
            Ok(stored_tfo(1, payload))
        }

        async fn update_tfo(&self, id: i64, payload: &TfoCreate) -> Result<Tfo, ApiError> {
            self.record(format!("update_tfo {id}"))?;
            Ok(stored_tfo(id, payload))
        }

        async fn delete_tfo(&self, id: i64) -> Result<MessageResponse, ApiError> {
            self.record(format!("delete_tfo {id}"))?;
            Ok(MessageResponse::default())
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<(bool, FeatureId)>>,
    }

    impl RecordingSink {
        /// `(marked, id)` pairs in call order.
        pub fn events(&self) -> Vec<(bool, FeatureId)> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PredisposedSink for RecordingSink {
        async fn mark_predisposed(&self, id: FeatureId) {
            self.events.lock().unwrap().push((true, id));
        }

        async fn unmark_predisposed(&self, id: FeatureId) {
            self.events.lock().unwrap().push((false, id));
        }
    }
}
