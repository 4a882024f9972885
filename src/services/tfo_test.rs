use super::*;
use crate::services::test_helpers::MockRecordsApi;
use time::macros::date;

fn payload() -> TfoCreate {
    TfoCreate {
        id_abitazione: 9,
        data_predisposizione_tfo: Some(date!(2024 - 05 - 06)),
        scala: Some("A".into()),
        piano: Some("2".into()),
        interno: None,
        id_operatore: Some("OP1".into()),
        id_tfo: Some("TFO-1".into()),
        id_roe: None,
    }
}

#[test]
fn validate_requires_building_date_and_code() {
    assert_eq!(validate(&payload()), Ok(()));

    let no_building = TfoCreate { id_abitazione: 0, ..payload() };
    assert_eq!(validate(&no_building), Err(ValidationError::NotPositive { field: "id_abitazione", value: 0 }));

    let no_date = TfoCreate { data_predisposizione_tfo: None, ..payload() };
    assert_eq!(validate(&no_date), Err(ValidationError::MissingField("data_predisposizione_tfo")));

    let blank_code = TfoCreate { id_tfo: Some(" ".into()), ..payload() };
    assert_eq!(validate(&blank_code), Err(ValidationError::MissingField("id_tfo")));

    let no_code = TfoCreate { id_tfo: None, ..payload() };
    assert_eq!(validate(&no_code), Err(ValidationError::MissingField("id_tfo")));
}

#[tokio::test]
async fn create_sends_valid_payload() {
    let api = MockRecordsApi::default();
    let created = create_tfo(&api, &payload()).await.unwrap();
    assert_eq!(created.fields.id_tfo.as_deref(), Some("TFO-1"));
    assert_eq!(api.calls(), vec!["create_tfo 9"]);
}

#[tokio::test]
async fn invalid_update_makes_no_request() {
    let api = MockRecordsApi::default();
    let invalid = TfoCreate { id_tfo: None, ..payload() };

    let err = update_tfo(&api, 4, &invalid).await.unwrap_err();

    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn update_and_delete_target_the_given_id() {
    let api = MockRecordsApi::default();
    let updated = update_tfo(&api, 4, &payload()).await.unwrap();
    assert_eq!(updated.id, 4);
    delete_tfo(&api, 4).await.unwrap();
    assert_eq!(api.calls(), vec!["update_tfo 4", "delete_tfo 4"]);
}

#[tokio::test]
async fn list_rejects_non_positive_building() {
    let api = MockRecordsApi::default();
    assert!(matches!(list_tfos(&api, -1).await, Err(ServiceError::Validation(_))));
    list_tfos(&api, 9).await.unwrap();
    assert_eq!(api.calls(), vec!["list_tfos 9"]);
}

#[tokio::test]
async fn server_errors_surface_as_api_errors() {
    let api = MockRecordsApi::failing(404);
    let err = create_tfo(&api, &payload()).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP error 404");
}
