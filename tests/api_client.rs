//! `ApiClient` against a local axum server standing in for the REST API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use fibramap::config::MapConfig;
use fibramap::map::feature::FeatureId;
use fibramap::map::fetcher::{BboxQuery, FeatureFetcher, GeometryKind};
use fibramap::map::layer_store::StoreState;
use fibramap::map::session::spawn_session;
use fibramap::map::viewport::{Bounds, LatLng, Viewport};
use fibramap::net::types::PredisposizioneCreate;
use fibramap::net::{ApiClient, ApiError, RecordsApi};
use fibramap::services::predisposizioni::save_predisposizione;

// =============================================================================
// MOCK SERVER
// =============================================================================

async fn bbox(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Polygon", "coordinates": [[[13.40, 42.35], [13.401, 42.35], [13.40, 42.35]]] },
                "properties": {
                    "id": 5,
                    "predisposto_fibra": true,
                    "echo_zoom": params.get("zoom"),
                    "echo_geometry_type": params.get("geometry_type"),
                    "echo_west": params.get("west")
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [13.4005, 42.35] },
                "properties": { "is_centroid": true, "parent_id": 5, "predisposto_fibra": true }
            }
        ]
    }))
}

async fn create_predisposizione(Json(body): Json<Value>) -> impl IntoResponse {
    let mut row = body;
    row["predisposto_fibra"] = json!(true);
    (StatusCode::CREATED, Json(row))
}

async fn delete_predisposizione(Path(id): Path<i64>) -> impl IntoResponse {
    if id == 3 {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Predisposizione 3 non trovata" })));
    }
    (StatusCode::OK, Json(json!({ "status": "success", "message": format!("Predisposizione ID {id} eliminata") })))
}

async fn list_tfos(Path(id): Path<i64>) -> Json<Value> {
    Json(json!([{
        "id": 1,
        "id_abitazione": id,
        "data_predisposizione_tfo": "2024-05-06",
        "id_tfo": "TFO-1",
        "indirizzo": "Via Roma 1"
    }]))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "features": [] }))
}

fn router() -> Router {
    Router::new()
        .route("/", get(|| async { Json(json!({ "message": "API attiva" })) }))
        .route("/geojson/bbox", get(bbox))
        .route("/predisposizioni", post(create_predisposizione))
        .route("/predisposizioni/{id}", delete(delete_predisposizione))
        .route("/tfos/predisposizioni/{id}/tfos", get(list_tfos))
        .route("/tfos/{id}", delete(|| async { StatusCode::NO_CONTENT }))
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client_for(router: Router) -> ApiClient {
    let base = spawn_server(router).await;
    let config = MapConfig::default().with_base_url(&base).unwrap();
    ApiClient::new(&config).unwrap()
}

fn query() -> BboxQuery {
    BboxQuery { bounds: Bounds::new(13.39, 42.34, 13.41, 42.36), zoom: 16, geometry: GeometryKind::Both }
}

fn payload(id: i64) -> PredisposizioneCreate {
    serde_json::from_value(json!({
        "id": id,
        "indirizzo": "Via Roma 1",
        "comune": "L'Aquila",
        "data_predisposizione": "2024-03-01"
    }))
    .unwrap()
}

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn health_reads_message() {
    let client = client_for(router()).await;
    let health = client.health().await.unwrap();
    assert_eq!(health.message.as_deref(), Some("API attiva"));
}

#[tokio::test]
async fn bbox_sends_bounds_zoom_and_geometry_type() {
    let client = client_for(router()).await;

    let collection = client.fetch_features_in_bounds(&query()).await.unwrap();

    assert_eq!(collection.features.len(), 2);
    let props = &collection.features[0].properties;
    assert_eq!(props["echo_zoom"], "16");
    assert_eq!(props["echo_geometry_type"], "both");
    assert_eq!(props["echo_west"], "13.39");
}

#[tokio::test]
async fn server_error_uses_status_fallback() {
    let router = Router::new().route("/geojson/bbox", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }));
    let client = client_for(router).await;

    let err = client.fetch_features_in_bounds(&query()).await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 502, .. }));
    assert_eq!(err.to_string(), "HTTP error 502");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let router = Router::new().route("/geojson/bbox", get(|| async { Json(json!({ "features": 12 })) }));
    let client = client_for(router).await;

    let err = client.fetch_features_in_bounds(&query()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let base = spawn_server(Router::new().route("/geojson/bbox", get(slow))).await;
    let config = MapConfig { fetch_timeout: Duration::from_secs(1), ..MapConfig::default() }
        .with_base_url(&base)
        .unwrap();
    let client = ApiClient::new(&config).unwrap();

    let err = client.fetch_features_in_bounds(&query()).await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout { secs: 1 }));
}

#[tokio::test]
async fn create_accepts_201_and_decodes_row() {
    let client = client_for(router()).await;
    let saved = client.create_predisposizione(&payload(9)).await.unwrap();
    assert_eq!(saved.id, 9);
    assert_eq!(saved.predisposto_fibra, Some(true));
    assert_eq!(saved.comune.as_deref(), Some("L'Aquila"));
}

#[tokio::test]
async fn delete_not_found_surfaces_detail() {
    let client = client_for(router()).await;

    let err = client.delete_predisposizione(3).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Predisposizione 3 non trovata");

    let ok = client.delete_predisposizione(4).await.unwrap();
    assert_eq!(ok.status.as_deref(), Some("success"));
}

#[tokio::test]
async fn no_content_delete_is_empty_message() {
    let client = client_for(router()).await;
    let response = client.delete_tfo(8).await.unwrap();
    assert_eq!(response.message, None);
}

#[tokio::test]
async fn tfo_list_decodes_joined_rows() {
    let client = client_for(router()).await;
    let tfos = client.list_tfos(9).await.unwrap();
    assert_eq!(tfos.len(), 1);
    assert_eq!(tfos[0].fields.id_abitazione, 9);
    assert_eq!(tfos[0].fields.id_tfo.as_deref(), Some("TFO-1"));
    assert_eq!(tfos[0].indirizzo.as_deref(), Some("Via Roma 1"));
}

#[tokio::test]
async fn session_loads_and_save_marks_building() {
    let base = spawn_server(router()).await;
    let config = MapConfig::default().with_base_url(&base).unwrap();
    let client = Arc::new(ApiClient::new(&config).unwrap());
    let viewport = Viewport::from_center(LatLng::new(42.35, 13.40), 16, 800, 600);

    let (handle, _join) = spawn_session(client.clone(), &config, viewport);
    let mut updates = handle.subscribe();
    let status = tokio::time::timeout(
        Duration::from_secs(5),
        updates.wait_for(|s| s.state == StoreState::Populated && !s.loading),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(status.layers, 2);
    assert_eq!(status.predisposed, 1);

    save_predisposizione(client.as_ref(), &handle, &payload(9)).await.unwrap();
    assert_eq!(handle.status().predisposed, 2);
    assert_eq!(handle.mark(FeatureId::from(5)).await.unwrap(), 2);
}
