//! HTTP surface: the picker panel actions and map click capture as JSON
//! endpoints, plus snapshot retrieval and the rendered view. Every mutation
//! runs to completion under one lock and returns the fresh snapshot, so
//! clients redraw from what they get back.

use crate::config::AppConfig;
use crate::geoloc::{ConfiguredLocation, LocationSource};
use crate::render;
use crate::state::{MapState, Outcome, Snapshot};
use crate::store::{CookieFile, CookieMarkerStore};
use crate::types::GeoPoint;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub struct AppState {
    pub map: Mutex<MapState<CookieMarkerStore<CookieFile>>>,
    pub location: Box<dyn LocationSource + Sync>,
    pub config: AppConfig,
}

type Shared = Arc<AppState>;
type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct ClickParams {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
pub struct NameParams {
    name: String,
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let jar = CookieFile::open(config.storage.cookie_file.clone())?;
    let store = CookieMarkerStore::new(jar);
    let map = MapState::init(store, config.storage.max_markers);
    let location = Box::new(ConfiguredLocation::from_config(&config.geolocation));

    let state = Arc::new(AppState {
        map: Mutex::new(map),
        location,
        config: config.clone(),
    });

    let mut app = Router::new()
        .route("/api/state", get(state_handler))
        .route("/api/pin", get(pin_handler))
        .route("/api/click", post(click_handler))
        .route("/api/name", post(name_handler))
        .route("/api/select", post(select_handler))
        .route("/api/locate", post(locate_handler))
        .route("/api/clear", post(clear_handler))
        .route("/map.png", get(map_png_handler));

    if let Some(asset_dir) = &config.server.asset_dir {
        app = app.nest_service("/", ServeDir::new(asset_dir));
    }

    let app = app.layer(CorsLayer::permissive()).with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    tracing::info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_point(lat: f64, lng: f64) -> Result<GeoPoint, ApiError> {
    GeoPoint::new(lat, lng).map_err(|e| (StatusCode::BAD_REQUEST, e))
}

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Request failed: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn state_handler(State(state): State<Shared>) -> Json<Snapshot> {
    let map = state.map.lock().expect("state lock");
    Json(map.snapshot())
}

/// Pin activation: which pin, if any, does a click land on.
async fn pin_handler(
    State(state): State<Shared>,
    Query(params): Query<ClickParams>,
) -> Result<Json<Option<render::PinInfo>>, ApiError> {
    let point = parse_point(params.lat, params.lng)?;
    let snapshot = state.map.lock().expect("state lock").snapshot();
    Ok(Json(render::pin_at(&state.config.map, &snapshot, point)))
}

/// A click on the map surface: create a marker there.
async fn click_handler(
    State(state): State<Shared>,
    Json(params): Json<ClickParams>,
) -> Result<Json<Outcome>, ApiError> {
    let point = parse_point(params.lat, params.lng)?;
    let mut map = state.map.lock().expect("state lock");
    let outcome = map.click(point).map_err(internal)?;
    Ok(Json(outcome))
}

/// Set the name used for the next marker creation.
async fn name_handler(State(state): State<Shared>, Json(params): Json<NameParams>) -> StatusCode {
    let mut map = state.map.lock().expect("state lock");
    map.set_pending_name(params.name);
    StatusCode::NO_CONTENT
}

/// Focus a predefined location or an existing marker by name.
async fn select_handler(
    State(state): State<Shared>,
    Json(params): Json<NameParams>,
) -> Result<Json<Snapshot>, ApiError> {
    let mut map = state.map.lock().expect("state lock");
    map.select(&params.name)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No pin named '{}'", params.name)))
}

async fn locate_handler(State(state): State<Shared>) -> Result<Json<Outcome>, ApiError> {
    let mut map = state.map.lock().expect("state lock");
    let outcome = map.locate(state.location.as_ref()).map_err(internal)?;
    Ok(Json(outcome))
}

async fn clear_handler(State(state): State<Shared>) -> Result<Json<Outcome>, ApiError> {
    let mut map = state.map.lock().expect("state lock");
    let outcome = map.clear().map_err(internal)?;
    Ok(Json(outcome))
}

/// The rendered view, centered on the current focus.
async fn map_png_handler(State(state): State<Shared>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.map.lock().expect("state lock").snapshot();
    let img = render::render_map(&state.config.map, &snapshot);

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| internal(e.into()))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], buf))
}
