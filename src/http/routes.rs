//! Demo routes.

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::event::{LogEvent, RequestMeta, fields};

use super::{AppError, AppState};

/// Body accepted by `POST /api/users`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/error", get(simulate_error))
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

async fn home(State(state): State<AppState>, Extension(meta): Extension<RequestMeta>) -> Json<Value> {
    state.emitter.log(LogEvent::route(
        &meta,
        "/",
        "home_page_accessed",
        "Home page accessed",
    ));
    Json(json!({
        "message": "Welcome to Express Logger App",
        "timestamp": now_iso(),
    }))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(meta): Extension<RequestMeta>,
) -> Json<Value> {
    state.emitter.log(LogEvent::api(
        &meta,
        "/api/users",
        "fetch_users",
        "Fetching users list",
    ));
    Json(json!({
        "users": ["John", "Jane", "Bob"],
        "timestamp": now_iso(),
    }))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(meta): Extension<RequestMeta>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    // A body sent without a JSON content type is treated as empty.
    let user = match payload {
        Ok(Json(user)) => user,
        Err(JsonRejection::MissingJsonContentType(_)) => NewUser::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let label = user.name.as_deref().unwrap_or("(unnamed)");
    state.emitter.log(
        LogEvent::api(
            &meta,
            "/api/users",
            "create_user",
            format!("Creating new user: {label}"),
        )
        .with_field(fields::USER_DATA, json!({ "name": user.name })),
    );
    Ok(Json(json!({
        "success": true,
        "user": { "name": user.name, "id": rand::random::<f64>() },
        "timestamp": now_iso(),
    })))
}

async fn simulate_error(
    State(state): State<AppState>,
    Extension(meta): Extension<RequestMeta>,
) -> Response {
    state.emitter.log(LogEvent::route_error(
        &meta,
        "/api/error",
        "simulate_error",
        "Simulated error occurred",
    ));
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "This is a simulated error",
            "timestamp": now_iso(),
        })),
    )
        .into_response()
}
