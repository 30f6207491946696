pub mod auth;
pub mod config;
pub mod err;
pub mod io;
pub mod models;
pub mod qr;
pub mod recognition;
pub mod routes;
pub mod scan;
pub mod seed;
pub mod state;
pub mod stats;
pub mod store;

use std::sync::Arc;

use axum::handler::Handler;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;

pub use crate::err::Error;
use crate::err::{Fine, Maybe, Nothing};
use crate::state::AppState;

pub type Payload<T> = Result<Json<Maybe<T>>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V> where V: Serialize {
    Ok(Json(Fine(value)))
}

pub fn breaks<V>(err: Error) -> Payload<V> where V: Serialize {
    Ok(Json(Nothing(err)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/classes", get(routes::list_classes).post(routes::add_class))
        .route("/classes/:class/attendance", get(routes::class_attendance))
        .route("/classes/:class/stats", get(routes::class_stats))
        .route("/students", get(routes::list_students))
        .route("/schedule", get(routes::schedule))
        .route("/teaching/classes", get(routes::taught_classes))
        .route("/attendance", post(routes::mark_attendance))
        .route("/attendance/summary", get(routes::attendance_summary))
        .route("/attendance/student/:student", get(routes::student_attendance))
        .route("/tasks", get(routes::list_tasks))
        .route("/tasks/:task/toggle", post(routes::toggle_task))
        .route("/qr", post(routes::validate_qr))
        .route("/qr/:student", get(routes::student_qr))
        .route("/scan", get(routes::scan_status).post(routes::scan))
        .route("/scan/start", post(routes::start_scan))
        .route("/scan/reset", post(routes::reset_scan))
        .route("/scan/end", post(routes::end_scan))
        .route("/scan/export", get(routes::export_scan))
        .route("/face/:class", post(routes::face_attendance))
        .fallback(err::handler404.into_service())
        .layer(Extension(state))
}
