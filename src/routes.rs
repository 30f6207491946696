use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::headers::UserAgent;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, TypedHeader};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{BearerToken, Session, SessionBasedResponse};
use crate::err::Fine;
use crate::models::{
    AttendanceRecord, Class, LearningTask, MarkAttendance, NewClass, Role, Student, User,
};
use crate::recognition::recognize_attendance;
use crate::scan::{export_file_name, ScanOutcome, ScanSession, ScanStats, ScannedStudent};
use crate::state::{live_session, AppState};
use crate::stats::{self, ClassDayStats, ScheduleDay, StudentSummary};
use crate::{qr, Error, Payload};

type Shared = Extension<Arc<AppState>>;

fn class_not_found(class_id: &str) -> Error {
    Error::ClassNotFound {
        message: format!("Class `{}` does not exist!", class_id),
    }
}

/// Students only get to look at themselves.
fn ensure_may_view(user: &User, student_id: &str) -> Result<(), Error> {
    if user.role == Role::Student && user.id != student_id {
        return Err(Error::forbidden("Students can only view their own attendance!"));
    }
    Ok(())
}

pub async fn list_classes(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<Vec<Class>>> {
    state
        .with_session(token, |session| Ok(session.store.classes().to_vec()))
        .await
}

pub async fn taught_classes(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<Vec<Class>>> {
    state
        .with_session(token, |session| {
            let user = session.user()?;
            Ok(session
                .store
                .classes_taught_by(&user.name)
                .into_iter()
                .cloned()
                .collect())
        })
        .await
}

pub async fn add_class(
    Extension(state): Shared,
    token: BearerToken,
    Json(class): Json<NewClass>,
) -> Payload<SessionBasedResponse<Class>> {
    state
        .with_session(token, |session| {
            session.require_staff()?;
            if class.name.trim().is_empty() {
                return Err(Error::InvalidPayload {
                    message: "`name` parameter was empty".to_string(),
                });
            }
            Ok(session.store.add_class(class))
        })
        .await
}

pub async fn class_attendance(
    Extension(state): Shared,
    token: BearerToken,
    Path(class_id): Path<String>,
) -> Payload<SessionBasedResponse<Vec<AttendanceRecord>>> {
    state
        .with_session(token, |session| {
            session.require_staff()?;
            Ok(session.store.get_attendance_by_class(&class_id))
        })
        .await
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

pub async fn class_stats(
    Extension(state): Shared,
    token: BearerToken,
    Path(class_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Payload<SessionBasedResponse<ClassDayStats>> {
    state
        .with_session(token, |session| {
            let class = session
                .store
                .find_class(&class_id)
                .ok_or_else(|| class_not_found(&class_id))?;
            let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
            Ok(stats::class_day_stats(class, session.store.attendance_records(), date))
        })
        .await
}

pub async fn list_students(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<Vec<Student>>> {
    state
        .with_session(token, |session| Ok(session.store.students().to_vec()))
        .await
}

pub async fn schedule(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<Vec<ScheduleDay>>> {
    state
        .with_session(token, |session| {
            let user = session.user()?;
            Ok(stats::weekly_schedule(&session.store, &user.id))
        })
        .await
}

pub async fn student_attendance(
    Extension(state): Shared,
    token: BearerToken,
    Path(student_id): Path<String>,
) -> Payload<SessionBasedResponse<Vec<AttendanceRecord>>> {
    state
        .with_session(token, |session| {
            ensure_may_view(session.user()?, &student_id)?;
            Ok(session.store.get_attendance_by_student(&student_id))
        })
        .await
}

pub async fn attendance_summary(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<StudentSummary>> {
    state
        .with_session(token, |session| {
            let user = session.user()?;
            Ok(stats::student_summary(&session.store, &user.id))
        })
        .await
}

pub async fn mark_attendance(
    Extension(state): Shared,
    token: BearerToken,
    Json(input): Json<MarkAttendance>,
) -> Payload<SessionBasedResponse<AttendanceRecord>> {
    state
        .with_session(token, |session| {
            session.require_staff()?;
            let record = session.store.mark_attendance(input);
            state.mirror(session.store.attendance_records());
            Ok(record)
        })
        .await
}

pub async fn list_tasks(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<Vec<LearningTask>>> {
    state
        .with_session(token, |session| Ok(session.store.learning_tasks().to_vec()))
        .await
}

pub async fn toggle_task(
    Extension(state): Shared,
    token: BearerToken,
    Path(task_id): Path<String>,
) -> Payload<SessionBasedResponse<Vec<LearningTask>>> {
    state
        .with_session(token, |session| {
            session.store.toggle_task_completion(&task_id);
            Ok(session.store.learning_tasks().to_vec())
        })
        .await
}

#[derive(Debug, Clone, Serialize)]
pub struct QrCode {
    pub payload: String,
}

pub async fn student_qr(
    Extension(state): Shared,
    token: BearerToken,
    Path(student_id): Path<String>,
) -> Payload<SessionBasedResponse<QrCode>> {
    state
        .with_session(token, |session| {
            ensure_may_view(session.user()?, &student_id)?;
            Ok(QrCode {
                payload: session.store.generate_student_qr(&student_id),
            })
        })
        .await
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawQr {
    pub raw: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QrValidity {
    pub valid: bool,
    pub payload: Option<qr::QrPayload>,
}

pub async fn validate_qr(
    Extension(state): Shared,
    token: BearerToken,
    Json(body): Json<RawQr>,
) -> Payload<SessionBasedResponse<QrValidity>> {
    state
        .with_session(token, |_| {
            let payload = qr::parse_qr(&body.raw);
            Ok(QrValidity {
                valid: payload.is_some(),
                payload,
            })
        })
        .await
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanView {
    pub class_id: String,
    pub active: bool,
    pub scanned: Vec<ScannedStudent>,
    pub stats: ScanStats,
}

fn scan_view(session: &Session, active: bool) -> Result<ScanView, Error> {
    let scan = session.scan.as_ref().ok_or_else(no_scan_session)?;
    Ok(ScanView {
        class_id: scan.class_id().to_string(),
        active,
        scanned: scan.scanned().to_vec(),
        stats: scan.stats(&session.store),
    })
}

fn no_scan_session() -> Error {
    Error::NoScanSession {
        message: "No attendance session is running!".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScan {
    pub class_id: String,
}

pub async fn start_scan(
    Extension(state): Shared,
    token: BearerToken,
    Json(body): Json<StartScan>,
) -> Payload<SessionBasedResponse<ScanView>> {
    let grace = state.config.late_grace;
    state
        .with_session(token, |session| {
            session.require_staff()?;
            if session.store.find_class(&body.class_id).is_none() {
                return Err(class_not_found(&body.class_id));
            }
            session.scan = Some(ScanSession::start(body.class_id, grace));
            scan_view(session, true)
        })
        .await
}

pub async fn scan(
    Extension(state): Shared,
    token: BearerToken,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(body): Json<RawQr>,
) -> Payload<SessionBasedResponse<ScanOutcome>> {
    let device_info = json!({
        "userAgent": user_agent.as_ref().map(|TypedHeader(ua)| ua.as_str()),
        "timestamp": Utc::now(),
    });
    state
        .with_session(token, |session| {
            session.require_staff()?;
            let scan = session.scan.as_mut().ok_or_else(no_scan_session)?;
            let outcome = scan.scan(&mut session.store, &body.raw, Local::now(), device_info)?;
            if let ScanOutcome::Marked { .. } = outcome {
                state.mirror(session.store.attendance_records());
            }
            Ok(outcome)
        })
        .await
}

pub async fn scan_status(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<ScanView>> {
    state
        .with_session(token, |session| {
            session.require_staff()?;
            scan_view(session, true)
        })
        .await
}

pub async fn reset_scan(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<ScanView>> {
    state
        .with_session(token, |session| {
            session.require_staff()?;
            session.scan.as_mut().ok_or_else(no_scan_session)?.reset();
            scan_view(session, true)
        })
        .await
}

pub async fn end_scan(
    Extension(state): Shared,
    token: BearerToken,
) -> Payload<SessionBasedResponse<ScanView>> {
    state
        .with_session(token, |session| {
            session.require_staff()?;
            let view = scan_view(session, false)?;
            session.scan = None;
            Ok(view)
        })
        .await
}

pub async fn export_scan(Extension(state): Shared, token: BearerToken) -> Response {
    let mut sessions = state.sessions.lock().await;
    let session = match live_session(&mut sessions, &token) {
        Ok(session) => session,
        Err(auth_result) => {
            return Fine(SessionBasedResponse::<()> {
                auth_result,
                value: None,
            })
            .into_response()
        }
    };

    match export(session) {
        Ok((file_name, body)) => (
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn export(session: &Session) -> Result<(String, String), Error> {
    session.require_staff()?;
    let scan = session.scan.as_ref().ok_or_else(no_scan_session)?;
    let class = session
        .store
        .find_class(scan.class_id())
        .ok_or_else(|| class_not_found(scan.class_id()))?;
    let date = Utc::now().date_naive();
    Ok((export_file_name(class, date), scan.export_csv()?))
}

pub async fn face_attendance(
    Extension(state): Shared,
    token: BearerToken,
    Path(class_id): Path<String>,
) -> Payload<SessionBasedResponse<AttendanceRecord>> {
    state
        .with_session(token, |session| {
            session.require_staff()?;
            let today = Utc::now().date_naive();
            let recognizer = &*state.recognizer;
            let record = recognize_attendance(&mut session.store, recognizer, &class_id, today)?;
            state.mirror(session.store.attendance_records());
            Ok(record)
        })
        .await
}
