use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::auth::{
    ensure_authenticated, session_id, AuthResult, BearerToken, Session, SessionBasedResponse,
};
use crate::config::Config;
use crate::io::Mirror;
use crate::models::AttendanceRecord;
use crate::recognition::{FaceRecognizer, RandomRecognizer};
use crate::{breaks, proceeds, Error, Payload};

pub struct AppState {
    pub config: Config,
    pub sessions: Mutex<HashMap<String, Session>>,
    pub recognizer: Box<dyn FaceRecognizer>,
    mirror: Option<Arc<Mirror>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_recognizer(config, Box::new(RandomRecognizer))
    }

    pub fn with_recognizer(config: Config, recognizer: Box<dyn FaceRecognizer>) -> Self {
        let mirror = config.mirror.then(|| Mirror::new(config.mirror_path()));
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            recognizer,
            mirror,
        }
    }

    /// Runs `f` against the caller's session. Callers without a live
    /// session get the auth result back and `f` never runs.
    pub async fn with_session<V, F>(
        &self,
        token: BearerToken,
        f: F,
    ) -> Payload<SessionBasedResponse<V>>
    where
        V: Serialize,
        F: FnOnce(&mut Session) -> Result<V, Error>,
    {
        let mut sessions = self.sessions.lock().await;
        let session = match live_session(&mut sessions, &token) {
            Ok(session) => session,
            Err(auth_result) => {
                return proceeds(SessionBasedResponse {
                    auth_result,
                    value: None,
                })
            }
        };

        match f(session) {
            Ok(value) => proceeds(SessionBasedResponse {
                auth_result: AuthResult::Success,
                value: Some(value),
            }),
            Err(err) => breaks(err),
        }
    }

    /// Best-effort copy of a session's attendance to disk.
    pub fn mirror(&self, records: &[AttendanceRecord]) {
        if let Some(mirror) = &self.mirror {
            mirror.spawn(records.to_vec());
        }
    }
}

/// The caller's session if it is live, otherwise why not.
pub fn live_session<'a>(
    sessions: &'a mut HashMap<String, Session>,
    token: &BearerToken,
) -> Result<&'a mut Session, AuthResult> {
    let ssid = session_id(token);
    let auth_result = ensure_authenticated(sessions, ssid.as_deref(), Utc::now());
    if auth_result != AuthResult::Success {
        return Err(auth_result);
    }
    ssid.as_deref()
        .and_then(|ssid| sessions.get_mut(ssid))
        .ok_or(AuthResult::InvalidSession)
}
