use std::collections::HashMap;
use std::sync::Arc;

use axum::headers::authorization::Bearer;
use axum::headers::Authorization;
use axum::{Extension, Json, TypedHeader};
use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use serde::{Serialize, Serializer};
use serde_with::skip_serializing_none;
use sha2::{Digest, Sha256};

use crate::models::{LoginCredentials, Role, User};
use crate::scan::ScanSession;
use crate::state::AppState;
use crate::store::AttendanceStore;
use crate::{breaks, proceeds, Error, Payload};

pub type BearerToken = Option<TypedHeader<Authorization<Bearer>>>;

#[derive(Debug, Clone, Eq, Ord, PartialOrd, PartialEq)]
pub enum AuthResult {
    Success,
    SessionExpired,
    InvalidSession,
}

impl Serialize for AuthResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:?}", self))
    }
}

/// One logged-in browser: its store and, for faculty, the scan run in
/// progress.
#[derive(Debug)]
pub struct Session {
    pub store: AttendanceStore,
    pub scan: Option<ScanSession>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn user(&self) -> Result<&User, Error> {
        self.store
            .current_user()
            .ok_or_else(|| Error::AuthenticationFailure {
                message: "Session has no logged in user!".to_string(),
            })
    }

    pub fn require_staff(&self) -> Result<&User, Error> {
        let user = self.user()?;
        match user.role {
            Role::Faculty | Role::Admin => Ok(user),
            Role::Student => Err(Error::forbidden("Only faculty can take attendance!")),
        }
    }
}

pub fn generate_session_id() -> String {
    let ssid_bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(&ssid_bytes);
    let result = hasher.finalize();
    hex::encode(result)
}

pub fn session_id(token: &BearerToken) -> Option<String> {
    token
        .as_ref()
        .map(|TypedHeader(authorization)| authorization.token().to_string())
}

/// Looks the session up, dropping it if it has expired.
pub fn ensure_authenticated(
    sessions: &mut HashMap<String, Session>,
    session_id: Option<&str>,
    now: DateTime<Utc>,
) -> AuthResult {
    let ssid = match session_id {
        Some(ssid) if !ssid.is_empty() => ssid,
        _ => return AuthResult::InvalidSession,
    };
    let expires_at = match sessions.get(ssid) {
        Some(session) => session.expires_at,
        None => return AuthResult::InvalidSession,
    };
    if now.gt(&expires_at) {
        if let Some(mut session) = sessions.remove(ssid) {
            session.store.logout();
        }
        log::debug!("Session {} expired at {}", ssid, expires_at);
        return AuthResult::SessionExpired;
    }
    AuthResult::Success
}

/// Drops every session whose lifetime has run out, whether or not anyone
/// asks for it again.
pub fn sweep_expired(sessions: &mut HashMap<String, Session>, now: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| !now.gt(&session.expires_at));
    let dropped = before - sessions.len();
    if dropped > 0 {
        log::debug!("Dropped {} expired sessions", dropped);
    }
    dropped
}

pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(credentials): Json<LoginCredentials>,
) -> Payload<LoggedIn> {
    let mut store = AttendanceStore::new();
    if !store.login(&credentials) {
        log::warn!("Failed login for {:?}", credentials.email);
        return breaks(Error::AuthenticationFailure {
            message: "Invalid credentials".to_string(),
        });
    }
    let user = match store.current_user() {
        Some(user) => user.clone(),
        None => return breaks(Error::unknown("Login did not produce a user")),
    };

    let now = Utc::now();
    let expires_at = match now.checked_add_signed(state.config.session_ttl) {
        Some(expires_at) => expires_at,
        None => return breaks(Error::unknown("Session lifetime is out of range")),
    };

    let ssid = generate_session_id();
    let mut sessions = state.sessions.lock().await;
    sweep_expired(&mut sessions, now);
    sessions.insert(
        ssid.clone(),
        Session {
            store,
            scan: None,
            expires_at,
        },
    );
    drop(sessions);
    log::info!("{} logged in as {:?}", user.email, user.role);

    proceeds(LoggedIn {
        session_id: ssid,
        user,
        expires_at,
    })
}

pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    token: BearerToken,
) -> Payload<SessionBasedResponse<SessionDropped>> {
    let ssid = session_id(&token);
    let mut sessions = state.sessions.lock().await;
    let auth_result = ensure_authenticated(&mut sessions, ssid.as_deref(), Utc::now());
    if auth_result != AuthResult::Success {
        return proceeds(SessionBasedResponse {
            auth_result,
            value: None,
        });
    }

    let dropped = ssid.and_then(|ssid| sessions.remove(&ssid));
    let email = dropped.map(|mut session| {
        let email = session.store.current_user().map(|u| u.email.clone());
        session.store.logout();
        email
    });
    if let Some(Some(email)) = &email {
        log::info!("{} logged out", email);
    }

    proceeds(SessionBasedResponse {
        auth_result,
        value: Some(SessionDropped {
            drop_success: email.is_some(),
        }),
    })
}

pub async fn me(
    Extension(state): Extension<Arc<AppState>>,
    token: BearerToken,
) -> Payload<SessionBasedResponse<User>> {
    state
        .with_session(token, |session| session.user().cloned())
        .await
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDropped {
    pub drop_success: bool,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct SessionBasedResponse<V> {
    pub auth_result: AuthResult,
    pub value: Option<V>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedIn {
    pub session_id: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}
