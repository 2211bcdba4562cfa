use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::api::user_management::models::{AdminUser, User, UserLoggedIn, UserOut};
use crate::db::DbConn;
use crate::error::ApiError;
use crate::schema;
use crate::settings::Settings;
use diesel::prelude::*;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rocket::http::Status;
use rocket::outcome::{try_outcome, IntoOutcome};
use rocket::request::{self, FromRequest, Outcome};
use rocket::Request;
use serde::{Deserialize, Serialize};

pub(crate) const SESSION_COOKIE: &str = "session";

#[derive(Serialize, Deserialize)]
pub(crate) struct SessionCookie {
    pub(crate) session_key: String,
    pub(crate) creation_time: SystemTime,
}

impl SessionCookie {
    pub(crate) fn is_expired(&self, max_age: Duration) -> bool {
        match self.creation_time.elapsed() {
            Ok(age) => age > max_age,
            // Creation time in the future: clock went backwards.
            Err(_) => true,
        }
    }
}

/// Session key → user id.
pub struct UserSession {
    sessions: Mutex<HashMap<String, i32>>,
}

impl UserSession {
    pub fn new() -> UserSession {
        UserSession {
            sessions: Mutex::new(HashMap::<String, i32>::new()),
        }
    }

    pub(crate) fn start(&self, user_id: i32) -> Result<String, ApiError> {
        let session_key = generate_session_key();
        self.sessions
            .lock()
            .map_err(|_| ApiError::new("Couldn't update user session".to_string()))?
            .insert(session_key.clone(), user_id);
        Ok(session_key)
    }

    pub(crate) fn user_id(&self, session_key: &str) -> Option<i32> {
        self.sessions.lock().ok()?.get(session_key).copied()
    }

    pub(crate) fn end(&self, session_key: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.remove(session_key);
        }
    }

    /// Drops every session of a user, e.g. after deactivation.
    pub(crate) fn end_all_for(&self, user_id: i32) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.retain(|_, uid| *uid != user_id);
        }
    }
}

impl Default for UserSession {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn generate_session_key() -> String {
    const LEN: usize = 32;

    generate_token(LEN)
}

pub(crate) fn generate_token(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserLoggedIn {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let session_cookie = try_outcome!(req
            .cookies()
            .get_private(SESSION_COOKIE)
            .or_forward(Status::Unauthorized));

        let session_cookie_value =
            try_outcome!(serde_json::from_str::<SessionCookie>(session_cookie.value())
                .map_err(|_| ApiError::new("Couldn't parse session".to_string()))
                .or_forward(Status::Unauthorized));

        let max_age_days = req
            .rocket()
            .state::<Settings>()
            .map(|settings| settings.session_max_age_days)
            .unwrap_or(30);
        if session_cookie_value.is_expired(Duration::from_secs(60 * 60 * 24 * max_age_days)) {
            return Outcome::Error((
                Status { code: 401 },
                ApiError::new("Session too old".to_string()),
            ));
        }

        let user_id = try_outcome!(req
            .rocket()
            .state::<UserSession>()
            .and_then(|sessions| sessions.user_id(&session_cookie_value.session_key))
            .or_forward(Status::Unauthorized));

        let conn = try_outcome!(req.guard::<DbConn>().await.map_error(|_| {
            (
                Status { code: 500 },
                ApiError::new("Couldn't get database connection".to_string()),
            )
        }));

        let user = try_outcome!(conn
            .run(move |c| {
                use schema::users::dsl::*;
                users
                    .find(user_id)
                    .first::<User>(c)
                    .map_err(|_| ApiError::new("User not in database".to_string()))
            })
            .await
            .or_forward(Status::Unauthorized));

        if !user.is_active {
            return Outcome::Forward(Status::Unauthorized);
        }

        Outcome::Success(UserLoggedIn(UserOut::from(user)))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let user = try_outcome!(req.guard::<UserLoggedIn>().await);

        if !user.0.is_admin() {
            return Outcome::Error((
                Status { code: 403 },
                ApiError::new("Admin privileges required".to_string()),
            ));
        }

        Outcome::Success(AdminUser(user.0))
    }
}
