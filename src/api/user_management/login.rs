use std::time::SystemTime;

use crate::api::user_management::models::{User, UserLoggedIn, UserOut};
use crate::api::user_management::password;
use crate::api::user_management::register::normalize_email;
use crate::api::user_management::sessions::{SessionCookie, UserSession, SESSION_COOKIE};
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use chrono::Utc;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::http::CookieJar;
use rocket::http::{Cookie, Status};
use rocket::serde::json::Json;
use rocket::State;

#[derive(FromForm)]
pub struct FormLogin {
    /// Email address or username.
    login: String,
    password: String,
}

#[get("/check_login")]
pub(crate) async fn check_login(user: UserLoggedIn) -> Json<UserOut> {
    Json(user.0)
}

#[get("/check_login", rank = 2)]
pub(crate) async fn check_login_unauthorised() -> ErrorResponse {
    ErrorResponse::new(Status { code: 401 }, "Login required".to_string())
}

#[post("/login", data = "<form_login>")]
pub(crate) async fn login(
    form_login: Form<FormLogin>,
    sessions: &State<UserSession>,
    conn: DbConn,
    cookies: &CookieJar<'_>,
) -> Result<Json<UserOut>, ErrorResponse> {
    let FormLogin {
        login,
        password: given_password,
    } = form_login.into_inner();

    let login_email = normalize_email(&login);
    let user = conn
        .run(move |c| {
            use schema::users::dsl::*;
            users
                .filter(email.eq(&login_email).or(username.eq(login.trim())))
                .first::<User>(c)
                .optional()
                .map_err(|_| {
                    ErrorResponse::new(Status { code: 500 }, "Couldn't load user".to_string())
                })
        })
        .await?;

    let invalid =
        || ErrorResponse::new(Status { code: 401 }, "Invalid credentials".to_string());

    let user = user.ok_or_else(invalid)?;

    let stored_hash = user.password_hash.clone();
    let matches =
        rocket::tokio::task::spawn_blocking(move || password::verify(&given_password, &stored_hash))
            .await
            .map_err(|_| {
                ErrorResponse::new(Status { code: 500 }, "Couldn't check password".to_string())
            })?;
    if !matches {
        tracing::info!(user_id = user.id, "rejected login with wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ErrorResponse::forbidden("Account is deactivated"));
    }

    let session_key = sessions
        .start(user.id)
        .map_err(|err| ErrorResponse::new(Status { code: 500 }, err.message().to_string()))?;

    let cookie = SessionCookie {
        session_key,
        creation_time: SystemTime::now(),
    };

    let cookie_string = serde_json::to_string(&cookie).map_err(|err| {
        ErrorResponse::new(
            Status { code: 500 },
            format!("Couldn't create session cookie {}", err),
        )
    })?;

    cookies.add_private(Cookie::new(SESSION_COOKIE, cookie_string));

    let user_id = user.id;
    let user = conn
        .run(move |c| {
            use schema::users::dsl::*;
            diesel::update(users.find(user_id))
                .set(last_login.eq(Utc::now().naive_utc()))
                .get_result::<User>(c)
                .map_err(|_| {
                    ErrorResponse::new(Status { code: 500 }, "Couldn't update user".to_string())
                })
        })
        .await?;

    tracing::info!(user_id, "user logged in");

    Ok(Json(UserOut::from(user)))
}

#[post("/logout")]
pub(crate) async fn logout(sessions: &State<UserSession>, cookies: &CookieJar<'_>) -> &'static str {
    if let Some(cookie) = cookies.get_private(SESSION_COOKIE) {
        if let Ok(session) = serde_json::from_str::<SessionCookie>(cookie.value()) {
            sessions.end(&session.session_key);
        }
    }
    cookies.remove_private(SESSION_COOKIE);

    "Success"
}
