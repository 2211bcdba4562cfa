use crate::api::user_management::models::{User, UserLoggedIn, UserOut};
use crate::api::user_management::register::{verification_url, VERIFICATION_TOKEN_LEN};
use crate::api::user_management::sessions::generate_token;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use crate::settings::Settings;
use diesel::prelude::*;
use rocket::serde::json::Json;
use rocket::State;

#[get("/verify_email/<token>")]
pub(crate) async fn verify_email(token: String, conn: DbConn) -> Result<Json<UserOut>, ErrorResponse> {
    let user = conn
        .run(move |c| {
            use schema::users::dsl::*;
            diesel::update(users.filter(email_verification_token.eq(&token)))
                .set((
                    is_email_verified.eq(true),
                    email_verification_token.eq(None::<String>),
                ))
                .get_result::<User>(c)
                .map_err(db_error("verification token"))
        })
        .await?;

    tracing::info!(user_id = user.id, "email verified");

    Ok(Json(UserOut::from(user)))
}

#[post("/resend_verification")]
pub(crate) async fn resend_verification(
    user: UserLoggedIn,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<&'static str, ErrorResponse> {
    if user.0.is_email_verified {
        return Err(ErrorResponse::bad_request("Email is already verified"));
    }

    let token = generate_token(VERIFICATION_TOKEN_LEN);
    let new_token = token.clone();
    let user_id = user.0.id;

    conn.run(move |c| {
        use schema::users::dsl::*;
        diesel::update(users.find(user_id))
            .set(email_verification_token.eq(Some(new_token)))
            .execute(c)
            .map_err(db_error("user"))
    })
    .await?;

    tracing::info!(
        user_id,
        verification_url = %verification_url(settings, &token),
        "verification link reissued"
    );

    Ok("Success")
}
