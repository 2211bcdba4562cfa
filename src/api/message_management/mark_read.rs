use crate::api::message_management::models::Message;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use chrono::Utc;
use diesel::prelude::*;
use rocket::serde::json::Json;

#[post("/messages/<mid>/read")]
pub(crate) async fn mark_read(
    mid: i32,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Message>, ErrorResponse> {
    let message = conn
        .run(move |c| {
            use schema::messages::dsl::*;
            messages.find(mid).first::<Message>(c)
        })
        .await
        .map_err(db_error("message"))?;

    if message.recipient_id != user.0.id {
        return Err(ErrorResponse::forbidden("Only the recipient can mark a message read"));
    }
    if message.is_read {
        return Ok(Json(message));
    }

    let updated = conn
        .run(move |c| {
            use schema::messages::dsl::*;
            diesel::update(&message)
                .set((is_read.eq(true), read_at.eq(Some(Utc::now().naive_utc()))))
                .get_result::<Message>(c)
        })
        .await
        .map_err(db_error("message"))?;

    Ok(Json(updated))
}
