use crate::api::message_management::models::{Message, MessageOut};
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema::{messages, users};
use diesel::prelude::*;
use rocket::serde::json::Json;

/// Messages received by the caller, newest first, with the sender's name.
#[get("/messages/inbox")]
pub(crate) async fn inbox(user: UserLoggedIn, conn: DbConn) -> Result<Json<Vec<MessageOut>>, ErrorResponse> {
    let uid = user.0.id;
    let rows = conn
        .run(move |c| {
            messages::table
                .inner_join(users::table.on(users::id.eq(messages::sender_id)))
                .filter(messages::recipient_id.eq(uid))
                .order(messages::created_at.desc())
                .select((messages::all_columns, users::username))
                .load::<(Message, String)>(c)
        })
        .await
        .map_err(db_error("messages"))?;

    Ok(Json(rows.into_iter().map(MessageOut::from).collect()))
}

#[get("/messages/sent")]
pub(crate) async fn sent(user: UserLoggedIn, conn: DbConn) -> Result<Json<Vec<MessageOut>>, ErrorResponse> {
    let uid = user.0.id;
    let rows = conn
        .run(move |c| {
            messages::table
                .inner_join(users::table.on(users::id.eq(messages::recipient_id)))
                .filter(messages::sender_id.eq(uid))
                .order(messages::created_at.desc())
                .select((messages::all_columns, users::username))
                .load::<(Message, String)>(c)
        })
        .await
        .map_err(db_error("messages"))?;

    Ok(Json(rows.into_iter().map(MessageOut::from).collect()))
}
