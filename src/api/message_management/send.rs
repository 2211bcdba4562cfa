use crate::api::message_management::models::{Message, NewMessage};
use crate::api::rental_management::get_rental::load_rental;
use crate::api::user_management::models::{User, UserLoggedIn};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;

#[derive(FromForm)]
pub struct FormMessage {
    recipient_id: i32,
    rental_id: Option<i32>,
    #[field(default = String::new())]
    subject: String,
    body: String,
}

pub(crate) fn validate_message(sender_id: i32, recipient_id: i32, body: &str) -> Result<(), String> {
    if sender_id == recipient_id {
        return Err("You can't message yourself".to_string());
    }
    if body.trim().is_empty() {
        return Err("Message body is required".to_string());
    }
    Ok(())
}

#[post("/messages", data = "<form_message>")]
pub(crate) async fn send_message(
    form_message: Form<FormMessage>,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Message>, ErrorResponse> {
    let form = form_message.into_inner();
    let sender = user.0.id;

    validate_message(sender, form.recipient_id, &form.body).map_err(ErrorResponse::bad_request)?;

    if let Some(rid) = form.rental_id {
        let rental = load_rental(&conn, rid).await?;
        if !rental.is_participant(sender) {
            return Err(ErrorResponse::forbidden("You are not part of this rental"));
        }
    }

    let recipient = form.recipient_id;
    let recipient_active = conn
        .run(move |c| {
            use schema::users::dsl::*;
            users.find(recipient).first::<User>(c).map(|user| user.is_active)
        })
        .await
        .map_err(db_error("recipient"))?;
    if !recipient_active {
        return Err(ErrorResponse::not_found("recipient"));
    }

    let new_message = NewMessage {
        rental_id: form.rental_id,
        sender_id: sender,
        recipient_id: recipient,
        subject: form.subject.trim().to_string(),
        body: form.body.trim().to_string(),
    };

    let message = conn
        .run(move |c| {
            diesel::insert_into(schema::messages::table)
                .values(&new_message)
                .get_result::<Message>(c)
        })
        .await
        .map_err(db_error("message"))?;

    tracing::info!(message_id = message.id, sender_id = sender, recipient_id = recipient, "message sent");

    Ok(Json(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_need_a_body_and_another_user() {
        assert!(validate_message(1, 2, "Is the controller included?").is_ok());
        assert!(validate_message(1, 1, "hello").is_err());
        assert_eq!(
            validate_message(1, 2, "   "),
            Err("Message body is required".to_string())
        );
    }
}
