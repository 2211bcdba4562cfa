use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt::Debug;

use crate::schema::messages;

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: i32,
    pub rental_id: Option<i32>,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub is_system_message: bool,
    pub created_at: NaiveDateTime,
    pub read_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
pub(crate) struct NewMessage {
    pub(crate) rental_id: Option<i32>,
    pub(crate) sender_id: i32,
    pub(crate) recipient_id: i32,
    pub(crate) subject: String,
    pub(crate) body: String,
}

/// A message with the username of the other party.
#[derive(Serialize, Debug)]
pub struct MessageOut {
    #[serde(flatten)]
    pub message: Message,
    pub counterpart: String,
}

impl From<(Message, String)> for MessageOut {
    fn from((message, counterpart): (Message, String)) -> Self {
        MessageOut {
            message,
            counterpart,
        }
    }
}
