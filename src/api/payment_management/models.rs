use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;

use crate::schema::payments;

pub use crate::api::choices::{PaymentMethod, PaymentStatus, PaymentType};

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = payments)]
pub struct Payment {
    pub id: i32,
    pub rental_id: i32,
    pub payer_id: i32,
    pub payment_type: String,
    pub payment_method: String,
    pub amount: Decimal,
    pub status: String,
    pub gateway_order_id: Option<String>,
    pub gateway_capture_id: Option<String>,
    pub gateway_payer_id: Option<String>,
    pub gateway_email: Option<String>,
    pub processed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Payment {
    pub fn status(&self) -> Option<PaymentStatus> {
        self.status.parse().ok()
    }

    pub fn payment_type(&self) -> Option<PaymentType> {
        self.payment_type.parse().ok()
    }

    /// Key sent with the order so a repeated create returns the same order.
    pub fn request_id(&self) -> String {
        format!("gamezone-payment-{}", self.id)
    }
}

#[derive(Insertable)]
#[diesel(table_name = payments)]
pub(crate) struct NewPayment {
    pub(crate) rental_id: i32,
    pub(crate) payer_id: i32,
    pub(crate) payment_type: String,
    pub(crate) payment_method: String,
    pub(crate) amount: Decimal,
    pub(crate) status: String,
}

/// What a client needs to send the buyer to the gateway.
#[derive(Serialize, Debug)]
pub struct PaymentStarted {
    pub payment_id: i32,
    pub order_id: String,
    pub approval_url: Option<String>,
}
