//! Payment gateway seam.
//!
//! Handlers talk to a [`PaymentGateway`] held in Rocket state, so the PayPal
//! client can be swapped for a stub in tests.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::choices::PaymentStatus;
use crate::error::GatewayError;

pub mod paypal;

pub use paypal::PayPalClient;

/// Everything the gateway needs to create a checkout order for a rental.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Idempotency key; repeating a request with the same key returns the
    /// original order.
    pub request_id: String,
    pub reference_id: String,
    pub description: String,
    pub item_name: String,
    pub item_description: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub security_deposit: Decimal,
    pub delivery_fee: Decimal,
    pub service_fee: Decimal,
    pub brand_name: String,
    pub return_url: String,
    pub cancel_url: String,
}

impl OrderRequest {
    pub fn total(&self) -> Decimal {
        self.subtotal + self.security_deposit + self.delivery_fee + self.service_fee
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrder {
    pub id: String,
    pub status: String,
    pub approval_url: Option<String>,
}

/// Result of capturing an approved order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub order_id: String,
    pub status: String,
    pub capture_id: Option<String>,
    pub capture_status: Option<String>,
    pub payer_id: Option<String>,
    pub payer_email: Option<String>,
}

impl Capture {
    /// Local payment status for this capture. The capture's own status wins
    /// over the order status when the gateway reports one.
    pub fn payment_status(&self) -> PaymentStatus {
        let status = self.capture_status.as_deref().unwrap_or(&self.status);
        match status {
            "COMPLETED" => PaymentStatus::Completed,
            "PENDING" => PaymentStatus::Processing,
            _ => PaymentStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub id: String,
    pub status: String,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub payer_id: Option<String>,
    pub payer_email: Option<String>,
}

#[rocket::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, GatewayError>;

    async fn capture_order(&self, order_id: &str) -> Result<Capture, GatewayError>;

    async fn order_details(&self, order_id: &str) -> Result<OrderDetails, GatewayError>;
}

/// Managed-state handle to the configured gateway.
#[derive(Clone)]
pub struct Gateway(pub Arc<dyn PaymentGateway>);

impl Gateway {
    pub fn new(gateway: impl PaymentGateway + 'static) -> Gateway {
        Gateway(Arc::new(gateway))
    }
}

impl std::ops::Deref for Gateway {
    type Target = dyn PaymentGateway;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(order_status: &str, capture_status: Option<&str>) -> Capture {
        Capture {
            order_id: "5O190127TN364715T".to_string(),
            status: order_status.to_string(),
            capture_id: Some("3C679366HH908993F".to_string()),
            capture_status: capture_status.map(str::to_string),
            payer_id: None,
            payer_email: None,
        }
    }

    #[test]
    fn capture_status_maps_to_payment_status() {
        assert_eq!(
            capture("COMPLETED", Some("COMPLETED")).payment_status(),
            PaymentStatus::Completed
        );
        assert_eq!(
            capture("COMPLETED", Some("PENDING")).payment_status(),
            PaymentStatus::Processing
        );
        assert_eq!(
            capture("COMPLETED", Some("DECLINED")).payment_status(),
            PaymentStatus::Failed
        );
    }

    #[test]
    fn order_status_is_used_without_a_capture() {
        assert_eq!(capture("COMPLETED", None).payment_status(), PaymentStatus::Completed);
        assert_eq!(capture("VOIDED", None).payment_status(), PaymentStatus::Failed);
    }
}
