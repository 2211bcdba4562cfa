//! PayPal Orders v2 client.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Capture, CreatedOrder, OrderDetails, OrderRequest, PaymentGateway};
use crate::error::GatewayError;
use crate::settings::Settings;

/// Tokens are refreshed this long before PayPal says they expire.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

pub struct PayPalClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Money {
    currency_code: String,
    value: String,
}

impl Money {
    fn new(currency: &str, amount: Decimal) -> Money {
        Money {
            currency_code: currency.to_string(),
            value: format!("{:.2}", amount.round_dp(2)),
        }
    }
}

#[derive(Serialize, Debug)]
pub(crate) struct OrderPayload {
    intent: &'static str,
    purchase_units: Vec<PurchaseUnit>,
    application_context: ApplicationContext,
}

#[derive(Serialize, Debug)]
struct PurchaseUnit {
    reference_id: String,
    description: String,
    amount: Amount,
    items: Vec<Item>,
}

#[derive(Serialize, Debug)]
struct Amount {
    currency_code: String,
    value: String,
    breakdown: Breakdown,
}

#[derive(Serialize, Debug)]
struct Breakdown {
    item_total: Money,
    shipping: Money,
    handling: Money,
}

#[derive(Serialize, Debug)]
struct Item {
    name: String,
    description: String,
    quantity: &'static str,
    unit_amount: Money,
}

#[derive(Serialize, Debug)]
struct ApplicationContext {
    return_url: String,
    cancel_url: String,
    brand_name: String,
    landing_page: &'static str,
    user_action: &'static str,
}

/// Builds an order whose breakdown adds up to its total: the rental and
/// the deposit are items, delivery is shipping and the service fee is
/// handling.
pub(crate) fn order_payload(order: &OrderRequest) -> OrderPayload {
    let currency = order.currency.as_str();

    let mut items = vec![Item {
        name: order.item_name.clone(),
        description: order.item_description.clone(),
        quantity: "1",
        unit_amount: Money::new(currency, order.subtotal),
    }];
    if order.security_deposit > Decimal::ZERO {
        items.push(Item {
            name: "Security deposit".to_string(),
            description: "Refundable security deposit".to_string(),
            quantity: "1",
            unit_amount: Money::new(currency, order.security_deposit),
        });
    }

    OrderPayload {
        intent: "CAPTURE",
        purchase_units: vec![PurchaseUnit {
            reference_id: order.reference_id.clone(),
            description: order.description.clone(),
            amount: Amount {
                currency_code: currency.to_string(),
                value: Money::new(currency, order.total()).value,
                breakdown: Breakdown {
                    item_total: Money::new(currency, order.subtotal + order.security_deposit),
                    shipping: Money::new(currency, order.delivery_fee),
                    handling: Money::new(currency, order.service_fee),
                },
            },
            items,
        }],
        application_context: ApplicationContext {
            return_url: order.return_url.clone(),
            cancel_url: order.cancel_url.clone(),
            brand_name: order.brand_name.clone(),
            landing_page: "LOGIN",
            user_action: "PAY_NOW",
        },
    }
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct OrderResponse {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    payer: Option<Payer>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnitResponse>,
}

#[derive(Deserialize, Debug, Default)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Deserialize, Debug, Default)]
struct Payer {
    payer_id: Option<String>,
    email_address: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct PurchaseUnitResponse {
    amount: Option<AmountResponse>,
    payments: Option<Payments>,
}

#[derive(Deserialize, Debug, Default)]
struct AmountResponse {
    currency_code: Option<String>,
    value: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct Payments {
    #[serde(default)]
    captures: Vec<CaptureResponse>,
}

#[derive(Deserialize, Debug, Default)]
struct CaptureResponse {
    id: String,
    status: Option<String>,
}

impl OrderResponse {
    /// The buyer approval link is found by relation, not position.
    fn approval_url(&self) -> Option<String> {
        self.links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.clone())
    }

    fn first_capture(&self) -> Option<&CaptureResponse> {
        self.purchase_units
            .iter()
            .filter_map(|unit| unit.payments.as_ref())
            .flat_map(|payments| payments.captures.iter())
            .next()
    }

    fn payer_id(&self) -> Option<String> {
        self.payer.as_ref().and_then(|payer| payer.payer_id.clone())
    }

    fn payer_email(&self) -> Option<String> {
        self.payer.as_ref().and_then(|payer| payer.email_address.clone())
    }
}

impl From<OrderResponse> for CreatedOrder {
    fn from(order: OrderResponse) -> Self {
        CreatedOrder {
            approval_url: order.approval_url(),
            id: order.id,
            status: order.status,
        }
    }
}

impl From<OrderResponse> for Capture {
    fn from(order: OrderResponse) -> Self {
        let capture = order.first_capture();
        Capture {
            capture_id: capture.map(|capture| capture.id.clone()),
            capture_status: capture.and_then(|capture| capture.status.clone()),
            payer_id: order.payer_id(),
            payer_email: order.payer_email(),
            order_id: order.id,
            status: order.status,
        }
    }
}

impl From<OrderResponse> for OrderDetails {
    fn from(order: OrderResponse) -> Self {
        let amount = order
            .purchase_units
            .first()
            .and_then(|unit| unit.amount.as_ref());
        OrderDetails {
            amount: amount.and_then(|amount| amount.value.clone()),
            currency: amount.and_then(|amount| amount.currency_code.clone()),
            payer_id: order.payer_id(),
            payer_email: order.payer_email(),
            id: order.id,
            status: order.status,
        }
    }
}

async fn expect_success(
    response: Response,
    operation: &'static str,
) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(operation, status = status.as_u16(), %body, "paypal request failed");
    Err(GatewayError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

async fn decode(response: Response) -> Result<OrderResponse, GatewayError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| GatewayError::Malformed(err.to_string()))
}

impl PayPalClient {
    pub fn new(settings: &Settings) -> Result<PayPalClient, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.gateway_timeout_secs))
            .build()?;

        Ok(PayPalClient {
            client,
            base_url: settings.paypal_api_base().to_string(),
            client_id: settings.paypal_client_id.clone(),
            client_secret: settings.paypal_client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        let cached = self.token.lock().ok()?.clone()?;
        (cached.expires_at > Instant::now()).then_some(cached.access_token)
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        if self.client_id.is_empty() {
            return Err(GatewayError::NotConfigured("paypal_client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(GatewayError::NotConfigured("paypal_client_secret"));
        }
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;
        let token = expect_success(response, "token exchange")
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_MARGIN);
        if let Ok(mut cached) = self.token.lock() {
            *cached = Some(CachedToken {
                access_token: token.access_token.clone(),
                expires_at: Instant::now() + lifetime,
            });
        }

        Ok(token.access_token)
    }
}

#[rocket::async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_order(&self, order: &OrderRequest) -> Result<CreatedOrder, GatewayError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(token)
            .header("PayPal-Request-Id", &order.request_id)
            .json(&order_payload(order))
            .send()
            .await?;
        let created = decode(expect_success(response, "create order").await?).await?;

        tracing::info!(order_id = %created.id, reference_id = %order.reference_id, "paypal order created");

        Ok(CreatedOrder::from(created))
    }

    async fn capture_order(&self, order_id: &str) -> Result<Capture, GatewayError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders/{}/capture", self.base_url, order_id))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let captured = decode(expect_success(response, "capture order").await?).await?;

        Ok(Capture::from(captured))
    }

    async fn order_details(&self, order_id: &str) -> Result<OrderDetails, GatewayError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}/v2/checkout/orders/{}", self.base_url, order_id))
            .bearer_auth(token)
            .send()
            .await?;
        let order = decode(expect_success(response, "order details").await?).await?;

        Ok(OrderDetails::from(order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn rental_order(deposit: Decimal) -> OrderRequest {
        OrderRequest {
            request_id: "gamezone-payment-7".to_string(),
            reference_id: "5".to_string(),
            description: "Rental: PlayStation 5".to_string(),
            item_name: "PlayStation 5".to_string(),
            item_description: "Rental from 2024-06-01 to 2024-06-03".to_string(),
            currency: "USD".to_string(),
            subtotal: dec!(45.00),
            security_deposit: deposit,
            delivery_fee: dec!(12.5),
            service_fee: dec!(4.50),
            brand_name: "GameZone".to_string(),
            return_url: "http://localhost:8000/api/v1/rentals/5/payment/success".to_string(),
            cancel_url: "http://localhost:8000/api/v1/rentals/5/payment/cancel".to_string(),
        }
    }

    fn value(json: &serde_json::Value) -> Decimal {
        Decimal::from_str(json.as_str().unwrap()).unwrap()
    }

    #[test]
    fn breakdown_adds_up_to_the_total() {
        let payload = serde_json::to_value(order_payload(&rental_order(dec!(100)))).unwrap();
        let amount = &payload["purchase_units"][0]["amount"];
        let breakdown = &amount["breakdown"];

        assert_eq!(amount["value"], "162.00");
        assert_eq!(
            value(&breakdown["item_total"]["value"])
                + value(&breakdown["shipping"]["value"])
                + value(&breakdown["handling"]["value"]),
            value(&amount["value"])
        );
        assert_eq!(breakdown["shipping"]["value"], "12.50");
    }

    #[test]
    fn items_add_up_to_the_item_total() {
        let payload = serde_json::to_value(order_payload(&rental_order(dec!(100)))).unwrap();
        let unit = &payload["purchase_units"][0];
        let items = unit["items"].as_array().unwrap();

        assert_eq!(items.len(), 2);
        let sum: Decimal = items.iter().map(|item| value(&item["unit_amount"]["value"])).sum();
        assert_eq!(sum, value(&unit["amount"]["breakdown"]["item_total"]["value"]));
        assert_eq!(payload["intent"], "CAPTURE");
        assert_eq!(unit["reference_id"], "5");
    }

    #[test]
    fn deposit_item_is_left_out_when_zero() {
        let payload = serde_json::to_value(order_payload(&rental_order(dec!(0)))).unwrap();
        let unit = &payload["purchase_units"][0];

        assert_eq!(unit["items"].as_array().unwrap().len(), 1);
        assert_eq!(unit["amount"]["value"], "62.00");
    }

    #[test]
    fn approval_link_is_picked_by_rel() {
        let created: OrderResponse = serde_json::from_str(
            r#"{
                "id": "5O190127TN364715T",
                "status": "CREATED",
                "links": [
                    {"href": "https://api-m.paypal.com/v2/checkout/orders/5O190127TN364715T", "rel": "self", "method": "GET"},
                    {"href": "https://api-m.paypal.com/v2/checkout/orders/5O190127TN364715T", "rel": "update", "method": "PATCH"},
                    {"href": "https://www.paypal.com/checkoutnow?token=5O190127TN364715T", "rel": "approve", "method": "GET"}
                ]
            }"#,
        )
        .unwrap();

        let order = CreatedOrder::from(created);
        assert_eq!(
            order.approval_url.as_deref(),
            Some("https://www.paypal.com/checkoutnow?token=5O190127TN364715T")
        );
        assert_eq!(order.status, "CREATED");
    }

    #[test]
    fn capture_response_is_parsed() {
        let captured: OrderResponse = serde_json::from_str(
            r#"{
                "id": "5O190127TN364715T",
                "status": "COMPLETED",
                "payer": {"payer_id": "QYR5Z8XDVJNXQ", "email_address": "buyer@example.com"},
                "purchase_units": [{
                    "reference_id": "5",
                    "payments": {"captures": [{"id": "3C679366HH908993F", "status": "COMPLETED"}]}
                }]
            }"#,
        )
        .unwrap();

        let capture = Capture::from(captured);
        assert_eq!(capture.capture_id.as_deref(), Some("3C679366HH908993F"));
        assert_eq!(capture.payer_id.as_deref(), Some("QYR5Z8XDVJNXQ"));
        assert_eq!(capture.payer_email.as_deref(), Some("buyer@example.com"));
        assert_eq!(
            capture.payment_status(),
            crate::api::choices::PaymentStatus::Completed
        );
    }

    #[test]
    fn missing_credentials_are_reported_before_any_request() {
        let settings = Settings::from_builder(config::Config::builder()).unwrap();
        let client = PayPalClient::new(&settings).unwrap();

        let err = rocket::tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(client.order_details("5O190127TN364715T"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured("paypal_client_id")));
    }
}
