use gamezone::error::GatewayError;
use gamezone::gateway::{Capture, CreatedOrder, Gateway, OrderDetails, OrderRequest, PaymentGateway};
use gamezone::settings::Settings;
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

struct OfflineGateway;

#[rocket::async_trait]
impl PaymentGateway for OfflineGateway {
    async fn create_order(&self, _order: &OrderRequest) -> Result<CreatedOrder, GatewayError> {
        Err(GatewayError::NotConfigured("paypal_client_id"))
    }

    async fn capture_order(&self, _order_id: &str) -> Result<Capture, GatewayError> {
        Err(GatewayError::NotConfigured("paypal_client_id"))
    }

    async fn order_details(&self, _order_id: &str) -> Result<OrderDetails, GatewayError> {
        Err(GatewayError::NotConfigured("paypal_client_id"))
    }
}

/// Database the route tests run against. The suite is skipped when unset.
const DATABASE_ENV: &str = "GAMEZONE_TEST_DATABASE_URL";

/// A full service against the test database, or `None` when there is none.
fn client() -> Option<Client> {
    let Ok(url) = std::env::var(DATABASE_ENV) else {
        eprintln!("{} not set, skipping route test", DATABASE_ENV);
        return None;
    };

    let builder = config::Config::builder()
        .set_override("admin_email", ADMIN_EMAIL)
        .unwrap()
        .set_override("admin_username", "routes_admin")
        .unwrap()
        .set_override("admin_password", PASSWORD)
        .unwrap();
    let settings = Settings::from_builder(builder).unwrap();
    let figment = rocket::Config::figment().merge(("databases.gamezone.url", url));
    let rocket = gamezone::rocket(settings, Gateway::new(OfflineGateway)).configure(figment);

    Some(Client::tracked(rocket).expect("valid rocket with a reachable test database"))
}

const ADMIN_EMAIL: &str = "routes-admin@gamezone.test";
const PASSWORD: &str = "hunter2hunter2";

fn post_form(client: &Client, path: &str, body: &str) -> (Status, Value) {
    let response = client
        .post(path.to_string())
        .header(ContentType::Form)
        .body(body.to_string())
        .dispatch();
    let status = response.status();
    let json = response
        .into_string()
        .and_then(|body| serde_json::from_str(&body).ok())
        .unwrap_or(Value::Null);
    (status, json)
}

fn log_in(client: &Client, login: &str) {
    let (status, _) = post_form(
        client,
        "/api/v1/login",
        &format!("login={}&password={}", login, PASSWORD),
    );
    assert_eq!(status, Status::Ok, "login as {}", login);
}

/// Registers a fresh account and returns its email, as typed at signup.
fn register(client: &Client, role: &str) -> String {
    let name = format!("{}{}", role, rand::random::<u32>());
    let email = format!("{}@Example.com", name);

    let (status, _) = post_form(
        client,
        "/api/v1/register",
        &format!(
            "username={}&email={}&password={}&role={}",
            name, email, PASSWORD, role
        ),
    );
    assert_eq!(status, Status::Ok);
    email
}

fn id_of(json: &Value) -> i64 {
    json["id"].as_i64().unwrap()
}

fn error_message(body: Option<String>) -> String {
    let json: Value = serde_json::from_str(&body.unwrap()).unwrap();
    json["err"].as_str().unwrap().to_string()
}

#[test]
fn route_table_ignites() {
    let Some(client) = client() else { return };
    let response = client.get("/api/v1/").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().as_deref(), Some("GameZone API"));
}

#[test]
fn check_login_without_session_is_unauthorized() {
    let Some(client) = client() else { return };
    let response = client.get("/api/v1/check_login").dispatch();

    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    assert_eq!(error_message(response.into_string()), "Login required");
}

#[test]
fn user_routes_require_a_session() {
    let Some(client) = client() else { return };
    for path in [
        "/api/v1/my_rentals",
        "/api/v1/rental_requests",
        "/api/v1/dashboard",
        "/api/v1/profile",
        "/api/v1/wishlist",
        "/api/v1/messages/inbox",
        "/api/v1/rentals/1",
        "/api/v1/rentals/1/payments",
    ] {
        let response = client.get(path).dispatch();
        assert_eq!(response.status(), Status::Unauthorized, "{}", path);
        assert_eq!(error_message(response.into_string()), "Login required", "{}", path);
    }
}

#[test]
fn admin_routes_require_a_session() {
    let Some(client) = client() else { return };
    for path in [
        "/api/v1/admin/dashboard",
        "/api/v1/admin/users",
        "/api/v1/admin/equipment",
        "/api/v1/admin/rentals?status=completed&date=week",
        "/api/v1/admin/payments",
        "/api/v1/admin/sensors",
        "/api/v1/admin/categories",
    ] {
        let response = client.get(path).dispatch();
        assert_eq!(response.status(), Status::Unauthorized, "{}", path);
        assert_eq!(response.content_type(), Some(ContentType::JSON), "{}", path);
    }
}

#[test]
fn payment_starts_require_a_session() {
    let Some(client) = client() else { return };
    let response = client.post("/api/v1/rentals/1/pay").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .post("/api/v1/admin/rentals/1/pay")
        .header(ContentType::Form)
        .body("payment_type=security_deposit")
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
}

#[test]
fn unknown_routes_answer_json_not_found() {
    let Some(client) = client() else { return };
    let response = client.get("/api/v1/no_such_thing").dispatch();

    assert_eq!(response.status(), Status::NotFound);
    assert_eq!(error_message(response.into_string()), "Not found");
}

#[test]
fn admin_routes_refuse_customers() {
    let Some(client) = client() else { return };
    let email = register(&client, "customer");
    log_in(&client, &email);

    for path in ["/api/v1/admin/dashboard", "/api/v1/admin/users", "/api/v1/admin/sensors"] {
        let response = client.get(path).dispatch();
        assert_eq!(response.status(), Status::Forbidden, "{}", path);
        assert_eq!(response.content_type(), Some(ContentType::JSON), "{}", path);
        assert_eq!(error_message(response.into_string()), "Permission denied", "{}", path);
    }

    let response = client.get("/api/v1/check_login").dispatch();
    assert_eq!(response.status(), Status::Ok);
}

#[test]
fn login_ignores_email_case() {
    let Some(client) = client() else { return };
    let email = register(&client, "customer");
    log_in(&client, &email.to_uppercase());

    let response = client.get("/api/v1/check_login").dispatch();
    assert_eq!(response.status(), Status::Ok);
}

/// Accounts and rental of one booking that the owner has approved.
struct Booking {
    vendor: String,
    customer: String,
    rid: i64,
}

/// Walks a fresh listing through admin approval and an approved request.
fn approved_booking(client: &Client) -> Booking {
    let vendor = register(client, "vendor");
    let customer = register(client, "customer");

    log_in(client, ADMIN_EMAIL);
    let (status, category) = post_form(
        client,
        "/api/v1/admin/categories",
        &format!("name=Consoles+{}", rand::random::<u32>()),
    );
    assert_eq!(status, Status::Ok);

    log_in(client, &vendor);
    let (status, listing) = post_form(
        client,
        "/api/v1/equipment",
        &format!(
            "category_id={}&title=PS5&description=Disc+edition&brand=Sony&model=CFI-1216A\
             &condition=excellent&daily_rate=15.00&weekly_rate=80.00\
             &location_city=Austin&location_state=TX",
            id_of(&category)
        ),
    );
    assert_eq!(status, Status::Ok);
    assert_eq!(listing["status"], "pending");
    let eid = id_of(&listing);

    log_in(client, ADMIN_EMAIL);
    let (status, _) = post_form(
        client,
        &format!("/api/v1/admin/equipment/{}/action", eid),
        "action=approve",
    );
    assert_eq!(status, Status::Ok);

    let start = chrono::Utc::now().date_naive() + chrono::Duration::days(3);
    let end = start + chrono::Duration::days(6);
    log_in(client, &customer);
    let (status, rental) = post_form(
        client,
        &format!("/api/v1/equipment/{}/rent", eid),
        &format!("start_date={}&end_date={}", start, end),
    );
    assert_eq!(status, Status::Ok);
    assert_eq!(rental["total_days"], 7);
    let rid = id_of(&rental);

    log_in(client, &vendor);
    let (status, _) = post_form(
        client,
        &format!("/api/v1/rentals/{}/manage", rid),
        "action=approve",
    );
    assert_eq!(status, Status::Ok);

    Booking {
        vendor,
        customer,
        rid,
    }
}

fn get_json(client: &Client, path: &str) -> Value {
    let response = client.get(path.to_string()).dispatch();
    assert_eq!(response.status(), Status::Ok, "{}", path);
    serde_json::from_str(&response.into_string().unwrap()).unwrap()
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[test]
fn failed_gateway_order_leaves_a_failed_payment() {
    let Some(client) = client() else { return };
    let booking = approved_booking(&client);

    log_in(&client, &booking.customer);
    let (status, body) = post_form(&client, &format!("/api/v1/rentals/{}/pay", booking.rid), "");
    assert_eq!(status, Status::BadGateway);
    assert!(body["err"].as_str().unwrap().contains("Payment gateway error"));

    let payments = get_json(&client, &format!("/api/v1/rentals/{}/payments", booking.rid));
    let payments = payments.as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["status"], "failed");
}

#[test]
fn completed_rentals_and_reviews_reach_profiles() {
    let Some(client) = client() else { return };
    let booking = approved_booking(&client);
    let manage = format!("/api/v1/rentals/{}/manage", booking.rid);
    let review = format!("/api/v1/rentals/{}/review", booking.rid);

    log_in(&client, &booking.vendor);
    for action in ["start", "return", "complete", "complete"] {
        let (status, _) = post_form(&client, &manage, &format!("action={}", action));
        assert_eq!(status, Status::Ok, "{}", action);
    }
    let (status, _) = post_form(&client, &review, "reviewer_type=owner_to_renter&rating=5");
    assert_eq!(status, Status::Ok);

    log_in(&client, &booking.customer);
    let (status, _) = post_form(&client, &review, "reviewer_type=renter_to_owner&rating=4");
    assert_eq!(status, Status::Ok);
    let (status, _) = post_form(&client, &review, "reviewer_type=renter_to_owner&rating=1");
    assert_eq!(status, Status::Conflict);

    let renter = get_json(&client, "/api/v1/profile");
    assert_eq!(renter["profile"]["total_rentals_as_renter"], 1);
    assert_eq!(decimal(&renter["profile"]["average_rating_as_renter"]), Decimal::from(5));

    log_in(&client, &booking.vendor);
    let owner = get_json(&client, "/api/v1/profile");
    assert_eq!(owner["profile"]["total_rentals_as_owner"], 1);
    assert_eq!(decimal(&owner["profile"]["total_earnings"]), Decimal::from(80));
    assert_eq!(decimal(&owner["profile"]["average_rating_as_owner"]), Decimal::from(4));
}
