use crate::api::choices::RentalStatus;
use crate::api::payment_management::models::{Payment, PaymentStatus, PaymentType};
use crate::api::rental_management::get_rental::visible_rental;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::gateway::{Capture, Gateway};
use crate::schema;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

#[derive(AsChangeset)]
#[diesel(table_name = schema::payments)]
pub(crate) struct CaptureChanges {
    pub(crate) status: String,
    pub(crate) gateway_capture_id: Option<String>,
    pub(crate) gateway_payer_id: Option<String>,
    pub(crate) gateway_email: Option<String>,
    pub(crate) processed_at: Option<NaiveDateTime>,
}

impl CaptureChanges {
    pub(crate) fn new(capture: &Capture, now: NaiveDateTime) -> CaptureChanges {
        let status = capture.payment_status();
        CaptureChanges {
            status: status.as_str().to_string(),
            gateway_capture_id: capture.capture_id.clone(),
            gateway_payer_id: capture.payer_id.clone(),
            gateway_email: capture.payer_email.clone(),
            processed_at: (status == PaymentStatus::Completed).then_some(now),
        }
    }
}

/// Stores a capture; a completed rental payment also confirms the rental.
pub(crate) fn record_capture(
    payment: &Payment,
    changes: &CaptureChanges,
    c: &mut PgConnection,
) -> QueryResult<Payment> {
    c.transaction::<_, diesel::result::Error, _>(|c| {
        let updated = diesel::update(payment).set(changes).get_result::<Payment>(c)?;

        let confirms = updated.status() == Some(PaymentStatus::Completed)
            && updated.payment_type() == Some(PaymentType::RentalPayment);
        if confirms {
            use schema::rentals::dsl::*;
            diesel::update(rentals.find(updated.rental_id))
                .set((
                    status.eq(RentalStatus::Confirmed.as_str()),
                    confirmed_at.eq(updated.processed_at),
                    updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(c)?;
        }

        Ok(updated)
    })
}

/// Payments the gateway has already captured. Capturing their order again
/// only gets ORDER_ALREADY_CAPTURED back.
pub(crate) fn already_captured(status: Option<PaymentStatus>) -> bool {
    matches!(
        status,
        Some(PaymentStatus::Completed) | Some(PaymentStatus::Processing)
    )
}

async fn payment_for_order(
    conn: &DbConn,
    rid: i32,
    order_id: String,
) -> Result<Payment, ErrorResponse> {
    conn.run(move |c| {
        use schema::payments::dsl::*;
        payments
            .filter(rental_id.eq(rid))
            .filter(gateway_order_id.eq(order_id))
            .first::<Payment>(c)
    })
    .await
    .map_err(db_error("payment"))
}

/// Return URL of an approved checkout. `token` is the gateway order id.
#[get("/rentals/<rid>/payment/success?<token>")]
pub(crate) async fn payment_success(
    rid: i32,
    token: String,
    user: UserLoggedIn,
    conn: DbConn,
    gateway: &State<Gateway>,
) -> Result<Json<Payment>, ErrorResponse> {
    visible_rental(&conn, rid, &user.0).await?;
    let payment = payment_for_order(&conn, rid, token.clone()).await?;

    if already_captured(payment.status()) {
        return Ok(Json(payment));
    }

    let capture = gateway.capture_order(&token).await.map_err(|err| {
        tracing::warn!(payment_id = payment.id, order_id = %token, %err, "capture failed");
        ErrorResponse::from(err)
    })?;

    let changes = CaptureChanges::new(&capture, Utc::now().naive_utc());
    let pid = payment.id;
    let recorded = conn
        .run(move |c| record_capture(&payment, &changes, c))
        .await;

    match recorded {
        Ok(updated) => {
            tracing::info!(
                payment_id = pid,
                rental_id = rid,
                status = %updated.status,
                "payment capture recorded"
            );
            Ok(Json(updated))
        }
        Err(err) => {
            if capture.payment_status() == PaymentStatus::Completed {
                tracing::error!(
                    payment_id = pid,
                    order_id = %capture.order_id,
                    capture_id = ?capture.capture_id,
                    %err,
                    "payment captured by gateway but not recorded"
                );
            }
            Err(ErrorResponse::new(
                Status { code: 500 },
                format!("Couldn't record payment: {}", err),
            ))
        }
    }
}

/// Cancel URL of an abandoned checkout.
#[get("/rentals/<rid>/payment/cancel?<token>")]
pub(crate) async fn payment_cancel(
    rid: i32,
    token: String,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Payment>, ErrorResponse> {
    visible_rental(&conn, rid, &user.0).await?;
    let payment = payment_for_order(&conn, rid, token).await?;

    if payment.status() != Some(PaymentStatus::Pending) {
        return Ok(Json(payment));
    }

    let updated = conn
        .run(move |c| {
            use schema::payments::dsl::*;
            diesel::update(&payment)
                .set(status.eq(PaymentStatus::Failed.as_str()))
                .get_result::<Payment>(c)
        })
        .await
        .map_err(db_error("payment"))?;

    tracing::info!(payment_id = updated.id, rental_id = rid, "payment cancelled by buyer");

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn capture(status: &str) -> Capture {
        Capture {
            order_id: "5O190127TN364715T".to_string(),
            status: "COMPLETED".to_string(),
            capture_id: Some("3C679366HH908993F".to_string()),
            capture_status: Some(status.to_string()),
            payer_id: Some("QYR5Z8XDVJNXQ".to_string()),
            payer_email: Some("buyer@example.com".to_string()),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn captured_payments_are_not_captured_again() {
        assert!(already_captured(Some(PaymentStatus::Completed)));
        assert!(already_captured(Some(PaymentStatus::Processing)));
        assert!(!already_captured(Some(PaymentStatus::Pending)));
        assert!(!already_captured(Some(PaymentStatus::Failed)));
        assert!(!already_captured(None));
    }

    #[test]
    fn completed_capture_is_stamped() {
        let changes = CaptureChanges::new(&capture("COMPLETED"), now());
        assert_eq!(changes.status, "completed");
        assert_eq!(changes.processed_at, Some(now()));
        assert_eq!(changes.gateway_capture_id.as_deref(), Some("3C679366HH908993F"));
        assert_eq!(changes.gateway_email.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn pending_and_declined_captures_are_not_processed() {
        let pending = CaptureChanges::new(&capture("PENDING"), now());
        assert_eq!(pending.status, "processing");
        assert_eq!(pending.processed_at, None);

        let declined = CaptureChanges::new(&capture("DECLINED"), now());
        assert_eq!(declined.status, "failed");
        assert_eq!(declined.processed_at, None);
    }
}
