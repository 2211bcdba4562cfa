use std::collections::HashMap;

use crate::api::equipment_management::list::search_pattern;
use crate::api::pagination::{self, Page, PER_PAGE};
use crate::api::payment_management::models::{Payment, PaymentMethod, PaymentStatus};
use crate::api::rental_management::models::{Rental, RentalSummary};
use crate::api::user_management::models::{AdminUser, PublicUser, User};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::gateway::{Gateway, OrderDetails};
use crate::schema::{equipment, payments, rentals, users};
use chrono::{NaiveDateTime, Utc};
use diesel::dsl::sum;
use diesel::pg::Pg;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;
use rocket::State;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(FromForm)]
pub struct PaymentFilter {
    search: Option<String>,
    status: Option<PaymentStatus>,
    method: Option<PaymentMethod>,
    page: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct PaymentRow {
    #[serde(flatten)]
    pub payment: Payment,
    pub equipment_title: String,
    pub payer_username: String,
}

#[derive(Serialize, Debug)]
pub struct PaymentList {
    pub payments: Page<PaymentRow>,
    pub total_payments: i64,
    pub completed_amount: Decimal,
    pub pending_payments: i64,
}

#[derive(Serialize, Debug)]
pub struct AdminPaymentDetail {
    pub payment: Payment,
    pub rental: RentalSummary,
    pub payer: PublicUser,
}

#[derive(Serialize, Debug)]
pub struct GatewayRefresh {
    pub payment: Payment,
    pub order: OrderDetails,
}

fn filtered(filter: &PaymentFilter) -> payments::BoxedQuery<'static, Pg> {
    let mut query = payments::table.into_boxed();

    if let Some(pattern) = filter.search.as_deref().and_then(search_pattern) {
        let titled = rentals::table
            .inner_join(equipment::table)
            .filter(equipment::title.ilike(pattern.clone()))
            .select(rentals::id);
        let payers = users::table
            .filter(users::username.ilike(pattern.clone()))
            .select(users::id);
        query = query.filter(
            payments::rental_id
                .eq_any(titled)
                .or(payments::payer_id.eq_any(payers))
                .or(payments::gateway_order_id.ilike(pattern)),
        );
    }
    if let Some(wanted) = filter.status {
        query = query.filter(payments::status.eq(wanted.as_str()));
    }
    if let Some(wanted) = filter.method {
        query = query.filter(payments::payment_method.eq(wanted.as_str()));
    }

    query
}

#[get("/admin/payments?<filter..>")]
pub(crate) async fn list_payments(
    filter: PaymentFilter,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<PaymentList>, ErrorResponse> {
    let page = pagination::page_number(filter.page);

    let list = conn
        .run(move |c| {
            let total_payments = filtered(&filter).count().get_result::<i64>(c)?;
            let completed_amount = filtered(&filter)
                .filter(payments::status.eq(PaymentStatus::Completed.as_str()))
                .select(sum(payments::amount))
                .first::<Option<Decimal>>(c)?
                .unwrap_or(Decimal::ZERO);
            let pending_payments = filtered(&filter)
                .filter(payments::status.eq(PaymentStatus::Pending.as_str()))
                .count()
                .get_result::<i64>(c)?;

            let items = filtered(&filter)
                .order((payments::created_at.desc(), payments::id.desc()))
                .limit(PER_PAGE)
                .offset(pagination::offset(page))
                .load::<Payment>(c)?;

            let rental_ids: Vec<i32> = items.iter().map(|payment| payment.rental_id).collect();
            let titles: HashMap<i32, String> = rentals::table
                .inner_join(equipment::table)
                .filter(rentals::id.eq_any(&rental_ids))
                .select((rentals::id, equipment::title))
                .load::<(i32, String)>(c)?
                .into_iter()
                .collect();

            let payer_ids: Vec<i32> = items.iter().map(|payment| payment.payer_id).collect();
            let payers: HashMap<i32, String> = users::table
                .filter(users::id.eq_any(&payer_ids))
                .select((users::id, users::username))
                .load::<(i32, String)>(c)?
                .into_iter()
                .collect();

            let rows = items
                .into_iter()
                .map(|payment| PaymentRow {
                    equipment_title: titles.get(&payment.rental_id).cloned().unwrap_or_default(),
                    payer_username: payers.get(&payment.payer_id).cloned().unwrap_or_default(),
                    payment,
                })
                .collect();

            Ok::<_, diesel::result::Error>(PaymentList {
                payments: Page::new(rows, page, total_payments),
                total_payments,
                completed_amount,
                pending_payments,
            })
        })
        .await
        .map_err(db_error("payments"))?;

    Ok(Json(list))
}

async fn load_payment(conn: &DbConn, pid: i32) -> Result<Payment, ErrorResponse> {
    conn.run(move |c| payments::table.find(pid).first::<Payment>(c))
        .await
        .map_err(db_error("payment"))
}

#[get("/admin/payments/<pid>")]
pub(crate) async fn payment_detail(
    pid: i32,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<AdminPaymentDetail>, ErrorResponse> {
    let detail = conn
        .run(move |c| {
            let payment = payments::table.find(pid).first::<Payment>(c)?;
            let rental = rentals::table
                .inner_join(equipment::table)
                .filter(rentals::id.eq(payment.rental_id))
                .select((rentals::all_columns, equipment::title))
                .first::<(Rental, String)>(c)?;
            let payer = users::table.find(payment.payer_id).first::<User>(c)?;

            Ok::<_, diesel::result::Error>(AdminPaymentDetail {
                payment,
                rental: RentalSummary::from(rental),
                payer: PublicUser::from(payer),
            })
        })
        .await
        .map_err(db_error("payment"))?;

    Ok(Json(detail))
}

/// Asks the gateway for the current state of the payment's order.
#[post("/admin/payments/<pid>/refresh")]
pub(crate) async fn refresh_payment(
    pid: i32,
    _admin: AdminUser,
    conn: DbConn,
    gateway: &State<Gateway>,
) -> Result<Json<GatewayRefresh>, ErrorResponse> {
    let payment = load_payment(&conn, pid).await?;
    let order_id = payment
        .gateway_order_id
        .clone()
        .ok_or_else(|| ErrorResponse::bad_request("Payment has no gateway order"))?;

    let order = gateway.order_details(&order_id).await.map_err(|err| {
        tracing::warn!(payment_id = pid, order_id = %order_id, %err, "order lookup failed");
        ErrorResponse::from(err)
    })?;

    Ok(Json(GatewayRefresh { payment, order }))
}

#[derive(FromForm)]
pub struct FormPaymentAction {
    action: String,
}

#[derive(AsChangeset, Debug, PartialEq, Eq)]
#[diesel(table_name = payments)]
pub(crate) struct PaymentChanges {
    pub(crate) status: String,
    pub(crate) processed_at: Option<NaiveDateTime>,
}

/// Manual status override. Completion stamps `processed_at` unless the
/// payment already has one.
pub(crate) fn payment_override(
    payment: &Payment,
    action: &str,
    now: NaiveDateTime,
) -> Result<PaymentChanges, String> {
    match action {
        "mark_completed" => Ok(PaymentChanges {
            status: PaymentStatus::Completed.as_str().to_string(),
            processed_at: Some(payment.processed_at.unwrap_or(now)),
        }),
        "mark_failed" => Ok(PaymentChanges {
            status: PaymentStatus::Failed.as_str().to_string(),
            processed_at: None,
        }),
        other => Err(format!("Unknown payment action '{}'", other)),
    }
}

#[post("/admin/payments/<pid>/action", data = "<form_action>")]
pub(crate) async fn payment_action(
    pid: i32,
    form_action: Form<FormPaymentAction>,
    admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Payment>, ErrorResponse> {
    let payment = load_payment(&conn, pid).await?;
    let changes = payment_override(&payment, &form_action.action, Utc::now().naive_utc())
        .map_err(ErrorResponse::bad_request)?;

    let updated = conn
        .run(move |c| diesel::update(&payment).set(&changes).get_result::<Payment>(c))
        .await
        .map_err(db_error("payment"))?;

    tracing::info!(
        payment_id = pid,
        admin_id = admin.0.id,
        status = %updated.status,
        "payment status overridden"
    );

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn payment(processed_at: Option<NaiveDateTime>) -> Payment {
        Payment {
            id: 3,
            rental_id: 5,
            payer_id: 1,
            payment_type: "rental_payment".to_string(),
            payment_method: "paypal".to_string(),
            amount: dec!(162.00),
            status: "pending".to_string(),
            gateway_order_id: Some("5O190127TN364715T".to_string()),
            gateway_capture_id: None,
            gateway_payer_id: None,
            gateway_email: None,
            processed_at,
            created_at: at(1),
        }
    }

    #[test]
    fn completion_stamps_processing_time_once() {
        let changes = payment_override(&payment(None), "mark_completed", at(2)).unwrap();
        assert_eq!(changes.status, "completed");
        assert_eq!(changes.processed_at, Some(at(2)));

        let changes = payment_override(&payment(Some(at(1))), "mark_completed", at(2)).unwrap();
        assert_eq!(changes.processed_at, Some(at(1)));
    }

    #[test]
    fn failure_and_unknown_actions() {
        let changes = payment_override(&payment(None), "mark_failed", at(2)).unwrap();
        assert_eq!(changes.status, "failed");
        assert_eq!(changes.processed_at, None);

        assert!(payment_override(&payment(None), "refund", at(2)).is_err());
    }
}
