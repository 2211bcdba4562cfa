use crate::api::choices::RentalStatus;
use crate::api::payment_management::models::{
    NewPayment, Payment, PaymentMethod, PaymentStarted, PaymentStatus, PaymentType,
};
use crate::api::rental_management::get_rental::load_rental;
use crate::api::rental_management::models::Rental;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::gateway::{Gateway, OrderRequest};
use crate::schema;
use crate::settings::Settings;
use chrono::Utc;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

/// Statuses in which the renter may (re)start paying.
pub(crate) const PAYABLE: &[RentalStatus] = &[RentalStatus::Approved, RentalStatus::PaymentPending];

pub(crate) fn payment_url(settings: &Settings, rental_id: i32, outcome: &str) -> String {
    format!(
        "{}/api/v1/rentals/{}/payment/{}",
        settings.public_url.trim_end_matches('/'),
        rental_id,
        outcome
    )
}

pub(crate) fn order_request(
    rental: &Rental,
    equipment_title: &str,
    payment: &Payment,
    settings: &Settings,
) -> OrderRequest {
    OrderRequest {
        request_id: payment.request_id(),
        reference_id: rental.id.to_string(),
        description: format!("Rental: {}", equipment_title),
        item_name: equipment_title.to_string(),
        item_description: format!("Rental from {} to {}", rental.start_date, rental.end_date),
        currency: settings.currency.clone(),
        subtotal: rental.subtotal,
        security_deposit: rental.security_deposit,
        delivery_fee: rental.delivery_fee,
        service_fee: rental.service_fee,
        brand_name: settings.brand_name.clone(),
        return_url: payment_url(settings, rental.id, "success"),
        cancel_url: payment_url(settings, rental.id, "cancel"),
    }
}

/// Records a pending payment, creates the gateway order for it and moves
/// the rental to `payment_pending`. The renter is always the payer.
pub(crate) async fn start_payment(
    conn: &DbConn,
    gateway: &Gateway,
    settings: &Settings,
    rental: Rental,
    kind: PaymentType,
) -> Result<PaymentStarted, ErrorResponse> {
    let rid = rental.id;
    let new_payment = NewPayment {
        rental_id: rental.id,
        payer_id: rental.renter_id,
        payment_type: kind.as_str().to_string(),
        payment_method: PaymentMethod::PayPal.as_str().to_string(),
        amount: rental.total_amount,
        status: PaymentStatus::Pending.as_str().to_string(),
    };
    let eid = rental.equipment_id;

    let (payment, title) = conn
        .run(move |c| {
            let title = {
                use schema::equipment::dsl::*;
                equipment.find(eid).select(title).first::<String>(c)?
            };
            let payment = diesel::insert_into(schema::payments::table)
                .values(&new_payment)
                .get_result::<Payment>(c)?;
            Ok::<_, diesel::result::Error>((payment, title))
        })
        .await
        .map_err(db_error("rental"))?;

    let request = order_request(&rental, &title, &payment, settings);
    let pid = payment.id;

    let order = match gateway.create_order(&request).await {
        Ok(order) => order,
        Err(err) => {
            tracing::warn!(payment_id = pid, rental_id = rid, %err, "couldn't create gateway order");
            let marked = conn
                .run(move |c| {
                    use schema::payments::dsl::*;
                    diesel::update(payments.find(pid))
                        .set(status.eq(PaymentStatus::Failed.as_str()))
                        .execute(c)
                })
                .await;
            if let Err(db_err) = marked {
                tracing::error!(
                    payment_id = pid,
                    rental_id = rid,
                    err = %db_err,
                    "couldn't mark payment failed, it stays pending"
                );
            }
            return Err(err.into());
        }
    };

    let order_id = order.id.clone();
    conn.run(move |c| {
        c.transaction::<_, diesel::result::Error, _>(|c| {
            {
                use schema::payments::dsl::*;
                diesel::update(payments.find(pid))
                    .set(gateway_order_id.eq(Some(order_id)))
                    .execute(c)?;
            }
            {
                use schema::rentals::dsl::*;
                diesel::update(rentals.find(rid))
                    .set((
                        status.eq(RentalStatus::PaymentPending.as_str()),
                        updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(c)?;
            }
            Ok(())
        })
    })
    .await
    .map_err(|err| {
        ErrorResponse::new(
            Status { code: 500 },
            format!("Couldn't record payment order: {}", err),
        )
    })?;

    tracing::info!(payment_id = pid, rental_id = rid, order_id = %order.id, "payment initiated");

    Ok(PaymentStarted {
        payment_id: pid,
        order_id: order.id,
        approval_url: order.approval_url,
    })
}

#[post("/rentals/<rid>/pay")]
pub(crate) async fn initiate_payment(
    rid: i32,
    user: UserLoggedIn,
    conn: DbConn,
    gateway: &State<Gateway>,
    settings: &State<Settings>,
) -> Result<Json<PaymentStarted>, ErrorResponse> {
    let rental = load_rental(&conn, rid).await?;
    if rental.renter_id != user.0.id {
        return Err(ErrorResponse::forbidden("Only the renter can pay for this rental"));
    }
    if !rental.status().map_or(false, |status| PAYABLE.contains(&status)) {
        return Err(ErrorResponse::bad_request(format!(
            "Rental in status '{}' is not awaiting payment",
            rental.status
        )));
    }

    let started = start_payment(&conn, gateway, settings, rental, PaymentType::RentalPayment).await?;

    Ok(Json(started))
}
