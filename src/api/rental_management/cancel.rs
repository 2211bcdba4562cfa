use crate::api::rental_management::get_rental::load_rental;
use crate::api::rental_management::manage::{apply_status, RentalChanges};
use crate::api::rental_management::models::{Rental, RentalStatus};
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use chrono::Utc;
use rocket::serde::json::Json;

#[post("/rentals/<rid>/cancel")]
pub(crate) async fn cancel_rental(
    rid: i32,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Rental>, ErrorResponse> {
    let rental = load_rental(&conn, rid).await?;
    if rental.renter_id != user.0.id {
        return Err(ErrorResponse::forbidden(
            "Only the renter can cancel this rental",
        ));
    }

    let changes = RentalChanges::to_status(RentalStatus::Cancelled, Utc::now().naive_utc());
    let updated = conn
        .run(move |c| apply_status(&rental, &changes, c))
        .await
        .map_err(db_error("rental"))?;

    tracing::info!(rental_id = rid, renter_id = user.0.id, "rental cancelled by renter");

    Ok(Json(updated))
}
