use crate::api::rental_management::models::{Rental, RentalStatus, RentalSummary};
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema::{equipment, rentals};
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;

#[get("/my_rentals")]
pub(crate) async fn my_rentals(
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Vec<RentalSummary>>, ErrorResponse> {
    let uid = user.0.id;
    let rows = conn
        .run(move |c| {
            rentals::table
                .inner_join(equipment::table)
                .filter(rentals::renter_id.eq(uid))
                .order(rentals::created_at.desc())
                .select((rentals::all_columns, equipment::title))
                .load::<(Rental, String)>(c)
                .map_err(|_| {
                    ErrorResponse::new(Status { code: 500 }, "Couldn't load rentals".to_string())
                })
        })
        .await?;

    Ok(Json(rows.into_iter().map(RentalSummary::from).collect()))
}

/// Requests for the caller's equipment, optionally narrowed to one status.
#[get("/rental_requests?<status>")]
pub(crate) async fn rental_requests(
    status: Option<RentalStatus>,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Vec<RentalSummary>>, ErrorResponse> {
    let uid = user.0.id;
    let rows = conn
        .run(move |c| {
            let mut query = rentals::table
                .inner_join(equipment::table)
                .filter(rentals::owner_id.eq(uid))
                .select((rentals::all_columns, equipment::title))
                .into_boxed();
            if let Some(wanted) = status {
                query = query.filter(rentals::status.eq(wanted.as_str()));
            }

            query
                .order(rentals::created_at.desc())
                .load::<(Rental, String)>(c)
                .map_err(|_| {
                    ErrorResponse::new(Status { code: 500 }, "Couldn't load rentals".to_string())
                })
        })
        .await?;

    Ok(Json(rows.into_iter().map(RentalSummary::from).collect()))
}
