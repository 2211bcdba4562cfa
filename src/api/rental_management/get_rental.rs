use crate::api::equipment_management::models::Equipment;
use crate::api::payment_management::models::Payment;
use crate::api::rental_management::models::Rental;
use crate::api::user_management::models::{PublicUser, User, UserLoggedIn, UserOut};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::serde::json::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct RentalDetail {
    pub rental: Rental,
    pub equipment: Equipment,
    pub renter: PublicUser,
    pub owner: PublicUser,
    pub payments: Vec<Payment>,
}

pub(crate) async fn load_rental(conn: &DbConn, rid: i32) -> Result<Rental, ErrorResponse> {
    conn.run(move |c| {
        use schema::rentals::dsl::*;
        rentals.find(rid).first::<Rental>(c)
    })
    .await
    .map_err(db_error("rental"))
}

/// Loads a rental the user takes part in, or any rental for admins.
pub(crate) async fn visible_rental(
    conn: &DbConn,
    rid: i32,
    user: &UserOut,
) -> Result<Rental, ErrorResponse> {
    let rental = load_rental(conn, rid).await?;
    if !rental.is_visible_to(user) {
        return Err(ErrorResponse::forbidden(
            "You are not part of this rental",
        ));
    }
    Ok(rental)
}

pub(crate) async fn rental_detail(conn: &DbConn, rental: Rental) -> Result<RentalDetail, ErrorResponse> {
    conn.run(move |c| {
        let item = schema::equipment::table
            .find(rental.equipment_id)
            .first::<Equipment>(c)?;
        let renter = schema::users::table
            .find(rental.renter_id)
            .first::<User>(c)?;
        let owner = schema::users::table
            .find(rental.owner_id)
            .first::<User>(c)?;
        let payments = {
            use schema::payments::dsl::*;
            payments
                .filter(rental_id.eq(rental.id))
                .order(created_at.desc())
                .load::<Payment>(c)?
        };

        Ok::<_, diesel::result::Error>(RentalDetail {
            rental,
            equipment: item,
            renter: PublicUser::from(renter),
            owner: PublicUser::from(owner),
            payments,
        })
    })
    .await
    .map_err(db_error("rental"))
}

#[get("/rentals/<rid>")]
pub(crate) async fn get_rental(
    rid: i32,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<RentalDetail>, ErrorResponse> {
    let rental = visible_rental(&conn, rid, &user.0).await?;
    Ok(Json(rental_detail(&conn, rental).await?))
}
