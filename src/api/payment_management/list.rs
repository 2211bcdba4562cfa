use crate::api::payment_management::models::Payment;
use crate::api::rental_management::get_rental::visible_rental;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::serde::json::Json;

#[get("/rentals/<rid>/payments")]
pub(crate) async fn rental_payments(
    rid: i32,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Vec<Payment>>, ErrorResponse> {
    visible_rental(&conn, rid, &user.0).await?;

    let result = conn
        .run(move |c| {
            use schema::payments::dsl::*;
            payments
                .filter(rental_id.eq(rid))
                .order(created_at.desc())
                .load::<Payment>(c)
        })
        .await
        .map_err(db_error("payments"))?;

    Ok(Json(result))
}
