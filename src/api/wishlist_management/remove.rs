use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::http::Status;

#[delete("/wishlist/<eid>")]
pub(crate) async fn remove_from_wishlist(
    eid: i32,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Status, ErrorResponse> {
    let uid = user.0.id;
    let removed = conn
        .run(move |c| {
            use schema::wishlist::dsl::*;
            diesel::delete(wishlist.filter(user_id.eq(uid)).filter(equipment_id.eq(eid))).execute(c)
        })
        .await
        .map_err(db_error("wishlist"))?;

    if removed == 0 {
        return Err(ErrorResponse::not_found("wishlist entry"));
    }

    Ok(Status::NoContent)
}
