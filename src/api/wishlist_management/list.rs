use crate::api::equipment_management::models::Equipment;
use crate::api::user_management::models::UserLoggedIn;
use crate::api::wishlist_management::models::{WishlistEntry, WishlistItem};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema::{equipment, wishlist};
use diesel::prelude::*;
use rocket::serde::json::Json;

#[get("/wishlist")]
pub(crate) async fn list_wishlist(
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Vec<WishlistEntry>>, ErrorResponse> {
    let uid = user.0.id;
    let rows = conn
        .run(move |c| {
            wishlist::table
                .inner_join(equipment::table)
                .filter(wishlist::user_id.eq(uid))
                .order(wishlist::created_at.desc())
                .load::<(WishlistItem, Equipment)>(c)
        })
        .await
        .map_err(db_error("wishlist"))?;

    Ok(Json(
        rows.into_iter()
            .map(|(item, listing)| WishlistEntry::new(item, listing))
            .collect(),
    ))
}
