use crate::api::equipment_management::get_equipment::visible_equipment;
use crate::api::form_fields::FormDecimal;
use crate::api::user_management::models::UserLoggedIn;
use crate::api::wishlist_management::models::{NewWishlistItem, WishlistItem};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;

#[derive(FromForm)]
pub struct FormWishlist {
    equipment_id: i32,
    #[field(default = true)]
    notify_when_available: bool,
    max_daily_rate: Option<FormDecimal>,
}

/// Adds a listing to the caller's wishlist. Adding it again replaces the
/// notification settings.
#[post("/wishlist", data = "<form_wishlist>")]
pub(crate) async fn add_to_wishlist(
    form_wishlist: Form<FormWishlist>,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<WishlistItem>, ErrorResponse> {
    let form = form_wishlist.into_inner();
    let item = visible_equipment(&conn, form.equipment_id, Some(&user.0)).await?;

    let entry = NewWishlistItem {
        user_id: user.0.id,
        equipment_id: item.id,
        notify_when_available: form.notify_when_available,
        max_daily_rate: form.max_daily_rate.map(|rate| rate.0),
    };

    let saved = conn
        .run(move |c| {
            use schema::wishlist::dsl::*;
            diesel::insert_into(wishlist)
                .values(&entry)
                .on_conflict((user_id, equipment_id))
                .do_update()
                .set(&entry)
                .get_result::<WishlistItem>(c)
        })
        .await
        .map_err(db_error("wishlist"))?;

    Ok(Json(saved))
}
