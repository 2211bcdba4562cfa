use crate::api::category_management::models::Category;
use crate::api::equipment_management::models::Equipment;
use crate::api::review_management::models::Review;
use crate::api::user_management::models::{PublicUser, User, UserLoggedIn, UserOut};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::serde::json::Json;
use serde::Serialize;

const RECENT_REVIEWS: i64 = 10;

#[derive(Serialize)]
pub struct EquipmentDetail {
    pub equipment: Equipment,
    pub category: Category,
    pub owner: PublicUser,
    pub reviews: Vec<Review>,
    pub in_wishlist: bool,
}

/// Loads a listing, hiding it from users that may not see it.
pub(crate) async fn visible_equipment(
    conn: &DbConn,
    eid: i32,
    user: Option<&UserOut>,
) -> Result<Equipment, ErrorResponse> {
    let item = conn
        .run(move |c| {
            use schema::equipment::dsl::*;
            equipment.find(eid).first::<Equipment>(c)
        })
        .await
        .map_err(db_error("equipment"))?;

    if !item.is_visible_to(user) {
        return Err(ErrorResponse::not_found("equipment"));
    }

    Ok(item)
}

#[get("/equipment/<eid>")]
pub(crate) async fn get_equipment(
    eid: i32,
    user: Option<UserLoggedIn>,
    conn: DbConn,
) -> Result<Json<EquipmentDetail>, ErrorResponse> {
    let user = user.map(|user| user.0);
    let item = visible_equipment(&conn, eid, user.as_ref()).await?;
    let viewer = user.map(|user| user.id);

    let detail = conn
        .run(move |c| {
            let item = {
                use schema::equipment::dsl::*;
                diesel::update(equipment.find(item.id))
                    .set(view_count.eq(view_count + 1))
                    .get_result::<Equipment>(c)?
            };

            let category = {
                use schema::equipment_categories::dsl::*;
                equipment_categories
                    .find(item.category_id)
                    .first::<Category>(c)?
            };

            let owner = {
                use schema::users::dsl::*;
                users.find(item.owner_id).first::<User>(c)?
            };

            let reviews = {
                use schema::reviews::dsl::*;
                reviews
                    .filter(equipment_id.eq(item.id))
                    .filter(is_public.eq(true))
                    .order(created_at.desc())
                    .limit(RECENT_REVIEWS)
                    .load::<Review>(c)?
            };

            let in_wishlist = match viewer {
                Some(viewer) => {
                    use schema::wishlist::dsl::*;
                    diesel::select(diesel::dsl::exists(
                        wishlist
                            .filter(user_id.eq(viewer))
                            .filter(equipment_id.eq(item.id)),
                    ))
                    .get_result::<bool>(c)?
                }
                None => false,
            };

            Ok::<_, diesel::result::Error>(EquipmentDetail {
                owner: PublicUser::from(owner),
                equipment: item,
                category,
                reviews,
                in_wishlist,
            })
        })
        .await
        .map_err(db_error("equipment"))?;

    Ok(Json(detail))
}
