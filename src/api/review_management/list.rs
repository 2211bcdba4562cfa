use crate::api::equipment_management::get_equipment::visible_equipment;
use crate::api::review_management::models::Review;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::serde::json::Json;

#[get("/equipment/<eid>/reviews")]
pub(crate) async fn equipment_reviews(
    eid: i32,
    user: Option<UserLoggedIn>,
    conn: DbConn,
) -> Result<Json<Vec<Review>>, ErrorResponse> {
    let user = user.map(|user| user.0);
    visible_equipment(&conn, eid, user.as_ref()).await?;

    let result = conn
        .run(move |c| {
            use schema::reviews::dsl::*;
            reviews
                .filter(equipment_id.eq(eid))
                .filter(is_public.eq(true))
                .order(created_at.desc())
                .load::<Review>(c)
        })
        .await
        .map_err(db_error("reviews"))?;

    Ok(Json(result))
}
