use crate::api::category_management::models::{Category, CategoryOut};
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;

#[get("/categories")]
pub(crate) async fn list_categories(conn: DbConn) -> Result<Json<Vec<Category>>, ErrorResponse> {
    let categories = conn
        .run(|c| {
            use schema::equipment_categories::dsl::*;
            equipment_categories
                .filter(is_active.eq(true))
                .order(name.asc())
                .load::<Category>(c)
                .map_err(|_| {
                    ErrorResponse::new(Status { code: 500 }, "Couldn't load categories".to_string())
                })
        })
        .await?;

    Ok(Json(categories))
}

#[get("/admin/categories")]
pub(crate) async fn admin_list_categories(
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Vec<CategoryOut>>, ErrorResponse> {
    let rows = conn
        .run(|c| {
            use diesel::dsl::count;
            use schema::{equipment, equipment_categories};

            equipment_categories::table
                .left_join(equipment::table)
                .group_by(equipment_categories::id)
                .select((
                    equipment_categories::all_columns,
                    count(equipment::id.nullable()),
                ))
                .order(equipment_categories::name.asc())
                .load::<(Category, i64)>(c)
                .map_err(|_| {
                    ErrorResponse::new(Status { code: 500 }, "Couldn't load categories".to_string())
                })
        })
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(category, equipment_count)| CategoryOut {
                category,
                equipment_count,
            })
            .collect(),
    ))
}
