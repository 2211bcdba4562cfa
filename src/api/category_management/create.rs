use crate::api::category_management::models::Category;
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use crate::schema::equipment_categories;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::form::Form;
use rocket::http::Status;
use rocket::serde::json::Json;

#[derive(FromForm)]
pub struct FormCategory {
    name: String,
    #[field(default = String::new())]
    description: String,
    #[field(default = String::new())]
    icon: String,
}

#[derive(Insertable)]
#[diesel(table_name = equipment_categories)]
struct NewCategory {
    name: String,
    description: String,
    icon: String,
}

#[post("/admin/categories", data = "<form_category>")]
pub(crate) async fn create_category(
    admin: AdminUser,
    form_category: Form<FormCategory>,
    conn: DbConn,
) -> Result<Json<Category>, ErrorResponse> {
    let form = form_category.into_inner();
    let category_name = form.name.trim().to_string();
    if category_name.is_empty() {
        return Err(ErrorResponse::bad_request("Category name is required"));
    }

    let new_category = NewCategory {
        name: category_name,
        description: form.description,
        icon: form.icon,
    };

    let category = conn
        .run(move |c| {
            use schema::equipment_categories::dsl::*;
            diesel::insert_into(equipment_categories)
                .values(&new_category)
                .get_result::<Category>(c)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ErrorResponse::new(
                            Status { code: 409 },
                            "Category already exists".to_string(),
                        )
                    }
                    err => ErrorResponse::new(
                        Status { code: 500 },
                        format!("Couldn't create category: {}", err),
                    ),
                })
        })
        .await?;

    tracing::info!(admin_id = admin.0.id, category_id = category.id, "category created");

    Ok(Json(category))
}

#[post("/admin/categories/<cid>/toggle")]
pub(crate) async fn toggle_category(
    _admin: AdminUser,
    cid: i32,
    conn: DbConn,
) -> Result<Json<Category>, ErrorResponse> {
    let category = conn
        .run(move |c| {
            use schema::equipment_categories::dsl::*;
            diesel::update(equipment_categories.find(cid))
                .set(is_active.eq(diesel::dsl::not(is_active)))
                .get_result::<Category>(c)
                .map_err(db_error("category"))
        })
        .await?;

    tracing::info!(category_id = cid, is_active = category.is_active, "category toggled");

    Ok(Json(category))
}
