use crate::api::equipment_management::create::image_path;
use crate::api::equipment_management::edit::managed_equipment;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use crate::settings::Settings;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::State;

#[delete("/equipment/<eid>")]
pub(crate) async fn delete_equipment(
    user: UserLoggedIn,
    eid: i32,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<(), ErrorResponse> {
    let item = managed_equipment(&conn, eid, &user).await?;

    let image_file = image_path(settings, item.id);
    conn.run(move |c| {
        use schema::equipment::dsl::*;
        diesel::delete(equipment.find(item.id)).execute(c)
    })
    .await
    .map_err(|_| {
        ErrorResponse::new(
            Status { code: 500 },
            "Couldn't delete database entries".to_string(),
        )
    })?;

    rocket::tokio::fs::remove_file(image_file).await.ok();

    tracing::info!(equipment_id = eid, user_id = user.0.id, "equipment deleted");

    Ok(())
}
