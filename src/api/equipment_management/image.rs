use crate::api::equipment_management::create::{image_path, store_image};
use crate::api::equipment_management::edit::managed_equipment;
use crate::api::equipment_management::get_equipment::visible_equipment;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::settings::Settings;
use rocket::form::Form;
use rocket::fs::{NamedFile, TempFile};
use rocket::http::Status;
use rocket::State;

#[derive(FromForm)]
pub struct FormImage<'a> {
    image: TempFile<'a>,
}

#[get("/equipment/<eid>/image")]
pub(crate) async fn get_equipment_image(
    eid: i32,
    user: Option<UserLoggedIn>,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<NamedFile, ErrorResponse> {
    let user = user.map(|user| user.0);
    visible_equipment(&conn, eid, user.as_ref()).await?;

    NamedFile::open(image_path(settings, eid))
        .await
        .map_err(|_| ErrorResponse::not_found("image"))
}

#[post("/equipment/<eid>/image", data = "<form_image>")]
pub(crate) async fn upload_equipment_image(
    mut form_image: Form<FormImage<'_>>,
    eid: i32,
    user: UserLoggedIn,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<&'static str, ErrorResponse> {
    managed_equipment(&conn, eid, &user).await?;

    store_image(settings, eid, &mut form_image.image)
        .await
        .map_err(|err| {
            ErrorResponse::new(
                Status { code: 500 },
                format!("Couldn't save image: {}", err),
            )
        })?;

    Ok("Success")
}
