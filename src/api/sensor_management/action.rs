use crate::api::sensor_management::get_sensor::load_sensor;
use crate::api::sensor_management::models::{Sensor, SensorStatus};
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema::sensors;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;

#[derive(FromForm)]
pub struct FormSensorAction {
    action: String,
    status: Option<String>,
}

#[derive(AsChangeset, Debug, PartialEq, Eq)]
#[diesel(table_name = sensors)]
pub(crate) struct SensorChanges {
    pub(crate) is_active: Option<bool>,
    pub(crate) status: Option<String>,
}

/// Works out the change an admin action makes to a sensor.
pub(crate) fn sensor_changes(
    sensor: &Sensor,
    action: &str,
    status: Option<&str>,
) -> Result<SensorChanges, String> {
    match action {
        "toggle_active" => Ok(SensorChanges {
            is_active: Some(!sensor.is_active),
            status: None,
        }),
        "update_status" => {
            let status = status
                .unwrap_or_default()
                .parse::<SensorStatus>()
                .map_err(|err| err.to_string())?;
            Ok(SensorChanges {
                is_active: None,
                status: Some(status.as_str().to_string()),
            })
        }
        other => Err(format!("Unknown sensor action '{}'", other)),
    }
}

#[post("/admin/sensors/<sid>/action", data = "<form_action>")]
pub(crate) async fn sensor_action(
    sid: i32,
    form_action: Form<FormSensorAction>,
    admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Sensor>, ErrorResponse> {
    let sensor = load_sensor(&conn, sid).await?;
    let changes = sensor_changes(&sensor, &form_action.action, form_action.status.as_deref())
        .map_err(ErrorResponse::bad_request)?;

    let updated = conn
        .run(move |c| diesel::update(&sensor).set(&changes).get_result::<Sensor>(c))
        .await
        .map_err(db_error("sensor"))?;

    tracing::info!(
        sensor_id = sid,
        admin_id = admin.0.id,
        action = %form_action.action,
        status = %updated.status,
        is_active = updated.is_active,
        "sensor updated"
    );

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sensor_management::models::tests::sensor;

    #[test]
    fn toggle_flips_the_active_flag() {
        let changes = sensor_changes(&sensor(None), "toggle_active", None).unwrap();
        assert_eq!(changes.is_active, Some(false));
        assert_eq!(changes.status, None);
    }

    #[test]
    fn status_updates_only_accept_known_statuses() {
        let changes = sensor_changes(&sensor(None), "update_status", Some("maintenance")).unwrap();
        assert_eq!(changes.status.as_deref(), Some("maintenance"));

        assert!(sensor_changes(&sensor(None), "update_status", Some("broken")).is_err());
        assert!(sensor_changes(&sensor(None), "update_status", None).is_err());
        assert!(sensor_changes(&sensor(None), "reboot", None).is_err());
    }
}
