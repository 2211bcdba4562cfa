use crate::api::sensor_management::models::{NewSensor, Sensor, SensorType};
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;

#[derive(FromForm)]
pub struct FormSensor {
    name: String,
    sensor_type: SensorType,
    equipment_id: Option<i32>,
    #[field(default = 60)]
    reading_interval_minutes: i32,
    alert_threshold: Option<String>,
    #[field(default = String::new())]
    description: String,
    #[field(default = String::new())]
    manufacturer: String,
    #[field(default = String::new())]
    model_number: String,
    #[field(default = String::new())]
    serial_number: String,
}

#[post("/admin/sensors", data = "<form_sensor>")]
pub(crate) async fn create_sensor(
    form_sensor: Form<FormSensor>,
    admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Sensor>, ErrorResponse> {
    let form = form_sensor.into_inner();
    if form.name.trim().is_empty() {
        return Err(ErrorResponse::bad_request("Sensor name is required"));
    }
    if form.reading_interval_minutes < 1 {
        return Err(ErrorResponse::bad_request(
            "Reading interval must be at least one minute",
        ));
    }

    if let Some(eid) = form.equipment_id {
        conn.run(move |c| {
            use schema::equipment::dsl::*;
            equipment.find(eid).select(id).first::<i32>(c)
        })
        .await
        .map_err(db_error("equipment"))?;
    }

    let new_sensor = NewSensor {
        name: form.name.trim().to_string(),
        sensor_type: form.sensor_type.as_str().to_string(),
        equipment_id: form.equipment_id,
        reading_interval_minutes: form.reading_interval_minutes,
        alert_threshold: form.alert_threshold.filter(|threshold| !threshold.is_empty()),
        description: form.description,
        manufacturer: form.manufacturer,
        model_number: form.model_number,
        serial_number: form.serial_number,
    };

    let sensor = conn
        .run(move |c| {
            diesel::insert_into(schema::sensors::table)
                .values(&new_sensor)
                .get_result::<Sensor>(c)
        })
        .await
        .map_err(db_error("sensor"))?;

    tracing::info!(sensor_id = sensor.id, admin_id = admin.0.id, "sensor created");

    Ok(Json(sensor))
}
