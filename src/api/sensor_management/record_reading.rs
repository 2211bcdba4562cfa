use crate::api::form_fields::FormDecimal;
use crate::api::sensor_management::get_sensor::load_sensor;
use crate::api::sensor_management::models::{NewSensorReading, SensorReading};
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use chrono::Utc;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;
use rust_decimal::Decimal;

#[derive(FromForm)]
pub struct FormReading {
    value: String,
    #[field(default = String::new())]
    unit: String,
    quality_score: Option<FormDecimal>,
    #[field(default = false)]
    is_alert: bool,
}

pub(crate) fn validate_quality(score: Option<Decimal>) -> Result<(), String> {
    match score {
        Some(score) if score < Decimal::ZERO || score > Decimal::ONE => {
            Err("Quality score must be between 0 and 1".to_string())
        }
        _ => Ok(()),
    }
}

/// Stores a reading and makes it the sensor's current value.
#[post("/admin/sensors/<sid>/readings", data = "<form_reading>")]
pub(crate) async fn record_reading(
    sid: i32,
    form_reading: Form<FormReading>,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<SensorReading>, ErrorResponse> {
    let form = form_reading.into_inner();
    let quality = form.quality_score.map(|score| score.0);
    validate_quality(quality).map_err(ErrorResponse::bad_request)?;
    if form.value.trim().is_empty() {
        return Err(ErrorResponse::bad_request("Reading value is required"));
    }

    let sensor = load_sensor(&conn, sid).await?;
    let now = Utc::now().naive_utc();
    let new_reading = NewSensorReading {
        sensor_id: sensor.id,
        value: form.value.trim().to_string(),
        unit: form.unit,
        quality_score: quality,
        is_alert: form.is_alert,
        recorded_at: now,
    };

    let reading = conn
        .run(move |c| {
            c.transaction::<_, diesel::result::Error, _>(|c| {
                let reading = diesel::insert_into(schema::sensor_readings::table)
                    .values(&new_reading)
                    .get_result::<SensorReading>(c)?;

                use schema::sensors::dsl::*;
                diesel::update(sensors.find(sid))
                    .set((
                        current_value.eq(Some(reading.value.clone())),
                        last_reading.eq(Some(now)),
                    ))
                    .execute(c)?;

                Ok(reading)
            })
        })
        .await
        .map_err(db_error("sensor reading"))?;

    if reading.is_alert {
        tracing::warn!(sensor_id = sid, value = %reading.value, "sensor alert reading");
    }

    Ok(Json(reading))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quality_is_a_fraction() {
        assert!(validate_quality(None).is_ok());
        assert!(validate_quality(Some(dec!(0.95))).is_ok());
        assert!(validate_quality(Some(dec!(1))).is_ok());
        assert!(validate_quality(Some(dec!(1.01))).is_err());
        assert!(validate_quality(Some(dec!(-0.1))).is_err());
    }
}
