use crate::api::sensor_management::models::{Sensor, SensorReading};
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::serde::json::Json;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

const LATEST_READINGS: i64 = 50;

#[derive(Serialize, Debug)]
pub struct SensorDetail {
    pub sensor: Sensor,
    pub readings: Vec<SensorReading>,
    pub total_readings: usize,
    pub average_quality: Decimal,
}

/// Mean quality score of the readings that carry one, zero otherwise.
pub(crate) fn average_quality(readings: &[SensorReading]) -> Decimal {
    let scores: Vec<Decimal> = readings.iter().filter_map(|reading| reading.quality_score).collect();
    if scores.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = scores.iter().sum();
    (sum / Decimal::from(scores.len())).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) async fn load_sensor(conn: &DbConn, sid: i32) -> Result<Sensor, ErrorResponse> {
    conn.run(move |c| {
        use schema::sensors::dsl::*;
        sensors.find(sid).first::<Sensor>(c)
    })
    .await
    .map_err(db_error("sensor"))
}

#[get("/admin/sensors/<sid>")]
pub(crate) async fn get_sensor(
    sid: i32,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<SensorDetail>, ErrorResponse> {
    let sensor = load_sensor(&conn, sid).await?;

    let readings = conn
        .run(move |c| {
            use schema::sensor_readings::dsl::*;
            sensor_readings
                .filter(sensor_id.eq(sid))
                .order(recorded_at.desc())
                .limit(LATEST_READINGS)
                .load::<SensorReading>(c)
        })
        .await
        .map_err(db_error("sensor readings"))?;

    Ok(Json(SensorDetail {
        total_readings: readings.len(),
        average_quality: average_quality(&readings),
        sensor,
        readings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sensor_management::models::tests::at;
    use rust_decimal_macros::dec;

    fn reading(quality_score: Option<Decimal>) -> SensorReading {
        SensorReading {
            id: 1,
            sensor_id: 1,
            value: "41.5".to_string(),
            unit: "C".to_string(),
            quality_score,
            is_alert: false,
            recorded_at: at(12, 0),
        }
    }

    #[test]
    fn average_skips_unscored_readings() {
        let readings = vec![
            reading(Some(dec!(0.90))),
            reading(None),
            reading(Some(dec!(0.75))),
            reading(Some(dec!(0.80))),
        ];
        assert_eq!(average_quality(&readings), dec!(0.82));
    }

    #[test]
    fn no_scores_average_to_zero() {
        assert_eq!(average_quality(&[]), Decimal::ZERO);
        assert_eq!(average_quality(&[reading(None)]), Decimal::ZERO);
    }
}
