use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;

use crate::schema::{sensor_readings, sensors};

pub use crate::api::choices::{SensorStatus, SensorType};

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = sensors)]
pub struct Sensor {
    pub id: i32,
    pub name: String,
    pub sensor_type: String,
    pub equipment_id: Option<i32>,
    pub current_value: Option<String>,
    pub last_reading: Option<NaiveDateTime>,
    pub status: String,
    pub is_active: bool,
    pub reading_interval_minutes: i32,
    pub alert_threshold: Option<String>,
    pub description: String,
    pub manufacturer: String,
    pub model_number: String,
    pub serial_number: String,
    pub created_at: NaiveDateTime,
}

impl Sensor {
    /// A sensor is online when it reported within the last hour.
    pub fn is_online(&self, now: NaiveDateTime) -> bool {
        self.last_reading
            .map_or(false, |reading| now - reading < Duration::hours(1))
    }
}

#[derive(Insertable)]
#[diesel(table_name = sensors)]
pub(crate) struct NewSensor {
    pub(crate) name: String,
    pub(crate) sensor_type: String,
    pub(crate) equipment_id: Option<i32>,
    pub(crate) reading_interval_minutes: i32,
    pub(crate) alert_threshold: Option<String>,
    pub(crate) description: String,
    pub(crate) manufacturer: String,
    pub(crate) model_number: String,
    pub(crate) serial_number: String,
}

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = sensor_readings)]
pub struct SensorReading {
    pub id: i32,
    pub sensor_id: i32,
    pub value: String,
    pub unit: String,
    pub quality_score: Option<Decimal>,
    pub is_alert: bool,
    pub recorded_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = sensor_readings)]
pub(crate) struct NewSensorReading {
    pub(crate) sensor_id: i32,
    pub(crate) value: String,
    pub(crate) unit: String,
    pub(crate) quality_score: Option<Decimal>,
    pub(crate) is_alert: bool,
    pub(crate) recorded_at: NaiveDateTime,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    pub(crate) fn sensor(last_reading: Option<NaiveDateTime>) -> Sensor {
        Sensor {
            id: 1,
            name: "Console temperature".to_string(),
            sensor_type: "temperature".to_string(),
            equipment_id: Some(10),
            current_value: None,
            last_reading,
            status: "active".to_string(),
            is_active: true,
            reading_interval_minutes: 60,
            alert_threshold: None,
            description: String::new(),
            manufacturer: String::new(),
            model_number: String::new(),
            serial_number: String::new(),
            created_at: at(0, 0),
        }
    }

    #[test]
    fn online_means_a_reading_within_the_hour() {
        assert!(sensor(Some(at(11, 30))).is_online(at(12, 0)));
        assert!(!sensor(Some(at(11, 0))).is_online(at(12, 0)));
        assert!(!sensor(None).is_online(at(12, 0)));
    }
}
