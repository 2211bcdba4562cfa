use std::collections::HashMap;

use crate::api::equipment_management::list::search_pattern;
use crate::api::pagination::{self, Page, PER_PAGE};
use crate::api::sensor_management::models::{Sensor, SensorStatus, SensorType};
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use crate::schema::sensors;
use chrono::{Duration, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use rocket::serde::json::Json;
use serde::Serialize;

#[derive(FromForm)]
pub struct SensorFilter {
    search: Option<String>,
    sensor_type: Option<SensorType>,
    status: Option<SensorStatus>,
    page: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct SensorRow {
    #[serde(flatten)]
    pub sensor: Sensor,
    pub equipment_title: Option<String>,
    pub reading_count: i64,
    pub online: bool,
}

#[derive(Serialize, Debug)]
pub struct SensorList {
    pub sensors: Page<SensorRow>,
    pub total_sensors: i64,
    pub active_sensors: i64,
    pub online_sensors: i64,
}

fn filtered(filter: &SensorFilter) -> sensors::BoxedQuery<'static, Pg> {
    use schema::equipment;
    use schema::sensors::dsl::*;

    let mut query = sensors.into_boxed();

    if let Some(pattern) = filter.search.as_deref().and_then(search_pattern) {
        let matching_equipment = equipment::table
            .filter(equipment::title.ilike(pattern.clone()))
            .select(equipment::id.nullable());
        query = query.filter(
            name.ilike(pattern.clone())
                .or(description.ilike(pattern))
                .or(equipment_id.eq_any(matching_equipment)),
        );
    }
    if let Some(kind) = filter.sensor_type {
        query = query.filter(sensor_type.eq(kind.as_str()));
    }
    if let Some(wanted) = filter.status {
        query = query.filter(status.eq(wanted.as_str()));
    }

    query
}

#[get("/admin/sensors?<filter..>")]
pub(crate) async fn list_sensors(
    filter: SensorFilter,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<SensorList>, ErrorResponse> {
    let page = pagination::page_number(filter.page);
    let now = Utc::now().naive_utc();

    let list = conn
        .run(move |c| {
            let total_sensors = filtered(&filter).count().get_result::<i64>(c)?;
            let active_sensors = filtered(&filter)
                .filter(sensors::status.eq(SensorStatus::Active.as_str()))
                .count()
                .get_result::<i64>(c)?;
            let online_sensors = filtered(&filter)
                .filter(sensors::last_reading.gt(now - Duration::hours(1)))
                .count()
                .get_result::<i64>(c)?;

            let items = filtered(&filter)
                .order((sensors::created_at.desc(), sensors::id.desc()))
                .limit(PER_PAGE)
                .offset(pagination::offset(page))
                .load::<Sensor>(c)?;

            let ids: Vec<i32> = items.iter().map(|sensor| sensor.id).collect();
            let counts: HashMap<i32, i64> = {
                use schema::sensor_readings::dsl::*;
                sensor_readings
                    .filter(sensor_id.eq_any(&ids))
                    .group_by(sensor_id)
                    .select((sensor_id, diesel::dsl::count_star()))
                    .load::<(i32, i64)>(c)?
                    .into_iter()
                    .collect()
            };

            let equipment_ids: Vec<i32> = items.iter().filter_map(|sensor| sensor.equipment_id).collect();
            let titles: HashMap<i32, String> = {
                use schema::equipment::dsl::*;
                equipment
                    .filter(id.eq_any(&equipment_ids))
                    .select((id, title))
                    .load::<(i32, String)>(c)?
                    .into_iter()
                    .collect()
            };

            let rows = items
                .into_iter()
                .map(|sensor| SensorRow {
                    equipment_title: sensor.equipment_id.and_then(|eid| titles.get(&eid).cloned()),
                    reading_count: counts.get(&sensor.id).copied().unwrap_or(0),
                    online: sensor.is_online(now),
                    sensor,
                })
                .collect();

            Ok::<_, diesel::result::Error>(SensorList {
                sensors: Page::new(rows, page, total_sensors),
                total_sensors,
                active_sensors,
                online_sensors,
            })
        })
        .await
        .map_err(db_error("sensors"))?;

    Ok(Json(list))
}
