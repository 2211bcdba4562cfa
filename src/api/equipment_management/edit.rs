use crate::api::equipment_management::create::{
    ensure_active_category, store_image, validate_prices, ListingPrices,
};
use crate::api::equipment_management::models::{Equipment, EquipmentCondition};
use crate::api::form_fields::FormDecimal;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use crate::schema::equipment;
use crate::settings::Settings;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use rocket::form::Form;
use rocket::http::Status;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket::State;
use rust_decimal::Decimal;

#[derive(FromForm)]
pub struct FormEditEquipment<'a> {
    category_id: Option<i32>,
    title: Option<String>,
    description: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    condition: Option<EquipmentCondition>,
    daily_rate: Option<FormDecimal>,
    weekly_rate: Option<FormDecimal>,
    monthly_rate: Option<FormDecimal>,
    security_deposit: Option<FormDecimal>,
    is_available_for_pickup: Option<bool>,
    is_available_for_delivery: Option<bool>,
    delivery_fee: Option<FormDecimal>,
    location_city: Option<String>,
    location_state: Option<String>,
    image: Option<TempFile<'a>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = equipment)]
struct EquipmentChanges {
    category_id: Option<i32>,
    title: Option<String>,
    description: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    condition: Option<String>,
    daily_rate: Option<Decimal>,
    weekly_rate: Option<Decimal>,
    monthly_rate: Option<Decimal>,
    security_deposit: Option<Decimal>,
    is_available_for_pickup: Option<bool>,
    is_available_for_delivery: Option<bool>,
    delivery_fee: Option<Decimal>,
    location_city: Option<String>,
    location_state: Option<String>,
    updated_at: NaiveDateTime,
}

/// Loads a listing the user may change: their own, or any for admins.
pub(crate) async fn managed_equipment(
    conn: &DbConn,
    eid: i32,
    user: &UserLoggedIn,
) -> Result<Equipment, ErrorResponse> {
    let item = conn
        .run(move |c| {
            use schema::equipment::dsl::*;
            equipment.find(eid).first::<Equipment>(c)
        })
        .await
        .map_err(db_error("equipment"))?;

    if !item.is_managed_by(&user.0) {
        return Err(ErrorResponse::forbidden(
            "You can only manage your own equipment",
        ));
    }

    Ok(item)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[post("/equipment/<eid>/edit", data = "<form_equipment>")]
pub(crate) async fn edit_equipment(
    mut form_equipment: Form<FormEditEquipment<'_>>,
    eid: i32,
    user: UserLoggedIn,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<Json<Equipment>, ErrorResponse> {
    let current = managed_equipment(&conn, eid, &user).await?;

    let daily_rate = form_equipment.daily_rate.map(|rate| rate.0);
    let weekly_rate = form_equipment.weekly_rate.map(|rate| rate.0);
    let monthly_rate = form_equipment.monthly_rate.map(|rate| rate.0);
    let security_deposit = form_equipment.security_deposit.map(|rate| rate.0);
    let delivery_fee = form_equipment.delivery_fee.map(|rate| rate.0);

    validate_prices(&ListingPrices {
        daily_rate: daily_rate.unwrap_or(current.daily_rate),
        weekly_rate: weekly_rate.or(current.weekly_rate),
        monthly_rate: monthly_rate.or(current.monthly_rate),
        security_deposit: security_deposit.unwrap_or(current.security_deposit),
        delivery_fee: delivery_fee.unwrap_or(current.delivery_fee),
    })
    .map_err(ErrorResponse::bad_request)?;

    if let Some(cid) = form_equipment.category_id {
        ensure_active_category(&conn, cid).await?;
    }

    let changes = EquipmentChanges {
        category_id: form_equipment.category_id,
        title: non_blank(&form_equipment.title),
        description: non_blank(&form_equipment.description),
        brand: non_blank(&form_equipment.brand),
        model: non_blank(&form_equipment.model),
        condition: form_equipment
            .condition
            .map(|condition| condition.as_str().to_string()),
        daily_rate,
        weekly_rate,
        monthly_rate,
        security_deposit,
        is_available_for_pickup: form_equipment.is_available_for_pickup,
        is_available_for_delivery: form_equipment.is_available_for_delivery,
        delivery_fee,
        location_city: non_blank(&form_equipment.location_city),
        location_state: non_blank(&form_equipment.location_state),
        updated_at: Utc::now().naive_utc(),
    };

    let item = conn
        .run(move |c| {
            diesel::update(&current)
                .set(&changes)
                .get_result::<Equipment>(c)
        })
        .await
        .map_err(|err| {
            ErrorResponse::new(
                Status { code: 500 },
                format!("Couldn't update data: {}", err),
            )
        })?;

    if let Some(file) = &mut form_equipment.image {
        store_image(settings, eid, file).await.map_err(|err| {
            ErrorResponse::new(
                Status { code: 500 },
                format!("Couldn't save image: {}", err),
            )
        })?;
    }

    tracing::info!(equipment_id = eid, user_id = user.0.id, "equipment updated");

    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_edits_leave_fields_unchanged() {
        assert_eq!(non_blank(&None), None);
        assert_eq!(non_blank(&Some("  ".to_string())), None);
        assert_eq!(
            non_blank(&Some(" Xbox Series X ".to_string())),
            Some("Xbox Series X".to_string())
        );
    }
}
