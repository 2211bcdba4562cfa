use std::path::{Path, PathBuf};

use crate::api::choices::EquipmentStatus;
use crate::api::equipment_management::models::{Equipment, EquipmentCondition};
use crate::api::form_fields::FormDecimal;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use crate::schema::equipment;
use crate::settings::Settings;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use rust_decimal::Decimal;

#[derive(FromForm)]
pub struct FormEquipment<'a> {
    category_id: i32,
    title: String,
    description: String,
    brand: String,
    model: String,
    condition: EquipmentCondition,
    daily_rate: FormDecimal,
    weekly_rate: Option<FormDecimal>,
    monthly_rate: Option<FormDecimal>,
    security_deposit: Option<FormDecimal>,
    #[field(default = true)]
    is_available_for_pickup: bool,
    #[field(default = false)]
    is_available_for_delivery: bool,
    delivery_fee: Option<FormDecimal>,
    location_city: String,
    location_state: String,
    image: Option<TempFile<'a>>,
}

#[derive(Insertable)]
#[diesel(table_name = equipment)]
struct NewEquipment {
    owner_id: i32,
    category_id: i32,
    title: String,
    description: String,
    brand: String,
    model: String,
    condition: String,
    daily_rate: Decimal,
    weekly_rate: Option<Decimal>,
    monthly_rate: Option<Decimal>,
    security_deposit: Decimal,
    is_available_for_pickup: bool,
    is_available_for_delivery: bool,
    delivery_fee: Decimal,
    location_city: String,
    location_state: String,
    status: String,
}

/// Prices of a listing as entered by its owner.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListingPrices {
    pub(crate) daily_rate: Decimal,
    pub(crate) weekly_rate: Option<Decimal>,
    pub(crate) monthly_rate: Option<Decimal>,
    pub(crate) security_deposit: Decimal,
    pub(crate) delivery_fee: Decimal,
}

pub(crate) fn validate_prices(prices: &ListingPrices) -> Result<(), String> {
    if prices.daily_rate < Decimal::ONE {
        return Err("Daily rate must be at least 1.00".to_string());
    }
    if prices.weekly_rate.map_or(false, |rate| rate <= Decimal::ZERO)
        || prices.monthly_rate.map_or(false, |rate| rate <= Decimal::ZERO)
    {
        return Err("Weekly and monthly rates must be positive".to_string());
    }
    if prices.security_deposit < Decimal::ZERO || prices.delivery_fee < Decimal::ZERO {
        return Err("Deposit and delivery fee can't be negative".to_string());
    }
    Ok(())
}

pub(crate) fn validate_text(fields: &[(&str, &str)]) -> Result<(), String> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(format!("{} is required", name)),
        None => Ok(()),
    }
}

pub(crate) fn image_path(settings: &Settings, equipment_id: i32) -> PathBuf {
    Path::new(&settings.image_folder)
        .join("equipment")
        .join(equipment_id.to_string())
}

/// Stores an uploaded listing image, creating the image folder on demand.
pub(crate) async fn store_image(
    settings: &Settings,
    equipment_id: i32,
    image: &mut TempFile<'_>,
) -> std::io::Result<()> {
    let path = image_path(settings, equipment_id);
    if let Some(folder) = path.parent() {
        rocket::tokio::fs::create_dir_all(folder).await?;
    }
    image.copy_to(path).await
}

pub(crate) async fn ensure_active_category(conn: &DbConn, cid: i32) -> Result<(), ErrorResponse> {
    let exists = conn
        .run(move |c| {
            use schema::equipment_categories::dsl::*;
            diesel::select(diesel::dsl::exists(
                equipment_categories.filter(id.eq(cid)).filter(is_active.eq(true)),
            ))
            .get_result::<bool>(c)
        })
        .await
        .map_err(|_| {
            ErrorResponse::new(Status { code: 500 }, "Couldn't load category".to_string())
        })?;

    if !exists {
        return Err(ErrorResponse::bad_request("Unknown category"));
    }
    Ok(())
}

#[post("/equipment", data = "<form_equipment>")]
pub(crate) async fn create_equipment(
    mut form_equipment: Form<FormEquipment<'_>>,
    user: UserLoggedIn,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<Json<Equipment>, ErrorResponse> {
    if !user.0.can_list_equipment() {
        return Err(ErrorResponse::forbidden(
            "Only vendors can list equipment",
        ));
    }

    let prices = ListingPrices {
        daily_rate: form_equipment.daily_rate.0,
        weekly_rate: form_equipment.weekly_rate.map(|rate| rate.0),
        monthly_rate: form_equipment.monthly_rate.map(|rate| rate.0),
        security_deposit: form_equipment
            .security_deposit
            .map_or(Decimal::ZERO, |deposit| deposit.0),
        delivery_fee: form_equipment.delivery_fee.map_or(Decimal::ZERO, |fee| fee.0),
    };
    validate_prices(&prices).map_err(ErrorResponse::bad_request)?;
    validate_text(&[
        ("Title", form_equipment.title.as_str()),
        ("Description", form_equipment.description.as_str()),
        ("Brand", form_equipment.brand.as_str()),
        ("Model", form_equipment.model.as_str()),
        ("City", form_equipment.location_city.as_str()),
        ("State", form_equipment.location_state.as_str()),
    ])
    .map_err(ErrorResponse::bad_request)?;
    ensure_active_category(&conn, form_equipment.category_id).await?;

    let new_equipment = NewEquipment {
        owner_id: user.0.id,
        category_id: form_equipment.category_id,
        title: form_equipment.title.trim().to_string(),
        description: form_equipment.description.clone(),
        brand: form_equipment.brand.trim().to_string(),
        model: form_equipment.model.trim().to_string(),
        condition: form_equipment.condition.as_str().to_string(),
        daily_rate: prices.daily_rate,
        weekly_rate: prices.weekly_rate,
        monthly_rate: prices.monthly_rate,
        security_deposit: prices.security_deposit,
        is_available_for_pickup: form_equipment.is_available_for_pickup,
        is_available_for_delivery: form_equipment.is_available_for_delivery,
        delivery_fee: prices.delivery_fee,
        location_city: form_equipment.location_city.trim().to_string(),
        location_state: form_equipment.location_state.trim().to_string(),
        status: EquipmentStatus::Pending.as_str().to_string(),
    };

    let item = conn
        .run(move |c| {
            use schema::equipment::dsl::*;
            diesel::insert_into(equipment)
                .values(&new_equipment)
                .get_result::<Equipment>(c)
                .map_err(|err| {
                    ErrorResponse::new(
                        Status { code: 500 },
                        format!("Couldn't create equipment: {}", err),
                    )
                })
        })
        .await?;

    if let Some(image) = &mut form_equipment.image {
        if let Err(err) = store_image(settings, item.id, image).await {
            // roll back db
            let eid = item.id;
            conn.run(move |c| {
                use schema::equipment::dsl::*;
                diesel::delete(equipment.find(eid)).execute(c)
            })
            .await
            .ok();

            return Err(ErrorResponse::new(
                Status { code: 500 },
                format!("Couldn't save image: {}", err),
            ));
        }
    }

    tracing::info!(
        equipment_id = item.id,
        owner_id = item.owner_id,
        "equipment listed, awaiting approval"
    );

    Ok(Json(item))
}
