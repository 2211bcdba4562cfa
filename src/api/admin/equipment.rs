use crate::api::category_management::models::Category;
use crate::api::choices::{EquipmentStatus, RentalStatus};
use crate::api::equipment_management::list::search_pattern;
use crate::api::equipment_management::models::Equipment;
use crate::api::pagination::{self, Page, PER_PAGE};
use crate::api::rental_management::models::Rental;
use crate::api::user_management::models::{AdminUser, PublicUser, User};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema::{equipment, equipment_categories, rentals, users};
use chrono::Utc;
use diesel::dsl::sum;
use diesel::pg::Pg;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;
use rust_decimal::Decimal;
use serde::Serialize;

const DETAIL_ROWS: i64 = 10;

#[derive(FromForm)]
pub struct AdminEquipmentFilter {
    search: Option<String>,
    category: Option<i32>,
    status: Option<EquipmentStatus>,
    page: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct EquipmentRow {
    #[serde(flatten)]
    pub equipment: Equipment,
    pub owner_username: String,
    pub category_name: String,
}

#[derive(Serialize, Debug)]
pub struct RenterRental {
    #[serde(flatten)]
    pub rental: Rental,
    pub renter_username: String,
}

#[derive(Serialize, Debug)]
pub struct AdminEquipmentDetail {
    pub equipment: Equipment,
    pub owner: PublicUser,
    pub category: Category,
    pub rentals: Vec<RenterRental>,
    pub total_rentals: i64,
    pub total_revenue: Decimal,
}

fn filtered(filter: &AdminEquipmentFilter) -> equipment::BoxedQuery<'static, Pg> {
    let mut query = equipment::table.into_boxed();

    if let Some(pattern) = filter.search.as_deref().and_then(search_pattern) {
        query = query.filter(
            equipment::title
                .ilike(pattern.clone())
                .or(equipment::description.ilike(pattern.clone()))
                .or(equipment::brand.ilike(pattern.clone()))
                .or(equipment::model.ilike(pattern)),
        );
    }
    if let Some(cid) = filter.category {
        query = query.filter(equipment::category_id.eq(cid));
    }
    if let Some(wanted) = filter.status {
        query = query.filter(equipment::status.eq(wanted.as_str()));
    }

    query
}

#[get("/admin/equipment?<filter..>")]
pub(crate) async fn list_equipment(
    filter: AdminEquipmentFilter,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Page<EquipmentRow>>, ErrorResponse> {
    let page = pagination::page_number(filter.page);

    let result = conn
        .run(move |c| {
            let total = filtered(&filter).count().get_result::<i64>(c)?;
            let items = filtered(&filter)
                .order((equipment::created_at.desc(), equipment::id.desc()))
                .limit(PER_PAGE)
                .offset(pagination::offset(page))
                .load::<Equipment>(c)?;

            let ids: Vec<i32> = items.iter().map(|item| item.id).collect();
            let labels = equipment::table
                .inner_join(users::table)
                .inner_join(equipment_categories::table)
                .filter(equipment::id.eq_any(&ids))
                .select((equipment::id, users::username, equipment_categories::name))
                .load::<(i32, String, String)>(c)?;

            let rows = items
                .into_iter()
                .map(|item| {
                    let (owner_username, category_name) = labels
                        .iter()
                        .find(|(id, _, _)| *id == item.id)
                        .map(|(_, owner, category)| (owner.clone(), category.clone()))
                        .unwrap_or_default();
                    EquipmentRow {
                        equipment: item,
                        owner_username,
                        category_name,
                    }
                })
                .collect();

            Ok::<_, diesel::result::Error>(Page::new(rows, page, total))
        })
        .await
        .map_err(db_error("equipment"))?;

    Ok(Json(result))
}

#[get("/admin/equipment/<eid>")]
pub(crate) async fn equipment_detail(
    eid: i32,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<AdminEquipmentDetail>, ErrorResponse> {
    let detail = conn
        .run(move |c| {
            let item = equipment::table.find(eid).first::<Equipment>(c)?;
            let owner = users::table.find(item.owner_id).first::<User>(c)?;
            let category = equipment_categories::table
                .find(item.category_id)
                .first::<Category>(c)?;

            let recent = rentals::table
                .inner_join(users::table.on(users::id.eq(rentals::renter_id)))
                .filter(rentals::equipment_id.eq(eid))
                .order(rentals::created_at.desc())
                .limit(DETAIL_ROWS)
                .select((rentals::all_columns, users::username))
                .load::<(Rental, String)>(c)?
                .into_iter()
                .map(|(rental, renter_username)| RenterRental {
                    rental,
                    renter_username,
                })
                .collect();

            let total_rentals = rentals::table
                .filter(rentals::equipment_id.eq(eid))
                .count()
                .get_result::<i64>(c)?;
            let total_revenue = rentals::table
                .filter(rentals::equipment_id.eq(eid))
                .filter(rentals::status.eq(RentalStatus::Completed.as_str()))
                .select(sum(rentals::total_amount))
                .first::<Option<Decimal>>(c)?;

            Ok::<_, diesel::result::Error>(AdminEquipmentDetail {
                equipment: item,
                owner: PublicUser::from(owner),
                category,
                rentals: recent,
                total_rentals,
                total_revenue: total_revenue.unwrap_or(Decimal::ZERO),
            })
        })
        .await
        .map_err(db_error("equipment"))?;

    Ok(Json(detail))
}

/// Listing status an admin moderation action leads to.
pub(crate) fn moderation_status(action: &str) -> Option<EquipmentStatus> {
    match action {
        "approve" => Some(EquipmentStatus::Active),
        "reject" => Some(EquipmentStatus::Rejected),
        "suspend" => Some(EquipmentStatus::Suspended),
        _ => None,
    }
}

#[derive(FromForm)]
pub struct FormModeration {
    action: String,
}

#[post("/admin/equipment/<eid>/action", data = "<form_action>")]
pub(crate) async fn equipment_action(
    eid: i32,
    form_action: Form<FormModeration>,
    admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Equipment>, ErrorResponse> {
    let target = moderation_status(&form_action.action).ok_or_else(|| {
        ErrorResponse::bad_request(format!("Unknown equipment action '{}'", form_action.action))
    })?;

    let item = conn
        .run(move |c| {
            diesel::update(equipment::table.find(eid))
                .set((
                    equipment::status.eq(target.as_str()),
                    equipment::updated_at.eq(Utc::now().naive_utc()),
                ))
                .get_result::<Equipment>(c)
        })
        .await
        .map_err(db_error("equipment"))?;

    tracing::info!(
        equipment_id = eid,
        admin_id = admin.0.id,
        status = %target,
        "equipment moderated"
    );

    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_maps_to_listing_status() {
        assert_eq!(moderation_status("approve"), Some(EquipmentStatus::Active));
        assert_eq!(moderation_status("reject"), Some(EquipmentStatus::Rejected));
        assert_eq!(moderation_status("suspend"), Some(EquipmentStatus::Suspended));
        assert_eq!(moderation_status("delete"), None);
    }
}
