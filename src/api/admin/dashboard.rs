use crate::api::choices::{EquipmentStatus, RentalStatus};
use crate::api::equipment_management::models::Equipment;
use crate::api::rental_management::models::{Rental, RentalSummary};
use crate::api::user_management::models::{AdminUser, User, UserOut};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema::{equipment, equipment_categories, rentals, users};
use chrono::{Duration, NaiveDateTime, Utc};
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use rocket::serde::json::Json;
use rust_decimal::Decimal;
use serde::Serialize;

const RECENT: i64 = 5;
const TOP_CATEGORIES: i64 = 5;

#[derive(Serialize, Debug)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Serialize, Debug)]
pub struct AdminDashboard {
    pub total_users: i64,
    pub new_users_30d: i64,
    pub active_users_7d: i64,
    pub total_equipment: i64,
    pub active_equipment: i64,
    pub pending_equipment: i64,
    pub total_rentals: i64,
    pub active_rentals: i64,
    pub completed_rentals: i64,
    pub total_revenue: Decimal,
    pub monthly_revenue: Decimal,
    pub recent_users: Vec<UserOut>,
    pub recent_equipment: Vec<Equipment>,
    pub recent_rentals: Vec<RentalSummary>,
    pub equipment_by_category: Vec<CategoryCount>,
}

fn completed_revenue(since: Option<NaiveDateTime>, c: &mut PgConnection) -> QueryResult<Decimal> {
    let mut query = rentals::table
        .filter(rentals::status.eq(RentalStatus::Completed.as_str()))
        .select(sum(rentals::total_amount))
        .into_boxed();
    if let Some(since) = since {
        query = query.filter(rentals::created_at.ge(since));
    }
    Ok(query.first::<Option<Decimal>>(c)?.unwrap_or(Decimal::ZERO))
}

fn load_dashboard(now: NaiveDateTime, c: &mut PgConnection) -> QueryResult<AdminDashboard> {
    let month_ago = now - Duration::days(30);
    let week_ago = now - Duration::days(7);

    let total_users = users::table.count().get_result(c)?;
    let new_users_30d = users::table
        .filter(users::created_at.ge(month_ago))
        .count()
        .get_result(c)?;
    let active_users_7d = users::table
        .filter(users::last_login.ge(week_ago))
        .count()
        .get_result(c)?;

    let total_equipment = equipment::table.count().get_result(c)?;
    let active_equipment = equipment::table
        .filter(equipment::status.eq(EquipmentStatus::Active.as_str()))
        .count()
        .get_result(c)?;
    let pending_equipment = equipment::table
        .filter(equipment::status.eq(EquipmentStatus::Pending.as_str()))
        .count()
        .get_result(c)?;

    let total_rentals = rentals::table.count().get_result(c)?;
    let active_rentals = rentals::table
        .filter(rentals::status.eq_any(vec![
            RentalStatus::Confirmed.as_str(),
            RentalStatus::Active.as_str(),
        ]))
        .count()
        .get_result(c)?;
    let completed_rentals = rentals::table
        .filter(rentals::status.eq(RentalStatus::Completed.as_str()))
        .count()
        .get_result(c)?;

    let recent_users = users::table
        .order(users::created_at.desc())
        .limit(RECENT)
        .load::<User>(c)?
        .into_iter()
        .map(UserOut::from)
        .collect();
    let recent_equipment = equipment::table
        .order(equipment::created_at.desc())
        .limit(RECENT)
        .load::<Equipment>(c)?;
    let recent_rentals = rentals::table
        .inner_join(equipment::table)
        .order(rentals::created_at.desc())
        .limit(RECENT)
        .select((rentals::all_columns, equipment::title))
        .load::<(Rental, String)>(c)?
        .into_iter()
        .map(RentalSummary::from)
        .collect();

    let equipment_by_category = equipment::table
        .inner_join(equipment_categories::table)
        .group_by(equipment_categories::name)
        .select((equipment_categories::name, count_star()))
        .order(count_star().desc())
        .limit(TOP_CATEGORIES)
        .load::<(String, i64)>(c)?
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

    Ok(AdminDashboard {
        total_users,
        new_users_30d,
        active_users_7d,
        total_equipment,
        active_equipment,
        pending_equipment,
        total_rentals,
        active_rentals,
        completed_rentals,
        total_revenue: completed_revenue(None, c)?,
        monthly_revenue: completed_revenue(Some(month_ago), c)?,
        recent_users,
        recent_equipment,
        recent_rentals,
        equipment_by_category,
    })
}

#[get("/admin/dashboard")]
pub(crate) async fn admin_dashboard(
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<AdminDashboard>, ErrorResponse> {
    let now = Utc::now().naive_utc();
    let dashboard = conn
        .run(move |c| load_dashboard(now, c))
        .await
        .map_err(db_error("dashboard"))?;

    Ok(Json(dashboard))
}
