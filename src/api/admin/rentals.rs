use std::collections::HashMap;

use crate::api::choices::RentalStatus;
use crate::api::equipment_management::list::search_pattern;
use crate::api::pagination::{self, Page, PER_PAGE};
use crate::api::payment_management::initiate::start_payment;
use crate::api::payment_management::models::{PaymentStarted, PaymentType};
use crate::api::rental_management::get_rental::{load_rental, rental_detail, RentalDetail};
use crate::api::rental_management::manage::{apply_status, RentalChanges};
use crate::api::rental_management::models::Rental;
use crate::api::user_management::models::AdminUser;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::gateway::Gateway;
use crate::schema::{equipment, rentals, users};
use crate::settings::Settings;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CreatedWithin {
    Today,
    Week,
    Month,
}

impl CreatedWithin {
    pub(crate) fn parse(value: Option<&str>) -> Option<CreatedWithin> {
        match value {
            Some("today") => Some(CreatedWithin::Today),
            Some("week") => Some(CreatedWithin::Week),
            Some("month") => Some(CreatedWithin::Month),
            _ => None,
        }
    }

    /// Earliest creation time that still falls in the window.
    pub(crate) fn since(self, today: NaiveDate) -> NaiveDateTime {
        let first_day = match self {
            CreatedWithin::Today => today,
            CreatedWithin::Week => today - Duration::days(7),
            CreatedWithin::Month => today - Duration::days(30),
        };
        first_day.and_time(chrono::NaiveTime::MIN)
    }
}

#[derive(FromForm)]
pub struct AdminRentalFilter {
    search: Option<String>,
    status: Option<RentalStatus>,
    date: Option<String>,
    page: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct AdminRentalRow {
    #[serde(flatten)]
    pub rental: Rental,
    pub equipment_title: String,
    pub renter_username: String,
    pub owner_username: String,
}

fn filtered(filter: &AdminRentalFilter, today: NaiveDate) -> rentals::BoxedQuery<'static, Pg> {
    let mut query = rentals::table.into_boxed();

    if let Some(pattern) = filter.search.as_deref().and_then(search_pattern) {
        let titled = equipment::table
            .filter(equipment::title.ilike(pattern.clone()))
            .select(equipment::id);
        let renters = users::table
            .filter(users::username.ilike(pattern.clone()))
            .select(users::id);
        let owners = users::table
            .filter(users::username.ilike(pattern))
            .select(users::id);
        query = query.filter(
            rentals::equipment_id
                .eq_any(titled)
                .or(rentals::renter_id.eq_any(renters))
                .or(rentals::owner_id.eq_any(owners)),
        );
    }
    if let Some(wanted) = filter.status {
        query = query.filter(rentals::status.eq(wanted.as_str()));
    }
    if let Some(window) = CreatedWithin::parse(filter.date.as_deref()) {
        query = query.filter(rentals::created_at.ge(window.since(today)));
    }

    query
}

#[get("/admin/rentals?<filter..>")]
pub(crate) async fn list_rentals(
    filter: AdminRentalFilter,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Page<AdminRentalRow>>, ErrorResponse> {
    let page = pagination::page_number(filter.page);
    let today = Utc::now().date_naive();

    let result = conn
        .run(move |c| {
            let total = filtered(&filter, today).count().get_result::<i64>(c)?;
            let items = filtered(&filter, today)
                .order((rentals::created_at.desc(), rentals::id.desc()))
                .limit(PER_PAGE)
                .offset(pagination::offset(page))
                .load::<Rental>(c)?;

            let equipment_ids: Vec<i32> = items.iter().map(|rental| rental.equipment_id).collect();
            let titles: HashMap<i32, String> = equipment::table
                .filter(equipment::id.eq_any(&equipment_ids))
                .select((equipment::id, equipment::title))
                .load::<(i32, String)>(c)?
                .into_iter()
                .collect();

            let user_ids: Vec<i32> = items
                .iter()
                .flat_map(|rental| [rental.renter_id, rental.owner_id])
                .collect();
            let usernames: HashMap<i32, String> = users::table
                .filter(users::id.eq_any(&user_ids))
                .select((users::id, users::username))
                .load::<(i32, String)>(c)?
                .into_iter()
                .collect();
            let username = |uid: i32| usernames.get(&uid).cloned().unwrap_or_default();

            let rows = items
                .into_iter()
                .map(|rental| AdminRentalRow {
                    equipment_title: titles.get(&rental.equipment_id).cloned().unwrap_or_default(),
                    renter_username: username(rental.renter_id),
                    owner_username: username(rental.owner_id),
                    rental,
                })
                .collect();

            Ok::<_, diesel::result::Error>(Page::new(rows, page, total))
        })
        .await
        .map_err(db_error("rentals"))?;

    Ok(Json(result))
}

#[get("/admin/rentals/<rid>")]
pub(crate) async fn admin_rental_detail(
    rid: i32,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<RentalDetail>, ErrorResponse> {
    let rental = load_rental(&conn, rid).await?;
    Ok(Json(rental_detail(&conn, rental).await?))
}

#[derive(FromForm)]
pub struct FormRentalAction {
    action: String,
    status: Option<RentalStatus>,
}

/// Status an admin action sets. Admins may move a rental from any status
/// to any other.
pub(crate) fn admin_target(action: &str, status: Option<RentalStatus>) -> Result<RentalStatus, String> {
    match action {
        "cancel" => Ok(RentalStatus::Cancelled),
        "complete" => Ok(RentalStatus::Completed),
        "set_status" => status.ok_or_else(|| "A status is required".to_string()),
        other => Err(format!("Unknown rental action '{}'", other)),
    }
}

#[post("/admin/rentals/<rid>/action", data = "<form_action>")]
pub(crate) async fn rental_action(
    rid: i32,
    form_action: Form<FormRentalAction>,
    admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Rental>, ErrorResponse> {
    let target = admin_target(&form_action.action, form_action.status)
        .map_err(ErrorResponse::bad_request)?;

    let rental = load_rental(&conn, rid).await?;
    let previous = rental.status.clone();
    let changes = RentalChanges::to_status(target, Utc::now().naive_utc());

    let updated = conn
        .run(move |c| apply_status(&rental, &changes, c))
        .await
        .map_err(db_error("rental"))?;

    tracing::info!(
        rental_id = rid,
        admin_id = admin.0.id,
        from = %previous,
        to = %updated.status,
        "rental status set by admin"
    );

    Ok(Json(updated))
}

#[derive(FromForm)]
pub struct FormAdminPayment {
    #[field(default = PaymentType::RentalPayment)]
    payment_type: PaymentType,
}

/// Starts a gateway payment on the renter's behalf, whatever the rental's
/// status.
#[post("/admin/rentals/<rid>/pay", data = "<form_payment>")]
pub(crate) async fn admin_initiate_payment(
    rid: i32,
    form_payment: Form<FormAdminPayment>,
    admin: AdminUser,
    conn: DbConn,
    gateway: &State<Gateway>,
    settings: &State<Settings>,
) -> Result<Json<PaymentStarted>, ErrorResponse> {
    let rental = load_rental(&conn, rid).await?;
    let started = start_payment(&conn, gateway, settings, rental, form_payment.payment_type).await?;

    tracing::info!(
        rental_id = rid,
        admin_id = admin.0.id,
        payment_id = started.payment_id,
        "payment initiated by admin"
    );

    Ok(Json(started))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_actions_pick_a_status() {
        assert_eq!(admin_target("cancel", None), Ok(RentalStatus::Cancelled));
        assert_eq!(admin_target("complete", None), Ok(RentalStatus::Completed));
        assert!(admin_target("refund", None).is_err());
        assert!(admin_target("set_status", None).is_err());
    }

    #[test]
    fn set_status_accepts_every_status() {
        for status in RentalStatus::ALL {
            assert_eq!(admin_target("set_status", Some(*status)), Ok(*status));
        }
    }

    #[test]
    fn date_windows_start_at_midnight() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(
            CreatedWithin::Today.since(today),
            today.and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            CreatedWithin::Week.since(today),
            NaiveDate::from_ymd_opt(2024, 6, 23).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            CreatedWithin::Month.since(today).date(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );
        assert_eq!(CreatedWithin::parse(Some("all")), None);
    }
}
