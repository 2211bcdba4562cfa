use std::collections::HashMap;

use crate::api::choices::{RentalStatus, Role};
use crate::api::equipment_management::list::search_pattern;
use crate::api::equipment_management::models::Equipment;
use crate::api::pagination::{self, Page, PER_PAGE};
use crate::api::rental_management::models::{Rental, RentalSummary};
use crate::api::user_management::models::{AdminUser, User, UserOut, UserProfile};
use crate::api::user_management::register::normalize_email;
use crate::api::user_management::sessions::UserSession;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema::{equipment, rentals, user_profiles, users};
use diesel::dsl::{count_star, sum};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::form::Form;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use rust_decimal::Decimal;
use serde::Serialize;

const DETAIL_ROWS: i64 = 10;

#[derive(FromForm)]
pub struct UserFilter {
    search: Option<String>,
    role: Option<Role>,
    verified: Option<bool>,
    active: Option<bool>,
    page: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct UserRow {
    #[serde(flatten)]
    pub user: UserOut,
    pub equipment_count: i64,
    pub rental_count: i64,
}

#[derive(Serialize, Debug)]
pub struct UserDetail {
    pub user: UserOut,
    pub profile: Option<UserProfile>,
    pub equipment: Vec<Equipment>,
    pub rentals_as_renter: Vec<RentalSummary>,
    pub rentals_as_owner: Vec<RentalSummary>,
    pub total_earned: Decimal,
    pub total_spent: Decimal,
}

fn filtered(filter: &UserFilter) -> users::BoxedQuery<'static, Pg> {
    let mut query = users::table.into_boxed();

    if let Some(pattern) = filter.search.as_deref().and_then(search_pattern) {
        query = query.filter(
            users::username
                .ilike(pattern.clone())
                .or(users::email.ilike(pattern.clone()))
                .or(users::first_name.ilike(pattern.clone()))
                .or(users::last_name.ilike(pattern)),
        );
    }
    if let Some(wanted) = filter.role {
        query = query.filter(users::role.eq(wanted.as_str()));
    }
    if let Some(verified) = filter.verified {
        query = query.filter(users::is_email_verified.eq(verified));
    }
    if let Some(active) = filter.active {
        query = query.filter(users::is_active.eq(active));
    }

    query
}

fn counts_by(rows: Vec<(i32, i64)>) -> HashMap<i32, i64> {
    rows.into_iter().collect()
}

#[get("/admin/users?<filter..>")]
pub(crate) async fn list_users(
    filter: UserFilter,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<Page<UserRow>>, ErrorResponse> {
    let page = pagination::page_number(filter.page);

    let result = conn
        .run(move |c| {
            let total = filtered(&filter).count().get_result::<i64>(c)?;
            let items = filtered(&filter)
                .order((users::created_at.desc(), users::id.desc()))
                .limit(PER_PAGE)
                .offset(pagination::offset(page))
                .load::<User>(c)?;

            let ids: Vec<i32> = items.iter().map(|user| user.id).collect();
            let listings = counts_by(
                equipment::table
                    .filter(equipment::owner_id.eq_any(&ids))
                    .group_by(equipment::owner_id)
                    .select((equipment::owner_id, count_star()))
                    .load(c)?,
            );
            let rented = counts_by(
                rentals::table
                    .filter(rentals::renter_id.eq_any(&ids))
                    .group_by(rentals::renter_id)
                    .select((rentals::renter_id, count_star()))
                    .load(c)?,
            );

            let rows = items
                .into_iter()
                .map(|user| UserRow {
                    equipment_count: listings.get(&user.id).copied().unwrap_or(0),
                    rental_count: rented.get(&user.id).copied().unwrap_or(0),
                    user: UserOut::from(user),
                })
                .collect();

            Ok::<_, DieselError>(Page::new(rows, page, total))
        })
        .await
        .map_err(db_error("users"))?;

    Ok(Json(result))
}

fn load_user(uid: i32, c: &mut PgConnection) -> QueryResult<User> {
    users::table.find(uid).first::<User>(c)
}

fn summaries(rows: Vec<(Rental, String)>) -> Vec<RentalSummary> {
    rows.into_iter().map(RentalSummary::from).collect()
}

#[get("/admin/users/<uid>")]
pub(crate) async fn user_detail(
    uid: i32,
    _admin: AdminUser,
    conn: DbConn,
) -> Result<Json<UserDetail>, ErrorResponse> {
    let detail = conn
        .run(move |c| {
            let user = load_user(uid, c)?;
            let profile = user_profiles::table
                .filter(user_profiles::user_id.eq(uid))
                .first::<UserProfile>(c)
                .optional()?;

            let owned = equipment::table
                .filter(equipment::owner_id.eq(uid))
                .order(equipment::created_at.desc())
                .limit(DETAIL_ROWS)
                .load::<Equipment>(c)?;

            let rentals_as_renter = rentals::table
                .inner_join(equipment::table)
                .filter(rentals::renter_id.eq(uid))
                .order(rentals::created_at.desc())
                .limit(DETAIL_ROWS)
                .select((rentals::all_columns, equipment::title))
                .load::<(Rental, String)>(c)?;
            let rentals_as_owner = rentals::table
                .inner_join(equipment::table)
                .filter(rentals::owner_id.eq(uid))
                .order(rentals::created_at.desc())
                .limit(DETAIL_ROWS)
                .select((rentals::all_columns, equipment::title))
                .load::<(Rental, String)>(c)?;

            let total_earned = rentals::table
                .filter(rentals::owner_id.eq(uid))
                .filter(rentals::status.eq(RentalStatus::Completed.as_str()))
                .select(sum(rentals::total_amount))
                .first::<Option<Decimal>>(c)?;
            let total_spent = rentals::table
                .filter(rentals::renter_id.eq(uid))
                .filter(rentals::status.eq(RentalStatus::Completed.as_str()))
                .select(sum(rentals::total_amount))
                .first::<Option<Decimal>>(c)?;

            Ok::<_, DieselError>(UserDetail {
                user: UserOut::from(user),
                profile,
                equipment: owned,
                rentals_as_renter: summaries(rentals_as_renter),
                rentals_as_owner: summaries(rentals_as_owner),
                total_earned: total_earned.unwrap_or(Decimal::ZERO),
                total_spent: total_spent.unwrap_or(Decimal::ZERO),
            })
        })
        .await
        .map_err(db_error("user"))?;

    Ok(Json(detail))
}

#[derive(FromForm)]
pub struct FormAdminUser {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    role: Option<Role>,
    phone_number: Option<String>,
    is_staff: Option<bool>,
    is_active: Option<bool>,
}

#[derive(AsChangeset, Default, Debug, PartialEq, Eq)]
#[diesel(table_name = users)]
pub(crate) struct AdminUserChanges {
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) role: Option<String>,
    pub(crate) phone_number: Option<Option<String>>,
    pub(crate) is_staff: Option<bool>,
    pub(crate) is_active: Option<bool>,
    pub(crate) is_email_verified: Option<bool>,
}

impl AdminUserChanges {
    fn is_empty(&self) -> bool {
        *self == AdminUserChanges::default()
    }
}

/// Works out the change an account action makes. Toggles read the user's
/// current flags.
pub(crate) fn account_action(user: &User, action: &str) -> Result<AdminUserChanges, String> {
    let mut changes = AdminUserChanges::default();
    match action {
        "activate" => changes.is_active = Some(true),
        "deactivate" => changes.is_active = Some(false),
        "toggle_active" => changes.is_active = Some(!user.is_active),
        "verify" => changes.is_email_verified = Some(true),
        "unverify" => changes.is_email_verified = Some(false),
        "toggle_staff" => changes.is_staff = Some(!user.is_staff),
        other => return Err(format!("Unknown user action '{}'", other)),
    }
    Ok(changes)
}

/// Writes the changes and drops the user's sessions when the account ends
/// up inactive.
async fn save_user(
    conn: &DbConn,
    sessions: &UserSession,
    uid: i32,
    changes: AdminUserChanges,
) -> Result<User, ErrorResponse> {
    let user = conn
        .run(move |c| {
            diesel::update(users::table.find(uid))
                .set(&changes)
                .get_result::<User>(c)
        })
        .await
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => ErrorResponse::new(
                Status { code: 409 },
                "Email already registered".to_string(),
            ),
            err => db_error("user")(err),
        })?;

    if !user.is_active {
        sessions.end_all_for(user.id);
    }

    Ok(user)
}

/// Admins can edit their own account but not lock themselves out of it.
pub(crate) fn guard_self(admin_id: i32, uid: i32, changes: &AdminUserChanges) -> Result<(), String> {
    let demotes = changes.is_active == Some(false)
        || changes.is_staff == Some(false)
        || changes.role.as_deref().map_or(false, |role| role != Role::Admin.as_str());
    if admin_id == uid && demotes {
        return Err("You can't deactivate or demote your own account".to_string());
    }
    Ok(())
}

#[post("/admin/users/<uid>/edit", data = "<form_user>")]
pub(crate) async fn edit_user(
    uid: i32,
    form_user: Form<FormAdminUser>,
    admin: AdminUser,
    conn: DbConn,
    sessions: &State<UserSession>,
) -> Result<Json<UserOut>, ErrorResponse> {
    let form = form_user.into_inner();
    if let Some(email) = form.email.as_deref() {
        if !email.contains('@') {
            return Err(ErrorResponse::bad_request("A valid email address is required"));
        }
    }

    let changes = AdminUserChanges {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email.as_deref().map(normalize_email),
        role: form.role.map(|role| role.as_str().to_string()),
        phone_number: form
            .phone_number
            .map(|phone| Some(phone).filter(|phone| !phone.is_empty())),
        is_staff: form.is_staff,
        is_active: form.is_active,
        is_email_verified: None,
    };
    if changes.is_empty() {
        return Err(ErrorResponse::bad_request("Nothing to update"));
    }
    guard_self(admin.0.id, uid, &changes).map_err(ErrorResponse::bad_request)?;

    let user = save_user(&conn, sessions, uid, changes).await?;
    tracing::info!(user_id = uid, admin_id = admin.0.id, "user edited by admin");

    Ok(Json(UserOut::from(user)))
}

#[derive(FromForm)]
pub struct FormUserAction {
    action: String,
}

#[post("/admin/users/<uid>/action", data = "<form_action>")]
pub(crate) async fn user_action(
    uid: i32,
    form_action: Form<FormUserAction>,
    admin: AdminUser,
    conn: DbConn,
    sessions: &State<UserSession>,
) -> Result<Json<UserOut>, ErrorResponse> {
    let user = conn
        .run(move |c| load_user(uid, c))
        .await
        .map_err(db_error("user"))?;

    let changes = account_action(&user, &form_action.action).map_err(ErrorResponse::bad_request)?;
    guard_self(admin.0.id, uid, &changes).map_err(ErrorResponse::bad_request)?;

    let user = save_user(&conn, sessions, uid, changes).await?;
    tracing::info!(
        user_id = uid,
        admin_id = admin.0.id,
        action = %form_action.action,
        "user account action"
    );

    Ok(Json(UserOut::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user(is_active: bool, is_staff: bool) -> User {
        User {
            id: 4,
            username: "seller".to_string(),
            email: "seller@example.com".to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role: "vendor".to_string(),
            phone_number: None,
            is_active,
            is_staff,
            is_email_verified: false,
            email_verification_token: None,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            last_login: None,
        }
    }

    #[test]
    fn explicit_actions_set_flags() {
        let seller = user(true, false);
        assert_eq!(account_action(&seller, "deactivate").unwrap().is_active, Some(false));
        assert_eq!(account_action(&seller, "activate").unwrap().is_active, Some(true));
        assert_eq!(account_action(&seller, "verify").unwrap().is_email_verified, Some(true));
        assert_eq!(
            account_action(&seller, "unverify").unwrap().is_email_verified,
            Some(false)
        );
    }

    #[test]
    fn toggles_invert_current_flags() {
        assert_eq!(
            account_action(&user(false, false), "toggle_active").unwrap().is_active,
            Some(true)
        );
        assert_eq!(
            account_action(&user(true, true), "toggle_staff").unwrap().is_staff,
            Some(false)
        );
    }

    #[test]
    fn unknown_actions_are_rejected() {
        assert_eq!(
            account_action(&user(true, false), "ban"),
            Err("Unknown user action 'ban'".to_string())
        );
    }

    #[test]
    fn empty_edits_are_detected() {
        assert!(AdminUserChanges::default().is_empty());
        let changes = AdminUserChanges {
            is_staff: Some(true),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn admins_can_not_lock_themselves_out() {
        let admin = user(true, true);
        let refused = Err("You can't deactivate or demote your own account".to_string());

        let deactivate = account_action(&admin, "deactivate").unwrap();
        assert_eq!(guard_self(admin.id, admin.id, &deactivate), refused);

        let unstaff = account_action(&admin, "toggle_staff").unwrap();
        assert_eq!(unstaff.is_staff, Some(false));
        assert_eq!(guard_self(admin.id, admin.id, &unstaff), refused);

        let to_customer = AdminUserChanges {
            role: Some(Role::Customer.as_str().to_string()),
            ..Default::default()
        };
        assert_eq!(guard_self(admin.id, admin.id, &to_customer), refused);
    }

    #[test]
    fn admins_may_demote_other_accounts() {
        let other = user(true, true);
        let admin_id = other.id + 1;

        for action in ["deactivate", "toggle_staff", "toggle_active"] {
            let changes = account_action(&other, action).unwrap();
            assert_eq!(guard_self(admin_id, other.id, &changes), Ok(()), "{}", action);
        }
        let to_vendor = AdminUserChanges {
            role: Some(Role::Vendor.as_str().to_string()),
            ..Default::default()
        };
        assert_eq!(guard_self(admin_id, other.id, &to_vendor), Ok(()));
    }

    #[test]
    fn harmless_self_edits_pass() {
        let admin = user(true, true);
        let rename = AdminUserChanges {
            first_name: Some("Ada".to_string()),
            role: Some(Role::Admin.as_str().to_string()),
            is_active: Some(true),
            ..Default::default()
        };
        assert_eq!(guard_self(admin.id, admin.id, &rename), Ok(()));
    }
}
