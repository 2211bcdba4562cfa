use crate::api::choices::{RentalStatus, Role};
use crate::api::equipment_management::models::Equipment;
use crate::api::rental_management::models::{Rental, RentalSummary};
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use diesel::prelude::*;
use rocket::serde::json::Json;
use serde::Serialize;

const RECENT: i64 = 5;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

/// Landing data for the logged-in user, shaped by their role.
#[derive(Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Customer {
        recent_rentals: Vec<RentalSummary>,
        wishlist_count: i64,
    },
    Vendor {
        recent_equipment: Vec<Equipment>,
        pending_requests: i64,
        active_rentals: i64,
    },
    Admin {
        total_users: i64,
        users_by_role: Vec<RoleCount>,
        unverified_users: i64,
    },
}

/// Fills in every role with its count, including roles with no users.
pub(crate) fn role_counts(rows: Vec<(String, i64)>) -> Vec<RoleCount> {
    Role::ALL
        .iter()
        .map(|role| RoleCount {
            role: role.as_str().to_string(),
            count: rows
                .iter()
                .find(|(name, _)| name == role.as_str())
                .map_or(0, |(_, count)| *count),
        })
        .collect()
}

fn customer_dashboard(uid: i32, c: &mut PgConnection) -> QueryResult<Dashboard> {
    use schema::{equipment, rentals, wishlist};

    let recent_rentals = rentals::table
        .inner_join(equipment::table)
        .filter(rentals::renter_id.eq(uid))
        .order(rentals::created_at.desc())
        .limit(RECENT)
        .select((rentals::all_columns, equipment::title))
        .load::<(Rental, String)>(c)?
        .into_iter()
        .map(RentalSummary::from)
        .collect();

    let wishlist_count = wishlist::table
        .filter(wishlist::user_id.eq(uid))
        .count()
        .get_result(c)?;

    Ok(Dashboard::Customer {
        recent_rentals,
        wishlist_count,
    })
}

fn vendor_dashboard(uid: i32, c: &mut PgConnection) -> QueryResult<Dashboard> {
    use schema::{equipment, rentals};

    let recent_equipment = equipment::table
        .filter(equipment::owner_id.eq(uid))
        .order(equipment::created_at.desc())
        .limit(RECENT)
        .load::<Equipment>(c)?;

    let pending_requests = rentals::table
        .filter(rentals::owner_id.eq(uid))
        .filter(rentals::status.eq(RentalStatus::Pending.as_str()))
        .count()
        .get_result(c)?;

    let active_rentals = rentals::table
        .filter(rentals::owner_id.eq(uid))
        .filter(rentals::status.eq(RentalStatus::Active.as_str()))
        .count()
        .get_result(c)?;

    Ok(Dashboard::Vendor {
        recent_equipment,
        pending_requests,
        active_rentals,
    })
}

fn admin_dashboard(c: &mut PgConnection) -> QueryResult<Dashboard> {
    use schema::users::dsl::*;

    let rows = users
        .group_by(role)
        .select((role, diesel::dsl::count_star()))
        .load::<(String, i64)>(c)?;

    let unverified_users = users
        .filter(is_email_verified.eq(false))
        .count()
        .get_result(c)?;

    Ok(Dashboard::Admin {
        total_users: rows.iter().map(|(_, count)| count).sum(),
        users_by_role: role_counts(rows),
        unverified_users,
    })
}

#[get("/dashboard")]
pub(crate) async fn dashboard(user: UserLoggedIn, conn: DbConn) -> Result<Json<Dashboard>, ErrorResponse> {
    let user = user.0;
    let uid = user.id;
    let is_admin = user.is_admin();
    let role = user.role();

    let dashboard = conn
        .run(move |c| {
            if is_admin {
                admin_dashboard(c)
            } else if role == Some(Role::Vendor) {
                vendor_dashboard(uid, c)
            } else {
                customer_dashboard(uid, c)
            }
        })
        .await
        .map_err(db_error("dashboard"))?;

    Ok(Json(dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_roles_count_as_zero() {
        let counts = role_counts(vec![("vendor".to_string(), 4), ("customer".to_string(), 9)]);
        assert_eq!(
            counts,
            vec![
                RoleCount { role: "customer".to_string(), count: 9 },
                RoleCount { role: "vendor".to_string(), count: 4 },
                RoleCount { role: "admin".to_string(), count: 0 },
            ]
        );
    }

    #[test]
    fn dashboard_is_tagged_with_the_role() {
        let json = serde_json::to_value(Dashboard::Vendor {
            recent_equipment: Vec::new(),
            pending_requests: 2,
            active_rentals: 1,
        })
        .unwrap();
        assert_eq!(json["role"], "vendor");
        assert_eq!(json["pending_requests"], 2);
    }
}
