use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;

use crate::schema::{user_profiles, users};

pub use crate::api::choices::{GamingExperience, Role};

#[derive(Queryable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub is_staff: bool,
    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct UserOut {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_email_verified: bool,
    pub created_at: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        UserOut {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            phone_number: user.phone_number,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

impl UserOut {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn is_admin(&self) -> bool {
        self.is_staff || self.role() == Some(Role::Admin)
    }

    /// Vendors and admins may list equipment.
    pub fn can_list_equipment(&self) -> bool {
        self.is_admin() || self.role() == Some(Role::Vendor)
    }
}

/// User fields safe to show to other users.
#[derive(Serialize, Debug, Clone)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&UserOut> for PublicUser {
    fn from(user: &UserOut) -> Self {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Request guard: a user with a valid session.
#[derive(Serialize, Debug)]
pub struct UserLoggedIn(pub UserOut);

/// Request guard: a logged-in administrator.
#[derive(Serialize, Debug)]
pub struct AdminUser(pub UserOut);

#[derive(Queryable, Identifiable, Serialize, Debug)]
#[diesel(table_name = user_profiles)]
pub struct UserProfile {
    pub id: i32,
    pub user_id: i32,
    pub bio: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub gaming_experience: String,
    pub favorite_genres: String,
    pub updated_at: NaiveDateTime,
    pub total_rentals_as_renter: i32,
    pub total_rentals_as_owner: i32,
    pub total_earnings: Decimal,
    pub average_rating_as_renter: Decimal,
    pub average_rating_as_owner: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn user_out(role: &str, is_staff: bool) -> UserOut {
        UserOut {
            id: 1,
            username: "player".to_string(),
            email: "player@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: role.to_string(),
            phone_number: None,
            is_active: true,
            is_staff,
            is_email_verified: false,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            last_login: None,
        }
    }

    #[test]
    fn admin_detection_covers_role_and_staff_flag() {
        assert!(user_out("admin", false).is_admin());
        assert!(user_out("customer", true).is_admin());
        assert!(!user_out("vendor", false).is_admin());
    }

    #[test]
    fn only_vendors_and_admins_list_equipment() {
        assert!(user_out("vendor", false).can_list_equipment());
        assert!(user_out("admin", false).can_list_equipment());
        assert!(!user_out("customer", false).can_list_equipment());
    }
}
