use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;

use crate::api::choices::EquipmentStatus;
use crate::api::user_management::models::UserOut;
use crate::schema::equipment;

pub use crate::api::choices::EquipmentCondition;

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = equipment)]
pub struct Equipment {
    pub id: i32,
    pub owner_id: i32,
    pub category_id: i32,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub model: String,
    pub condition: String,
    pub daily_rate: Decimal,
    pub weekly_rate: Option<Decimal>,
    pub monthly_rate: Option<Decimal>,
    pub security_deposit: Decimal,
    pub is_available_for_pickup: bool,
    pub is_available_for_delivery: bool,
    pub delivery_fee: Decimal,
    pub location_city: String,
    pub location_state: String,
    pub status: String,
    pub total_rentals: i32,
    pub total_revenue: Decimal,
    pub average_rating: Decimal,
    pub view_count: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_rented: Option<NaiveDateTime>,
}

impl Equipment {
    pub fn status(&self) -> Option<EquipmentStatus> {
        self.status.parse().ok()
    }

    pub fn is_listed(&self) -> bool {
        self.status() == Some(EquipmentStatus::Active)
    }

    pub fn is_managed_by(&self, user: &UserOut) -> bool {
        self.owner_id == user.id || user.is_admin()
    }

    /// Active listings are public, everything else only reaches its owner
    /// and administrators.
    pub fn is_visible_to(&self, user: Option<&UserOut>) -> bool {
        self.is_listed() || user.map_or(false, |user| self.is_managed_by(user))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    pub(crate) fn listing(owner_id: i32, status: &str) -> Equipment {
        let created = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Equipment {
            id: 10,
            owner_id,
            category_id: 1,
            title: "PlayStation 5".to_string(),
            description: "Disc edition with two controllers".to_string(),
            brand: "Sony".to_string(),
            model: "CFI-1215A".to_string(),
            condition: "excellent".to_string(),
            daily_rate: dec!(15.00),
            weekly_rate: Some(dec!(80.00)),
            monthly_rate: Some(dec!(250.00)),
            security_deposit: dec!(100.00),
            is_available_for_pickup: true,
            is_available_for_delivery: true,
            delivery_fee: dec!(12.50),
            location_city: "Austin".to_string(),
            location_state: "TX".to_string(),
            status: status.to_string(),
            total_rentals: 0,
            total_revenue: dec!(0),
            average_rating: dec!(0),
            view_count: 0,
            created_at: created,
            updated_at: created,
            last_rented: None,
        }
    }

    fn user(id: i32, role: &str) -> UserOut {
        UserOut {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            first_name: String::new(),
            last_name: String::new(),
            role: role.to_string(),
            phone_number: None,
            is_active: true,
            is_staff: false,
            is_email_verified: true,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            last_login: None,
        }
    }

    #[test]
    fn active_listings_are_public() {
        let item = listing(1, "active");
        assert!(item.is_visible_to(None));
        assert!(item.is_visible_to(Some(&user(2, "customer"))));
    }

    #[test]
    fn unlisted_equipment_is_hidden_from_strangers() {
        let item = listing(1, "pending");
        assert!(!item.is_visible_to(None));
        assert!(!item.is_visible_to(Some(&user(2, "customer"))));
        assert!(item.is_visible_to(Some(&user(1, "vendor"))));
        assert!(item.is_visible_to(Some(&user(3, "admin"))));
    }
}
