use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;

use crate::api::user_management::models::UserOut;
use crate::schema::rentals;

pub use crate::api::choices::RentalStatus;

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = rentals)]
pub struct Rental {
    pub id: i32,
    pub equipment_id: i32,
    pub renter_id: i32,
    pub owner_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub daily_rate: Decimal,
    pub total_days: i32,
    pub subtotal: Decimal,
    pub security_deposit: Decimal,
    pub delivery_fee: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub delivery_required: bool,
    pub delivery_address: String,
    pub status: String,
    pub approved_at: Option<NaiveDateTime>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub renter_notes: String,
    pub owner_notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Rental {
    pub fn status(&self) -> Option<RentalStatus> {
        self.status.parse().ok()
    }

    pub fn is_participant(&self, user_id: i32) -> bool {
        self.renter_id == user_id || self.owner_id == user_id
    }

    /// Renter, owner and administrators may look at a rental.
    pub fn is_visible_to(&self, user: &UserOut) -> bool {
        self.is_participant(user.id) || user.is_admin()
    }
}

/// A rental with the listing title, as shown in rental lists.
#[derive(Serialize, Debug)]
pub struct RentalSummary {
    #[serde(flatten)]
    pub rental: Rental,
    pub equipment_title: String,
}

impl From<(Rental, String)> for RentalSummary {
    fn from((rental, equipment_title): (Rental, String)) -> Self {
        RentalSummary {
            rental,
            equipment_title,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn rental(renter_id: i32, owner_id: i32, status: &str) -> Rental {
        let created = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Rental {
            id: 5,
            equipment_id: 10,
            renter_id,
            owner_id,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            actual_return_date: None,
            daily_rate: dec!(15.00),
            total_days: 3,
            subtotal: dec!(45.00),
            security_deposit: dec!(100.00),
            delivery_fee: dec!(12.50),
            service_fee: dec!(4.50),
            total_amount: dec!(162.00),
            delivery_required: true,
            delivery_address: "1 Main St".to_string(),
            status: status.to_string(),
            approved_at: None,
            confirmed_at: None,
            started_at: None,
            completed_at: None,
            renter_notes: String::new(),
            owner_notes: String::new(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn participants_are_renter_and_owner() {
        let rental = rental(1, 2, "pending");
        assert!(rental.is_participant(1));
        assert!(rental.is_participant(2));
        assert!(!rental.is_participant(3));
        assert_eq!(rental.status(), Some(RentalStatus::Pending));
    }
}
