use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;

use crate::api::equipment_management::models::Equipment;
use crate::schema::wishlist;

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = wishlist)]
pub struct WishlistItem {
    pub id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub notify_when_available: bool,
    pub max_daily_rate: Option<Decimal>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = wishlist)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct NewWishlistItem {
    pub(crate) user_id: i32,
    pub(crate) equipment_id: i32,
    pub(crate) notify_when_available: bool,
    pub(crate) max_daily_rate: Option<Decimal>,
}

#[derive(Serialize, Debug)]
pub struct WishlistEntry {
    #[serde(flatten)]
    pub item: WishlistItem,
    pub equipment: Equipment,
    /// The listing's daily rate is at or under the wished maximum.
    pub within_budget: bool,
}

impl WishlistEntry {
    pub fn new(item: WishlistItem, equipment: Equipment) -> WishlistEntry {
        let within_budget = item
            .max_daily_rate
            .map_or(true, |max| equipment.daily_rate <= max);
        WishlistEntry {
            item,
            equipment,
            within_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::equipment_management::models::tests::listing;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn item(max_daily_rate: Option<Decimal>) -> WishlistItem {
        WishlistItem {
            id: 1,
            user_id: 3,
            equipment_id: 10,
            notify_when_available: true,
            max_daily_rate,
            created_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn budget_compares_daily_rate() {
        assert!(WishlistEntry::new(item(None), listing(2, "active")).within_budget);
        assert!(WishlistEntry::new(item(Some(dec!(15.00))), listing(2, "active")).within_budget);
        assert!(!WishlistEntry::new(item(Some(dec!(14.99))), listing(2, "active")).within_budget);
    }
}
