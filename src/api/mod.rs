pub mod admin;
pub mod category_management;
pub mod choices;
pub mod equipment_management;
pub(crate) mod form_fields;
pub mod message_management;
pub mod pagination;
pub mod payment_management;
pub mod rental_management;
pub mod review_management;
pub mod sensor_management;
pub mod user_management;
pub mod wishlist_management;
