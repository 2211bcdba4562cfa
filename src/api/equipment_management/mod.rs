pub mod create;
pub mod delete;
pub mod edit;
pub mod get_equipment;
pub mod image;
pub mod list;
pub mod models;
pub mod toggle_status;
