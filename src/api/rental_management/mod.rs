pub mod cancel;
pub mod create;
pub mod get_rental;
pub mod list;
pub mod manage;
pub mod models;
pub mod pricing;
