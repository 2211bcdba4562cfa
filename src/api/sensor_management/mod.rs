pub mod action;
pub mod create;
pub mod get_sensor;
pub mod list;
pub mod models;
pub mod record_reading;
