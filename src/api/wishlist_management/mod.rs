pub mod add;
pub mod list;
pub mod models;
pub mod remove;
