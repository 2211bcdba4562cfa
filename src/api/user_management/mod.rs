pub mod dashboard;
pub mod login;
pub mod models;
pub(crate) mod password;
pub mod profile;
pub mod register;
pub mod sessions;
pub mod verification;
