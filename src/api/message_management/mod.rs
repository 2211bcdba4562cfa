pub mod list;
pub mod mark_read;
pub mod models;
pub mod send;
