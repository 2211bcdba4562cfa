pub mod callbacks;
pub mod initiate;
pub mod list;
pub mod models;
