use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt::Debug;

use crate::schema::reviews;

pub use crate::api::choices::ReviewerType;

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = reviews)]
pub struct Review {
    pub id: i32,
    pub rental_id: i32,
    pub reviewer_id: i32,
    pub reviewee_id: i32,
    pub equipment_id: i32,
    pub reviewer_type: String,
    pub rating: i32,
    pub communication_rating: Option<i32>,
    pub condition_rating: Option<i32>,
    pub timeliness_rating: Option<i32>,
    pub title: String,
    pub comment: String,
    pub is_public: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = reviews)]
pub(crate) struct NewReview {
    pub(crate) rental_id: i32,
    pub(crate) reviewer_id: i32,
    pub(crate) reviewee_id: i32,
    pub(crate) equipment_id: i32,
    pub(crate) reviewer_type: String,
    pub(crate) rating: i32,
    pub(crate) communication_rating: Option<i32>,
    pub(crate) condition_rating: Option<i32>,
    pub(crate) timeliness_rating: Option<i32>,
    pub(crate) title: String,
    pub(crate) comment: String,
    pub(crate) is_public: bool,
}
