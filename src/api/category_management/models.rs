use crate::schema::equipment_categories;
use serde::Serialize;
use std::fmt::Debug;

#[derive(Queryable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = equipment_categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub is_active: bool,
}

#[derive(Serialize, Debug)]
pub struct CategoryOut {
    #[serde(flatten)]
    pub category: Category,
    pub equipment_count: i64,
}
