use crate::api::choices::EquipmentStatus;
use crate::api::equipment_management::models::Equipment;
use crate::api::form_fields::FormDecimal;
use crate::api::pagination::{self, Page, PER_PAGE};
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use crate::schema::equipment;
use diesel::pg::Pg;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::Json;

#[derive(FromForm)]
pub struct EquipmentFilter {
    search: Option<String>,
    category: Option<i32>,
    min_rate: Option<FormDecimal>,
    max_rate: Option<FormDecimal>,
    city: Option<String>,
    sort: Option<String>,
    page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortOrder {
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl SortOrder {
    pub(crate) fn parse(sort: Option<&str>) -> SortOrder {
        match sort {
            Some("price_asc") => SortOrder::PriceAsc,
            Some("price_desc") => SortOrder::PriceDesc,
            Some("rating") => SortOrder::Rating,
            _ => SortOrder::Newest,
        }
    }
}

/// Substring `ILIKE` pattern. Wildcards typed by the user match literally.
pub(crate) fn search_pattern(search: &str) -> Option<String> {
    let search = search.trim();
    if search.is_empty() {
        return None;
    }

    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}

fn listed(filter: &EquipmentFilter) -> equipment::BoxedQuery<'static, Pg> {
    use schema::equipment::dsl::*;

    let mut query = equipment
        .filter(status.eq(EquipmentStatus::Active.as_str()))
        .into_boxed();

    if let Some(pattern) = filter.search.as_deref().and_then(search_pattern) {
        query = query.filter(
            title
                .ilike(pattern.clone())
                .or(description.ilike(pattern.clone()))
                .or(brand.ilike(pattern.clone()))
                .or(model.ilike(pattern)),
        );
    }
    if let Some(cid) = filter.category {
        query = query.filter(category_id.eq(cid));
    }
    if let Some(FormDecimal(min)) = filter.min_rate {
        query = query.filter(daily_rate.ge(min));
    }
    if let Some(FormDecimal(max)) = filter.max_rate {
        query = query.filter(daily_rate.le(max));
    }
    if let Some(pattern) = filter.city.as_deref().and_then(search_pattern) {
        query = query.filter(location_city.ilike(pattern));
    }

    query
}

#[get("/equipment?<filter..>")]
pub(crate) async fn list_equipment(
    filter: EquipmentFilter,
    conn: DbConn,
) -> Result<Json<Page<Equipment>>, ErrorResponse> {
    let page = pagination::page_number(filter.page);
    let sort = SortOrder::parse(filter.sort.as_deref());

    let (items, total) = conn
        .run(move |c| {
            use schema::equipment::dsl::*;

            let total = listed(&filter).count().get_result::<i64>(c)?;

            let query = listed(&filter);
            let query = match sort {
                SortOrder::Newest => query.order(created_at.desc()),
                SortOrder::PriceAsc => query.order(daily_rate.asc()),
                SortOrder::PriceDesc => query.order(daily_rate.desc()),
                SortOrder::Rating => query.order(average_rating.desc()),
            };
            let items = query
                .then_order_by(id.desc())
                .limit(PER_PAGE)
                .offset(pagination::offset(page))
                .load::<Equipment>(c)?;

            Ok::<_, diesel::result::Error>((items, total))
        })
        .await
        .map_err(|_| {
            ErrorResponse::new(Status { code: 500 }, "Couldn't load equipment".to_string())
        })?;

    Ok(Json(Page::new(items, page, total)))
}

#[get("/my_equipment")]
pub(crate) async fn my_equipment(
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Vec<Equipment>>, ErrorResponse> {
    let items = conn
        .run(move |c| {
            use schema::equipment::dsl::*;
            equipment
                .filter(owner_id.eq(user.0.id))
                .order(created_at.desc())
                .load::<Equipment>(c)
                .map_err(|_| {
                    ErrorResponse::new(Status { code: 500 }, "Couldn't load equipment".to_string())
                })
        })
        .await?;

    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_falls_back_to_newest() {
        assert_eq!(SortOrder::parse(None), SortOrder::Newest);
        assert_eq!(SortOrder::parse(Some("cheapest")), SortOrder::Newest);
        assert_eq!(SortOrder::parse(Some("price_desc")), SortOrder::PriceDesc);
        assert_eq!(SortOrder::parse(Some("rating")), SortOrder::Rating);
    }

    #[test]
    fn blank_search_adds_no_filter() {
        assert_eq!(search_pattern("   "), None);
        assert_eq!(search_pattern(" xbox "), Some("%xbox%".to_string()));
    }

    #[test]
    fn wildcards_in_search_are_escaped() {
        assert_eq!(search_pattern("100%"), Some(r"%100\%%".to_string()));
        assert_eq!(search_pattern("ps_5"), Some(r"%ps\_5%".to_string()));
        assert_eq!(search_pattern(r"a\b"), Some(r"%a\\b%".to_string()));
    }
}
