use crate::api::choices::EquipmentStatus;
use crate::api::equipment_management::edit::managed_equipment;
use crate::api::equipment_management::models::Equipment;
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use chrono::Utc;
use diesel::prelude::*;
use rocket::serde::json::Json;

/// Owners may only pause and resume a listing; every other status is set
/// by administrators.
pub(crate) fn toggled(current: Option<EquipmentStatus>) -> Option<EquipmentStatus> {
    match current {
        Some(EquipmentStatus::Active) => Some(EquipmentStatus::Inactive),
        Some(EquipmentStatus::Inactive) => Some(EquipmentStatus::Active),
        _ => None,
    }
}

#[post("/equipment/<eid>/toggle_status")]
pub(crate) async fn toggle_status(
    eid: i32,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Equipment>, ErrorResponse> {
    let item = managed_equipment(&conn, eid, &user).await?;

    let next = toggled(item.status()).ok_or_else(|| {
        ErrorResponse::bad_request(format!(
            "Equipment in status '{}' can't be toggled",
            item.status
        ))
    })?;

    let item = conn
        .run(move |c| {
            use schema::equipment::dsl::*;
            diesel::update(equipment.find(eid))
                .set((status.eq(next.as_str()), updated_at.eq(Utc::now().naive_utc())))
                .get_result::<Equipment>(c)
                .map_err(db_error("equipment"))
        })
        .await?;

    tracing::info!(equipment_id = eid, status = %next, "equipment status toggled");

    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_and_inactive_toggle() {
        assert_eq!(
            toggled(Some(EquipmentStatus::Active)),
            Some(EquipmentStatus::Inactive)
        );
        assert_eq!(
            toggled(Some(EquipmentStatus::Inactive)),
            Some(EquipmentStatus::Active)
        );
        assert_eq!(toggled(Some(EquipmentStatus::Pending)), None);
        assert_eq!(toggled(Some(EquipmentStatus::Suspended)), None);
        assert_eq!(toggled(None), None);
    }
}
