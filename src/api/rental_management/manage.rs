use crate::api::choices::UnknownChoice;
use crate::api::rental_management::get_rental::load_rental;
use crate::api::rental_management::models::{Rental, RentalStatus};
use crate::api::user_management::models::UserLoggedIn;
use crate::api::user_management::profile::profile_for;
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;
use std::str::FromStr;

/// What an owner can do with a request for their equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    Approve,
    Reject,
    Start,
    Return,
    Complete,
}

impl FromStr for OwnerAction {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(OwnerAction::Approve),
            "reject" => Ok(OwnerAction::Reject),
            "start" => Ok(OwnerAction::Start),
            "return" => Ok(OwnerAction::Return),
            "complete" => Ok(OwnerAction::Complete),
            other => Err(UnknownChoice {
                kind: "rental action",
                value: other.to_string(),
            }),
        }
    }
}

impl OwnerAction {
    pub fn target(self) -> RentalStatus {
        match self {
            OwnerAction::Approve => RentalStatus::Approved,
            OwnerAction::Reject => RentalStatus::Cancelled,
            OwnerAction::Start => RentalStatus::Active,
            OwnerAction::Return => RentalStatus::Returned,
            OwnerAction::Complete => RentalStatus::Completed,
        }
    }
}

#[derive(FromForm)]
pub struct FormManageRental {
    action: String,
    owner_notes: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = schema::rentals)]
pub(crate) struct RentalChanges {
    pub(crate) status: Option<String>,
    pub(crate) approved_at: Option<NaiveDateTime>,
    pub(crate) started_at: Option<NaiveDateTime>,
    pub(crate) completed_at: Option<NaiveDateTime>,
    pub(crate) actual_return_date: Option<chrono::NaiveDate>,
    pub(crate) owner_notes: Option<String>,
    pub(crate) updated_at: Option<NaiveDateTime>,
}

impl RentalChanges {
    /// Moves a rental to `target`, stamping the timestamp that belongs to
    /// that status.
    pub(crate) fn to_status(target: RentalStatus, now: NaiveDateTime) -> RentalChanges {
        let mut changes = RentalChanges {
            status: Some(target.as_str().to_string()),
            updated_at: Some(now),
            ..Default::default()
        };
        match target {
            RentalStatus::Approved => changes.approved_at = Some(now),
            RentalStatus::Active => changes.started_at = Some(now),
            RentalStatus::Returned => changes.actual_return_date = Some(now.date()),
            RentalStatus::Completed => changes.completed_at = Some(now),
            _ => {}
        }
        changes
    }
}

/// Whether moving from `previous` to `current` is the rental's first
/// completion. Only that move is booked into statistics.
pub(crate) fn first_completion(previous: Option<RentalStatus>, current: Option<RentalStatus>) -> bool {
    current == Some(RentalStatus::Completed) && previous != Some(RentalStatus::Completed)
}

/// Books a completed rental into the renter's and owner's profiles.
fn book_into_profiles(rental: &Rental, c: &mut PgConnection) -> QueryResult<()> {
    use schema::user_profiles::dsl::*;

    profile_for(rental.renter_id, c)?;
    profile_for(rental.owner_id, c)?;

    diesel::update(user_profiles.filter(user_id.eq(rental.renter_id)))
        .set(total_rentals_as_renter.eq(total_rentals_as_renter + 1))
        .execute(c)?;
    diesel::update(user_profiles.filter(user_id.eq(rental.owner_id)))
        .set((
            total_rentals_as_owner.eq(total_rentals_as_owner + 1),
            total_earnings.eq(total_earnings + rental.subtotal),
        ))
        .execute(c)?;

    Ok(())
}

/// Sets a rental's status and, the first time it completes, books the
/// rental into the equipment's and both parties' statistics.
pub(crate) fn apply_status(
    rental: &Rental,
    changes: &RentalChanges,
    c: &mut PgConnection,
) -> QueryResult<Rental> {
    c.transaction::<_, diesel::result::Error, _>(|c| {
        let updated = diesel::update(rental).set(changes).get_result::<Rental>(c)?;

        if first_completion(rental.status(), updated.status()) {
            {
                use schema::equipment::dsl::*;
                diesel::update(equipment.find(rental.equipment_id))
                    .set((
                        total_rentals.eq(total_rentals + 1),
                        total_revenue.eq(total_revenue + rental.subtotal),
                        last_rented.eq(updated.completed_at),
                    ))
                    .execute(c)?;
            }
            book_into_profiles(rental, c)?;
        }

        Ok(updated)
    })
}

#[post("/rentals/<rid>/manage", data = "<form_manage>")]
pub(crate) async fn manage_rental(
    rid: i32,
    form_manage: Form<FormManageRental>,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Rental>, ErrorResponse> {
    let rental = load_rental(&conn, rid).await?;
    if rental.owner_id != user.0.id {
        return Err(ErrorResponse::forbidden(
            "Only the owner can manage this rental",
        ));
    }

    let form = form_manage.into_inner();
    let action = form
        .action
        .parse::<OwnerAction>()
        .map_err(|err| ErrorResponse::bad_request(err.to_string()))?;

    let mut changes = RentalChanges::to_status(action.target(), Utc::now().naive_utc());
    changes.owner_notes = form.owner_notes;

    let updated = conn
        .run(move |c| apply_status(&rental, &changes, c))
        .await
        .map_err(db_error("rental"))?;

    tracing::info!(
        rental_id = rid,
        owner_id = user.0.id,
        ?action,
        status = %updated.status,
        "rental managed by owner"
    );

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn actions_map_to_statuses() {
        assert_eq!("approve".parse(), Ok(OwnerAction::Approve));
        assert_eq!(OwnerAction::Reject.target(), RentalStatus::Cancelled);
        assert_eq!(OwnerAction::Return.target(), RentalStatus::Returned);
        assert!("ship".parse::<OwnerAction>().is_err());
    }

    #[test]
    fn status_changes_stamp_their_timestamp() {
        let approved = RentalChanges::to_status(RentalStatus::Approved, noon());
        assert_eq!(approved.status.as_deref(), Some("approved"));
        assert_eq!(approved.approved_at, Some(noon()));
        assert_eq!(approved.completed_at, None);

        let returned = RentalChanges::to_status(RentalStatus::Returned, noon());
        assert_eq!(returned.actual_return_date, Some(noon().date()));

        let disputed = RentalChanges::to_status(RentalStatus::Disputed, noon());
        assert_eq!(disputed.status.as_deref(), Some("disputed"));
        assert_eq!(disputed.started_at, None);
    }

    #[test]
    fn only_the_first_completion_is_booked() {
        let completed = Some(RentalStatus::Completed);
        assert!(first_completion(Some(RentalStatus::Returned), completed));
        assert!(first_completion(Some(RentalStatus::Disputed), completed));
        assert!(!first_completion(completed, completed));
        assert!(!first_completion(Some(RentalStatus::Active), Some(RentalStatus::Returned)));
    }
}
