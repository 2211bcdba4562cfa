use crate::api::choices::RentalStatus;
use crate::api::rental_management::get_rental::load_rental;
use crate::api::rental_management::models::Rental;
use crate::api::user_management::profile::profile_for;
use crate::api::review_management::models::{NewReview, Review, ReviewerType};
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::form::Form;
use rocket::http::Status;
use rocket::serde::json::Json;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(FromForm)]
pub struct FormReview {
    reviewer_type: ReviewerType,
    rating: i32,
    communication_rating: Option<i32>,
    condition_rating: Option<i32>,
    timeliness_rating: Option<i32>,
    #[field(default = String::new())]
    title: String,
    #[field(default = String::new())]
    comment: String,
    #[field(default = true)]
    is_public: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReviewRefusal {
    NotCompleted,
    WrongParty,
}

/// Who gets reviewed when `reviewer_id` writes a review of `kind` on the
/// rental. Renters review the owner or the equipment, owners the renter.
pub(crate) fn reviewee(
    rental: &Rental,
    reviewer_id: i32,
    kind: ReviewerType,
) -> Result<i32, ReviewRefusal> {
    if rental.status() != Some(RentalStatus::Completed) {
        return Err(ReviewRefusal::NotCompleted);
    }

    match kind {
        ReviewerType::RenterToOwner | ReviewerType::EquipmentReview
            if reviewer_id == rental.renter_id =>
        {
            Ok(rental.owner_id)
        }
        ReviewerType::OwnerToRenter if reviewer_id == rental.owner_id => Ok(rental.renter_id),
        _ => Err(ReviewRefusal::WrongParty),
    }
}

pub(crate) fn validate_ratings(ratings: &[(&str, Option<i32>)]) -> Result<(), String> {
    for (name, rating) in ratings {
        if let Some(rating) = rating {
            if !(1..=5).contains(rating) {
                return Err(format!("{} must be between 1 and 5", name));
            }
        }
    }
    Ok(())
}

/// Mean equipment-review rating, rounded to cents. No reviews means zero.
pub(crate) fn average_rating(mean: Option<Decimal>) -> Decimal {
    mean.unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Profile rating a user review feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProfileRating {
    AsOwner,
    AsRenter,
}

impl ProfileRating {
    pub(crate) fn for_review(kind: ReviewerType) -> Option<ProfileRating> {
        match kind {
            ReviewerType::RenterToOwner => Some(ProfileRating::AsOwner),
            ReviewerType::OwnerToRenter => Some(ProfileRating::AsRenter),
            ReviewerType::EquipmentReview => None,
        }
    }
}

/// Recomputes the reviewee's rating as owner or renter from every review of
/// the same kind they received.
fn refresh_profile_rating(
    reviewee_id: i32,
    kind: ReviewerType,
    target: ProfileRating,
    c: &mut PgConnection,
) -> QueryResult<()> {
    let mean = schema::reviews::table
        .filter(schema::reviews::reviewee_id.eq(reviewee_id))
        .filter(schema::reviews::reviewer_type.eq(kind.as_str()))
        .select(diesel::dsl::avg(schema::reviews::rating))
        .first::<Option<Decimal>>(c)?;
    let rounded = average_rating(mean);

    profile_for(reviewee_id, c)?;
    let profile = schema::user_profiles::table.filter(schema::user_profiles::user_id.eq(reviewee_id));
    match target {
        ProfileRating::AsOwner => diesel::update(profile)
            .set(schema::user_profiles::average_rating_as_owner.eq(rounded))
            .execute(c)?,
        ProfileRating::AsRenter => diesel::update(profile)
            .set(schema::user_profiles::average_rating_as_renter.eq(rounded))
            .execute(c)?,
    };
    Ok(())
}

#[post("/rentals/<rid>/review", data = "<form_review>")]
pub(crate) async fn create_review(
    rid: i32,
    form_review: Form<FormReview>,
    user: UserLoggedIn,
    conn: DbConn,
) -> Result<Json<Review>, ErrorResponse> {
    let form = form_review.into_inner();
    let rental = load_rental(&conn, rid).await?;

    let reviewee_id = reviewee(&rental, user.0.id, form.reviewer_type).map_err(|refusal| match refusal {
        ReviewRefusal::NotCompleted => {
            ErrorResponse::bad_request("Only completed rentals can be reviewed")
        }
        ReviewRefusal::WrongParty => {
            ErrorResponse::forbidden("You can't leave this kind of review on this rental")
        }
    })?;

    validate_ratings(&[
        ("Rating", Some(form.rating)),
        ("Communication rating", form.communication_rating),
        ("Condition rating", form.condition_rating),
        ("Timeliness rating", form.timeliness_rating),
    ])
    .map_err(ErrorResponse::bad_request)?;

    let kind = form.reviewer_type;
    let new_review = NewReview {
        rental_id: rental.id,
        reviewer_id: user.0.id,
        reviewee_id,
        equipment_id: rental.equipment_id,
        reviewer_type: kind.as_str().to_string(),
        rating: form.rating,
        communication_rating: form.communication_rating,
        condition_rating: form.condition_rating,
        timeliness_rating: form.timeliness_rating,
        title: form.title.trim().to_string(),
        comment: form.comment.trim().to_string(),
        is_public: form.is_public,
    };
    let eid = rental.equipment_id;

    let review = conn
        .run(move |c| {
            c.transaction::<_, DieselError, _>(|c| {
                let review = diesel::insert_into(schema::reviews::table)
                    .values(&new_review)
                    .get_result::<Review>(c)?;

                if kind == ReviewerType::EquipmentReview {
                    let mean = {
                        use schema::reviews::dsl::*;
                        reviews
                            .filter(equipment_id.eq(eid))
                            .filter(reviewer_type.eq(ReviewerType::EquipmentReview.as_str()))
                            .select(diesel::dsl::avg(rating))
                            .first::<Option<Decimal>>(c)?
                    };
                    let rounded = average_rating(mean);

                    diesel::update(schema::equipment::table.find(eid))
                        .set(schema::equipment::average_rating.eq(rounded))
                        .execute(c)?;
                }
                if let Some(target) = ProfileRating::for_review(kind) {
                    refresh_profile_rating(reviewee_id, kind, target, c)?;
                }

                Ok(review)
            })
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    ErrorResponse::new(
                        Status { code: 409 },
                        "You already left this review".to_string(),
                    )
                }
                err => ErrorResponse::new(
                    Status { code: 500 },
                    format!("Couldn't save review: {}", err),
                ),
            })
        })
        .await?;

    tracing::info!(
        review_id = review.id,
        rental_id = rid,
        reviewer_type = %review.reviewer_type,
        "review created"
    );

    Ok(Json(review))
}
