use crate::api::equipment_management::models::Equipment;
use crate::api::form_fields::FormDate;
use crate::api::rental_management::models::{Rental, RentalStatus};
use crate::api::rental_management::pricing::{self, Quote};
use crate::api::user_management::models::UserLoggedIn;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use crate::schema::rentals;
use crate::settings::Settings;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use rocket::form::Form;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use rust_decimal::Decimal;

#[derive(FromForm)]
pub struct FormRentalRequest {
    start_date: FormDate,
    end_date: FormDate,
    #[field(default = false)]
    delivery_required: bool,
    #[field(default = String::new())]
    delivery_address: String,
    #[field(default = String::new())]
    renter_notes: String,
}

#[derive(Insertable)]
#[diesel(table_name = rentals)]
struct NewRental {
    equipment_id: i32,
    renter_id: i32,
    owner_id: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    daily_rate: Decimal,
    total_days: i32,
    subtotal: Decimal,
    security_deposit: Decimal,
    delivery_fee: Decimal,
    service_fee: Decimal,
    total_amount: Decimal,
    delivery_required: bool,
    delivery_address: String,
    status: String,
    renter_notes: String,
}

enum BookingError {
    Overlap,
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for BookingError {
    fn from(err: diesel::result::Error) -> Self {
        BookingError::Db(err)
    }
}

impl From<BookingError> for ErrorResponse {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Overlap => ErrorResponse::new(
                Status { code: 409 },
                "Equipment is already booked for these dates".to_string(),
            ),
            BookingError::Db(diesel::result::Error::NotFound) => {
                ErrorResponse::not_found("equipment")
            }
            BookingError::Db(err) => ErrorResponse::new(
                Status { code: 500 },
                format!("Couldn't create rental: {}", err),
            ),
        }
    }
}

/// Checks the request against what the listing offers.
pub(crate) fn check_request(
    item: &Equipment,
    renter_id: i32,
    delivery_required: bool,
    delivery_address: &str,
) -> Result<(), String> {
    if !item.is_listed() {
        return Err("Equipment is not available for rent".to_string());
    }
    if item.owner_id == renter_id {
        return Err("You can't rent your own equipment".to_string());
    }
    if delivery_required {
        if !item.is_available_for_delivery {
            return Err("This equipment is not available for delivery".to_string());
        }
        if delivery_address.trim().is_empty() {
            return Err("A delivery address is required".to_string());
        }
    } else if !item.is_available_for_pickup {
        return Err("This equipment is only available for delivery".to_string());
    }
    Ok(())
}

fn new_rental(item: &Equipment, renter_id: i32, form: &FormRentalRequest, quote: Quote) -> NewRental {
    NewRental {
        equipment_id: item.id,
        renter_id,
        owner_id: item.owner_id,
        start_date: form.start_date.0,
        end_date: form.end_date.0,
        daily_rate: quote.daily_rate,
        total_days: quote.total_days,
        subtotal: quote.subtotal,
        security_deposit: quote.security_deposit,
        delivery_fee: quote.delivery_fee,
        service_fee: quote.service_fee,
        total_amount: quote.total_amount,
        delivery_required: form.delivery_required,
        delivery_address: if form.delivery_required {
            form.delivery_address.trim().to_string()
        } else {
            String::new()
        },
        status: RentalStatus::Pending.as_str().to_string(),
        renter_notes: form.renter_notes.clone(),
    }
}

#[post("/equipment/<eid>/rent", data = "<form_rental>")]
pub(crate) async fn create_rental_request(
    eid: i32,
    form_rental: Form<FormRentalRequest>,
    user: UserLoggedIn,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<Json<Rental>, ErrorResponse> {
    let form = form_rental.into_inner();
    let renter_id = user.0.id;
    let fee_percent = settings.service_fee_percent;

    let days = pricing::rental_days(form.start_date.0, form.end_date.0, Utc::now().date_naive())
        .map_err(|err| ErrorResponse::bad_request(err.to_string()))?;

    let rental = conn
        .run(move |c| {
            c.build_transaction()
                .read_write()
                .run::<_, BookingError, _>(|c| {
                    // Row lock serialises concurrent requests for the same listing.
                    let item = {
                        use schema::equipment::dsl::*;
                        equipment.find(eid).for_update().first::<Equipment>(c)?
                    };

                    if let Err(reason) =
                        check_request(&item, renter_id, form.delivery_required, &form.delivery_address)
                    {
                        return Ok(Err(reason));
                    }

                    let booked = {
                        use schema::rentals::dsl::*;
                        rentals
                            .filter(equipment_id.eq(eid))
                            .filter(status.eq_any(RentalStatus::blocking_values()))
                            .select((start_date, end_date))
                            .load::<(NaiveDate, NaiveDate)>(c)?
                    };
                    let booked = booked.into_iter().any(|(from, to)| {
                        pricing::overlaps(form.start_date.0, form.end_date.0, from, to)
                    });
                    if booked {
                        return Err(BookingError::Overlap);
                    }

                    let quote = pricing::quote(&item, days, form.delivery_required, fee_percent);
                    let rental = new_rental(&item, renter_id, &form, quote);
                    let rental = diesel::insert_into(schema::rentals::table)
                        .values(&rental)
                        .get_result::<Rental>(c)?;

                    Ok(Ok(rental))
                })
        })
        .await
        .map_err(ErrorResponse::from)?
        .map_err(ErrorResponse::bad_request)?;

    tracing::info!(
        rental_id = rental.id,
        equipment_id = eid,
        renter_id,
        total = %rental.total_amount,
        "rental requested"
    );

    Ok(Json(rental))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::equipment_management::models::tests::listing;

    #[test]
    fn only_listed_equipment_can_be_requested() {
        let item = listing(1, "pending");
        assert_eq!(
            check_request(&item, 2, false, ""),
            Err("Equipment is not available for rent".to_string())
        );
        assert!(check_request(&listing(1, "active"), 2, false, "").is_ok());
    }

    #[test]
    fn owners_can_not_rent_their_own_listing() {
        assert_eq!(
            check_request(&listing(1, "active"), 1, false, ""),
            Err("You can't rent your own equipment".to_string())
        );
    }

    #[test]
    fn delivery_needs_an_offer_and_an_address() {
        let mut item = listing(1, "active");
        assert!(check_request(&item, 2, true, "").is_err());
        assert!(check_request(&item, 2, true, "1 Main St").is_ok());

        item.is_available_for_delivery = false;
        assert_eq!(
            check_request(&item, 2, true, "1 Main St"),
            Err("This equipment is not available for delivery".to_string())
        );

        item.is_available_for_delivery = true;
        item.is_available_for_pickup = false;
        assert!(check_request(&item, 2, false, "").is_err());
    }
}
