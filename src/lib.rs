#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;

pub mod api;
pub mod db;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod schema;
pub mod settings;

use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};

use crate::api::user_management::sessions::UserSession;
use crate::db::DbConn;
use crate::gateway::Gateway;
use crate::settings::Settings;

#[get("/")]
fn index() -> &'static str {
    "GameZone API"
}

/// Routes, catchers and managed state, without the database fairings.
pub fn build(settings: Settings, gateway: Gateway) -> Rocket<Build> {
    rocket::build()
        .manage(settings)
        .manage(UserSession::new())
        .manage(gateway)
        .register(
            "/",
            catchers![
                error::unauthorized,
                error::forbidden,
                error::not_found,
                error::unprocessable,
                error::internal_error,
            ],
        )
        .mount(
            "/api/v1/",
            routes![
                index,
                api::user_management::login::check_login,
                api::user_management::login::check_login_unauthorised,
                api::user_management::login::login,
                api::user_management::login::logout,
                api::user_management::register::register,
                api::user_management::verification::verify_email,
                api::user_management::verification::resend_verification,
                api::user_management::profile::get_profile,
                api::user_management::profile::update_profile,
                api::user_management::profile::switch_role,
                api::user_management::dashboard::dashboard,
                api::category_management::list::list_categories,
                api::category_management::list::admin_list_categories,
                api::category_management::create::create_category,
                api::category_management::create::toggle_category,
                api::equipment_management::list::list_equipment,
                api::equipment_management::list::my_equipment,
                api::equipment_management::get_equipment::get_equipment,
                api::equipment_management::create::create_equipment,
                api::equipment_management::edit::edit_equipment,
                api::equipment_management::delete::delete_equipment,
                api::equipment_management::toggle_status::toggle_status,
                api::equipment_management::image::get_equipment_image,
                api::equipment_management::image::upload_equipment_image,
                api::rental_management::create::create_rental_request,
                api::rental_management::list::my_rentals,
                api::rental_management::list::rental_requests,
                api::rental_management::get_rental::get_rental,
                api::rental_management::manage::manage_rental,
                api::rental_management::cancel::cancel_rental,
                api::payment_management::initiate::initiate_payment,
                api::payment_management::callbacks::payment_success,
                api::payment_management::callbacks::payment_cancel,
                api::payment_management::list::rental_payments,
                api::review_management::create::create_review,
                api::review_management::list::equipment_reviews,
                api::message_management::send::send_message,
                api::message_management::list::inbox,
                api::message_management::list::sent,
                api::message_management::mark_read::mark_read,
                api::wishlist_management::list::list_wishlist,
                api::wishlist_management::add::add_to_wishlist,
                api::wishlist_management::remove::remove_from_wishlist,
                api::sensor_management::list::list_sensors,
                api::sensor_management::get_sensor::get_sensor,
                api::sensor_management::create::create_sensor,
                api::sensor_management::action::sensor_action,
                api::sensor_management::record_reading::record_reading,
                api::admin::dashboard::admin_dashboard,
                api::admin::users::list_users,
                api::admin::users::user_detail,
                api::admin::users::edit_user,
                api::admin::users::user_action,
                api::admin::equipment::list_equipment,
                api::admin::equipment::equipment_detail,
                api::admin::equipment::equipment_action,
                api::admin::rentals::list_rentals,
                api::admin::rentals::admin_rental_detail,
                api::admin::rentals::rental_action,
                api::admin::rentals::admin_initiate_payment,
                api::admin::payments::list_payments,
                api::admin::payments::payment_detail,
                api::admin::payments::refresh_payment,
                api::admin::payments::payment_action,
            ],
        )
}

/// The full service: [`build`] plus the connection pool, migrations and the
/// bootstrap administrator.
pub fn rocket(settings: Settings, gateway: Gateway) -> Rocket<Build> {
    build(settings, gateway)
        .attach(DbConn::fairing())
        .attach(AdHoc::try_on_ignite("Run migrations", db::run_db_migrations))
        .attach(AdHoc::on_ignite("Bootstrap admin", db::bootstrap_admin))
}
