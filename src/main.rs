#[macro_use]
extern crate rocket;

use gamezone::gateway::{Gateway, PayPalClient};
use gamezone::settings::Settings;
use gamezone::logging;

#[launch]
fn rocket() -> _ {
    dotenv::dotenv().ok();

    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(err) => panic!("invalid configuration: {}", err),
    };
    logging::init(&settings);

    let paypal = match PayPalClient::new(&settings) {
        Ok(client) => client,
        Err(err) => panic!("couldn't build payment gateway client: {}", err),
    };
    if settings.paypal_client_id.is_empty() || settings.paypal_client_secret.is_empty() {
        tracing::warn!("paypal credentials missing, payments will fail");
    }
    tracing::info!(
        mode = %settings.paypal_mode,
        base_url = settings.paypal_api_base(),
        "payment gateway configured"
    );

    gamezone::rocket(settings, Gateway::new(paypal))
}
