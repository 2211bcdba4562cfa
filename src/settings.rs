use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub image_folder: String,
    /// Base URL the gateway redirects buyers back to.
    pub public_url: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_mode: String,
    pub paypal_base_url: Option<String>,
    pub currency: String,
    pub brand_name: String,
    pub service_fee_percent: Decimal,
    pub gateway_timeout_secs: u64,
    pub session_max_age_days: u64,
    pub log_level: String,
    pub log_format: String,
    pub admin_email: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("GameZone").required(false))
                .add_source(Environment::default()),
        )
    }

    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("image_folder", "runtime/images")?
            .set_default("public_url", "http://localhost:8000")?
            .set_default("paypal_client_id", "")?
            .set_default("paypal_client_secret", "")?
            .set_default("paypal_mode", "sandbox")?
            .set_default("currency", "USD")?
            .set_default("brand_name", "GameZone")?
            .set_default("service_fee_percent", "10")?
            .set_default("gateway_timeout_secs", 30)?
            .set_default("session_max_age_days", 30)?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?
            .build()?
            .try_deserialize()
    }

    pub fn paypal_api_base(&self) -> &str {
        match &self.paypal_base_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/'),
            _ if self.paypal_mode == "live" => "https://api-m.paypal.com",
            _ => "https://api-m.sandbox.paypal.com",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn settings_with(overrides: &[(&str, &str)]) -> Settings {
        let mut builder = Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Settings::from_builder(builder).unwrap()
    }

    #[test]
    fn defaults_apply_without_sources() {
        let settings = settings_with(&[]);

        assert_eq!(settings.image_folder, "runtime/images");
        assert_eq!(settings.currency, "USD");
        assert_eq!(settings.service_fee_percent, dec!(10));
        assert_eq!(settings.session_max_age_days, 30);
        assert!(settings.admin_email.is_none());
    }

    #[test]
    fn paypal_base_follows_mode() {
        assert_eq!(
            settings_with(&[]).paypal_api_base(),
            "https://api-m.sandbox.paypal.com"
        );
        assert_eq!(
            settings_with(&[("paypal_mode", "live")]).paypal_api_base(),
            "https://api-m.paypal.com"
        );
        assert_eq!(
            settings_with(&[("paypal_base_url", "http://127.0.0.1:9000/")]).paypal_api_base(),
            "http://127.0.0.1:9000"
        );
    }
}
