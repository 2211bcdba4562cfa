//! Form field types Rocket has no parser for.

use std::str::FromStr;

use chrono::NaiveDate;
use rocket::form::{self, FromFormField, ValueField};
use rust_decimal::Decimal;

/// A decimal amount such as `12.50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormDecimal(pub Decimal);

/// A calendar date in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormDate(pub NaiveDate);

impl<'v> FromFormField<'v> for FormDecimal {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        Decimal::from_str(field.value.trim())
            .map(FormDecimal)
            .map_err(|_| form::Error::validation("invalid amount").into())
    }
}

impl<'v> FromFormField<'v> for FormDate {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        NaiveDate::parse_from_str(field.value.trim(), "%Y-%m-%d")
            .map(FormDate)
            .map_err(|_| form::Error::validation("invalid date, expected YYYY-MM-DD").into())
    }
}
