//! Closed value sets stored as `VARCHAR` columns.
//!
//! Each set parses from its database/form spelling, prints back to it and
//! serializes as that string.

use std::fmt;
use std::str::FromStr;

use rocket::form::{self, FromFormField, ValueField};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! choices {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(UnknownChoice {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'v> FromFormField<'v> for $name {
            fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
                field
                    .value
                    .parse()
                    .map_err(|err: UnknownChoice| form::Error::validation(err.to_string()).into())
            }
        }
    };
}

choices!(Role, "role" {
    Customer => "customer",
    Vendor => "vendor",
    Admin => "admin",
});

choices!(GamingExperience, "gaming experience" {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
    Professional => "professional",
});

choices!(EquipmentCondition, "condition" {
    Excellent => "excellent",
    VeryGood => "very_good",
    Good => "good",
    Fair => "fair",
});

choices!(EquipmentStatus, "equipment status" {
    Draft => "draft",
    Pending => "pending",
    Active => "active",
    Rented => "rented",
    Inactive => "inactive",
    Suspended => "suspended",
    Rejected => "rejected",
});

choices!(
    /// Rental workflow states. Nothing restricts which state may follow which.
    RentalStatus, "rental status" {
    Pending => "pending",
    Approved => "approved",
    PaymentPending => "payment_pending",
    Confirmed => "confirmed",
    Active => "active",
    Returned => "returned",
    Completed => "completed",
    Cancelled => "cancelled",
    Disputed => "disputed",
});

choices!(PaymentType, "payment type" {
    RentalPayment => "rental_payment",
    SecurityDeposit => "security_deposit",
    DeliveryFee => "delivery_fee",
    LateFee => "late_fee",
    DamageFee => "damage_fee",
    Refund => "refund",
});

choices!(PaymentMethod, "payment method" {
    PayPal => "paypal",
    Stripe => "stripe",
    Manual => "manual",
});

choices!(PaymentStatus, "payment status" {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
    Disputed => "disputed",
});

choices!(ReviewerType, "reviewer type" {
    RenterToOwner => "renter_to_owner",
    OwnerToRenter => "owner_to_renter",
    EquipmentReview => "equipment_review",
});

choices!(SensorType, "sensor type" {
    Location => "location",
    Usage => "usage",
    Condition => "condition",
    Temperature => "temperature",
    Humidity => "humidity",
    Motion => "motion",
    Battery => "battery",
});

choices!(SensorStatus, "sensor status" {
    Active => "active",
    Inactive => "inactive",
    Maintenance => "maintenance",
    Error => "error",
});

impl RentalStatus {
    /// States in which a rental holds the equipment for its dates.
    pub const BLOCKING: &'static [RentalStatus] = &[
        RentalStatus::Approved,
        RentalStatus::PaymentPending,
        RentalStatus::Confirmed,
        RentalStatus::Active,
    ];

    pub fn blocking_values() -> Vec<&'static str> {
        Self::BLOCKING.iter().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rental_status_round_trips() {
        for status in RentalStatus::ALL {
            assert_eq!(status.as_str().parse::<RentalStatus>(), Ok(*status));
        }
        assert_eq!(RentalStatus::ALL.len(), 9);
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = "shipped".parse::<RentalStatus>().unwrap_err();
        assert_eq!(err.kind, "rental status");
        assert_eq!(err.to_string(), "unknown rental status 'shipped'");

        assert!("Admin".parse::<Role>().is_err());
        assert!("refunded".parse::<PaymentStatus>().is_ok());
    }

    #[test]
    fn serializes_as_database_spelling() {
        let json = serde_json::to_string(&PaymentType::SecurityDeposit).unwrap();
        assert_eq!(json, "\"security_deposit\"");
        assert_eq!(EquipmentCondition::VeryGood.to_string(), "very_good");
    }

    #[test]
    fn blocking_statuses_exclude_pending_and_finished() {
        let blocking = RentalStatus::blocking_values();
        assert!(blocking.contains(&"confirmed"));
        assert!(!blocking.contains(&"pending"));
        assert!(!blocking.contains(&"completed"));
        assert!(!blocking.contains(&"cancelled"));
    }
}
