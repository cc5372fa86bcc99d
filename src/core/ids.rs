//! Strongly typed row identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Primary key of a `tickets` row
    TicketId
);
define_id!(
    /// Primary key of a `users` row (login account)
    UserId
);
define_id!(
    /// Primary key of an `employees` profile
    EmployeeId
);
define_id!(
    /// Primary key of a `service_providers` profile
    ProviderId
);
define_id!(DepartmentId);
define_id!(DeviceTypeId);
define_id!(AttachmentId);
define_id!(TicketUpdateId);
define_id!(RatingId);
define_id!(NotificationId);
