use serde::{Deserialize, Serialize};

/// Declares a numeric identifier newtype.
///
/// Identifiers are database-assigned `BIGSERIAL` values on both services,
/// wrapped to keep room, hotel, user and booking ids from being mixed up.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a room owned by the hotel service.
    RoomId
);

numeric_id!(
    /// Identifier of a hotel.
    HotelId
);

numeric_id!(
    /// Identifier of a booking owned by the booking service.
    BookingId
);

numeric_id!(
    /// Identifier of an (already authenticated) user.
    UserId
);
