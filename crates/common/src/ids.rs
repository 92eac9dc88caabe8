//! Newtype identifiers for the entities that cross service boundaries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a trip, the saga's aggregate root.
    ///
    /// Wraps a UUID to prevent mixing trip ids with other UUID-based
    /// identifiers. Also used as the event-bus partition key for trip events.
    TripId
}

uuid_id! {
    /// Unique identifier for an authenticated driver.
    DriverId
}

uuid_id! {
    /// Unique identifier for an authenticated passenger.
    PassengerId
}

uuid_id! {
    /// Unique identifier carried by a transport message.
    ///
    /// The inbox keys on this value to make at-least-once delivery idempotent.
    MessageId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_id_new_creates_unique_ids() {
        let id1 = TripId::new();
        let id2 = TripId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn trip_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = TripId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn message_id_serialization_roundtrip() {
        let id = MessageId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn driver_id_display_matches_uuid() {
        let uuid = Uuid::new_v4();
        let id = DriverId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }
}
