//! Strongly-typed identifier value objects.
//!
//! Every identifier in this system is issued by an external platform (the
//! commerce platform or the chat platform), so all of them are opaque,
//! non-empty strings rather than locally generated UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning error if empty.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// User identifier issued by the commerce platform. Primary key of a subscriber.
    ExternalUserId,
    "external_user_id"
);

string_id!(
    /// User identifier issued by the community chat platform.
    ChatUserId,
    "chat_user_id"
);

string_id!(
    /// Product identifier issued by the commerce platform.
    ProductId,
    "product_id"
);

string_id!(
    /// Subscription identifier issued by the commerce platform.
    SubscriptionId,
    "subscription_id"
);

string_id!(
    /// Chat platform role identifier.
    RoleId,
    "role_id"
);

string_id!(
    /// Chat platform channel identifier.
    ChannelId,
    "channel_id"
);
