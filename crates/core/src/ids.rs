use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

/// Identifies a request end-to-end across governor, breaker, and telemetry.
newtype_id!(RequestId);

/// A vendor name (`"openai"`, `"vertex"`, ...). Not an enum: new vendors are
/// added by registering an adapter, not by a code change here.
newtype_id!(VendorId);

/// A vendor-specific model identifier (`"gpt-5"`, `"gemini-2.0-flash"`, ...).
newtype_id!(ModelId);
