//! TypeID-backed identifiers.
//!
//! Every identifier is a `MagicTypeId` with a fixed prefix, time-sortable
//! (UUIDv7) and human readable, e.g. `call_01h455vb4pex5vsknk084sn02q`.

use mti::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Generates a prefixed TypeID newtype together with its parse error.
macro_rules! typeid_identifier {
    (
        $(#[$meta:meta])*
        $name:ident, $error:ident, prefix = $prefix:literal, label = $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(MagicTypeId);

        #[doc = concat!("Error returned when a string is not a valid ", $label, ".")]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum $error {
            /// TypeID parsing failed
            Parse(String),
            #[doc = concat!("Wrong prefix (expected \"", $prefix, "\")")]
            WrongPrefix {
                /// The expected prefix
                expected: &'static str,
                /// The actual prefix found
                actual: String,
            },
        }

        impl fmt::Display for $error {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Parse(e) => write!(f, concat!("invalid ", $label, ": {}"), e),
                    Self::WrongPrefix { expected, actual } => {
                        write!(f, "expected prefix '{expected}', got '{actual}'")
                    }
                }
            }
        }

        impl std::error::Error for $error {}

        impl $name {
            #[doc = concat!("The TypeID prefix for ", $label, "s.")]
            pub const PREFIX: &'static str = $prefix;

            #[doc = concat!("Creates a new ", $label, " with a fresh UUIDv7.")]
            #[must_use]
            pub fn new() -> Self {
                Self(Self::PREFIX.create_type_id::<V7>())
            }

            /// Parses an identifier from a string, validating the prefix.
            ///
            /// # Errors
            ///
            /// Returns `Parse` if the string is not a TypeID and `WrongPrefix`
            /// if it belongs to another identifier family.
            pub fn parse(s: &str) -> Result<Self, $error> {
                let id = MagicTypeId::from_str(s).map_err(|e| $error::Parse(e.to_string()))?;

                let prefix = id.prefix().as_str();
                if prefix != Self::PREFIX {
                    return Err($error::WrongPrefix {
                        expected: Self::PREFIX,
                        actual: prefix.to_string(),
                    });
                }

                Ok(Self(id))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = $error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.to_string().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

typeid_identifier!(
    /// Identifies a single tool invocation attempt, including denied ones.
    ///
    /// Example: `call_01h455vb4pex5vsknk084sn02q`
    InvocationId,
    InvalidInvocationId,
    prefix = "call",
    label = "invocation ID"
);

typeid_identifier!(
    /// Identifies one `execute_chain` run for log correlation and summaries.
    ///
    /// Example: `chain_01h455vb4pex5vsknk084sn02q`
    ChainId,
    InvalidChainId,
    prefix = "chain",
    label = "chain ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_id_has_call_prefix() {
        let id = InvocationId::new();
        assert!(id.to_string().starts_with("call_"));
    }

    #[test]
    fn chain_id_has_chain_prefix() {
        let id = ChainId::new();
        assert!(id.to_string().starts_with("chain_"));
    }

    #[test]
    fn parse_accepts_own_prefix() {
        let text = InvocationId::new().to_string();
        let parsed = InvocationId::parse(&text).unwrap();
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn parse_rejects_other_family() {
        let chain = ChainId::new().to_string();
        let result = InvocationId::parse(&chain);
        assert!(matches!(
            result,
            Err(InvalidInvocationId::WrongPrefix {
                expected: "call",
                ..
            })
        ));
    }

    #[test]
    fn parse_rejects_garbage() {
        let result = ChainId::parse("not-a-valid-typeid");
        assert!(matches!(result, Err(InvalidChainId::Parse(_))));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
        assert_ne!(ChainId::default(), ChainId::default());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = InvocationId::new();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));

        let back: InvocationId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn error_display_mentions_label() {
        let err = InvalidChainId::Parse("bad".to_string());
        assert!(err.to_string().contains("invalid chain ID"));
    }
}
