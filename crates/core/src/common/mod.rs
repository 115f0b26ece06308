pub mod time;

use serde::{Deserialize, Deserializer, Serialize};

/// # Summary
/// Raw token of an enumerated wire field.
///
/// # Invariants
/// - Producers emit enumerations either as integer codes or as variant names.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireToken {
    Code(i64),
    Name(String),
}

/// # Summary
/// Declares an enumeration that travels on the wire either as an integer code or
/// as its (case-insensitive) variant name, and is written back as its code.
///
/// # Logic
/// 1. Generates the enum together with `code`, `from_code`, `name` and `from_name`.
/// 2. Implements `Display`, `FromStr`, `Serialize` and `Deserialize` on top of them.
/// 3. Unknown codes or names are deserialization errors, never silent defaults.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Integer code used on the wire.
            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }

            /// Case-insensitive lookup by variant name.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(name.trim()))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if let Ok(code) = s.trim().parse::<i64>() {
                    return Self::from_code(code)
                        .ok_or_else(|| format!("Unknown {} code: {}", stringify!($name), code));
                }
                Self::from_name(s).ok_or_else(|| format!("Unknown {} value: {}", stringify!($name), s))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i64(self.code())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                match <$crate::common::WireToken as serde::Deserialize>::deserialize(deserializer)? {
                    $crate::common::WireToken::Code(code) => Self::from_code(code).ok_or_else(|| {
                        serde::de::Error::custom(format!("Unknown {} code: {}", stringify!($name), code))
                    }),
                    $crate::common::WireToken::Name(name) => Self::from_name(&name).ok_or_else(|| {
                        serde::de::Error::custom(format!("Unknown {} value: {}", stringify!($name), name))
                    }),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

/// # Summary
/// Security symbol as reported by the producer.
///
/// # Invariants
/// - `value` is the human-readable ticker, `id` the full security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Symbol {
    // full security identifier (e.g. "SPY R735QTJ8XC9X")
    pub id: String,
    // ticker (e.g. "SPY")
    pub value: String,
}

impl Symbol {
    /// # Summary
    /// Builds a symbol from a bare security identifier.
    ///
    /// # Logic
    /// The ticker is the first whitespace-separated token of the identifier.
    pub fn from_identifier(id: &str) -> Self {
        let id = id.trim();
        let value = id.split_whitespace().next().unwrap_or(id);
        Self {
            id: id.to_string(),
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SymbolRepr {
    Identifier(String),
    Object {
        #[serde(alias = "ID", alias = "Id")]
        id: String,
        #[serde(alias = "Value")]
        value: Option<String>,
    },
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match SymbolRepr::deserialize(deserializer)? {
            SymbolRepr::Identifier(id) => {
                if id.trim().is_empty() {
                    return Err(serde::de::Error::custom("Empty symbol identifier"));
                }
                Ok(Symbol::from_identifier(&id))
            }
            SymbolRepr::Object { id, value } => match value {
                Some(value) => Ok(Symbol { id, value }),
                None => Ok(Symbol::from_identifier(&id)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    wire_enum! {
        enum Colour {
            Red = 0,
            Green = 7,
        }
    }

    #[test]
    fn wire_enum_accepts_codes_and_names() {
        let by_code: Colour = serde_json::from_str("7").unwrap();
        let by_name: Colour = serde_json::from_str("\"rEd\"").unwrap();
        assert_eq!(by_code, Colour::Green);
        assert_eq!(by_name, Colour::Red);
        assert_eq!(serde_json::to_string(&Colour::Green).unwrap(), "7");
        assert!(serde_json::from_str::<Colour>("3").is_err());
        assert!(serde_json::from_str::<Colour>("\"Blue\"").is_err());
        assert_eq!("green".parse::<Colour>(), Ok(Colour::Green));
    }

    #[test]
    fn symbol_from_identifier_or_object() {
        let plain: Symbol = serde_json::from_str("\"SPY R735QTJ8XC9X\"").unwrap();
        assert_eq!(plain.value, "SPY");
        assert_eq!(plain.id, "SPY R735QTJ8XC9X");

        let object: Symbol =
            serde_json::from_str(r#"{"ID":"AAPL R735QTJ8XC9X","Value":"AAPL"}"#).unwrap();
        assert_eq!(object.value, "AAPL");

        let round: Symbol = serde_json::from_str(&serde_json::to_string(&object).unwrap()).unwrap();
        assert_eq!(round, object);
    }
}
