use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize, de::Visitor};

const UNIT: &str = "mins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("invalid runtime format")]
    InvalidFormat,
}

/// Movie length in minutes, on the wire as `"<N> mins"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(&self) -> i32 {
        self.0
    }
}

impl From<i32> for Runtime {
    fn from(value: i32) -> Self {
        Runtime(value)
    }
}

impl FromStr for Runtime {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(' ').collect();
        match parts.as_slice() {
            [minutes, unit] if *unit == UNIT => minutes
                .parse::<i32>()
                .map(Runtime)
                .map_err(|_| RuntimeError::InvalidFormat),
            _ => Err(RuntimeError::InvalidFormat),
        }
    }
}

impl Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, UNIT)
    }
}

impl Serialize for Runtime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

struct RuntimeVisitor;

impl Visitor<'_> for RuntimeVisitor {
    type Value = Runtime;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string in format \"<minutes> mins\"")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(RuntimeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn test_encode() {
        let json = serde_json::to_string(&Runtime(148)).unwrap();
        assert_eq!(json, r#""148 mins""#);
    }

    #[test]
    fn test_decode() {
        let runtime: Runtime = serde_json::from_str(r#""102 mins""#).unwrap();
        assert_eq!(runtime, Runtime(102));
    }

    #[test]
    fn test_decode_invalid() {
        for input in ["120", "120 minutes", "abc mins", "120 mins extra", "120  mins", ""] {
            assert_eq!(
                input.parse::<Runtime>(),
                Err(RuntimeError::InvalidFormat),
                "input {input:?}"
            );
            let json = serde_json::to_string(input).unwrap();
            let err = serde_json::from_str::<Runtime>(&json).unwrap_err();
            assert!(err.to_string().contains("invalid runtime format"));
        }
    }

    #[test]
    fn test_decode_out_of_range() {
        assert!("2147483648 mins".parse::<Runtime>().is_err());
        assert_eq!("2147483647 mins".parse::<Runtime>(), Ok(Runtime(i32::MAX)));
    }

    #[test]
    fn test_decode_requires_string() {
        assert!(serde_json::from_str::<Runtime>("120").is_err());
        assert!(serde_json::from_str::<Runtime>("null").is_err());
    }

    #[quickcheck]
    fn test_roundtrip(minutes: i32) -> bool {
        let json = serde_json::to_string(&Runtime(minutes)).unwrap();
        serde_json::from_str::<Runtime>(&json).unwrap() == Runtime(minutes)
    }
}
