//! Dimension values (`100px`, `50%`, `1.5em`, `auto`, ...).
//!
//! Serialized as the CSS-style string form in KIR JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A sized or automatic dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Px(f32),
    Percent(f32),
    Em(f32),
    Rem(f32),
    Vw(f32),
    Vh(f32),
    Auto,
}

impl Dimension {
    /// Parse a dimension. Bare numbers mean pixels.
    pub fn parse(text: &str) -> Option<Dimension> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("auto") {
            return Some(Dimension::Auto);
        }
        let (number, unit) = match text.find(|c: char| c.is_ascii_alphabetic() || c == '%') {
            Some(idx) => (&text[..idx], &text[idx..]),
            None => (text, ""),
        };
        let value: f32 = number.trim().parse().ok()?;
        match unit {
            "" | "px" => Some(Dimension::Px(value)),
            "%" => Some(Dimension::Percent(value)),
            "em" => Some(Dimension::Em(value)),
            "rem" => Some(Dimension::Rem(value)),
            "vw" => Some(Dimension::Vw(value)),
            "vh" => Some(Dimension::Vh(value)),
            _ => None,
        }
    }

    /// The numeric part, if not `auto`.
    pub fn value(&self) -> Option<f32> {
        match self {
            Dimension::Px(v)
            | Dimension::Percent(v)
            | Dimension::Em(v)
            | Dimension::Rem(v)
            | Dimension::Vw(v)
            | Dimension::Vh(v) => Some(*v),
            Dimension::Auto => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Px(v) => write!(f, "{v}px"),
            Dimension::Percent(v) => write!(f, "{v}%"),
            Dimension::Em(v) => write!(f, "{v}em"),
            Dimension::Rem(v) => write!(f, "{v}rem"),
            Dimension::Vw(v) => write!(f, "{v}vw"),
            Dimension::Vh(v) => write!(f, "{v}vh"),
            Dimension::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for Dimension {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::parse(s).ok_or(())
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Dimension::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid dimension: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("100px", Dimension::Px(100.0))]
    #[case("100", Dimension::Px(100.0))]
    #[case("50%", Dimension::Percent(50.0))]
    #[case("1.5em", Dimension::Em(1.5))]
    #[case("2rem", Dimension::Rem(2.0))]
    #[case("10vw", Dimension::Vw(10.0))]
    #[case("33vh", Dimension::Vh(33.0))]
    #[case("auto", Dimension::Auto)]
    fn test_parse(#[case] text: &str, #[case] expected: Dimension) {
        assert_eq!(Dimension::parse(text), Some(expected));
    }

    #[rstest]
    #[case("12pt")]
    #[case("wide")]
    #[case("")]
    fn test_parse_rejects(#[case] text: &str) {
        assert_eq!(Dimension::parse(text), None);
    }

    #[test]
    fn test_display_roundtrip() {
        for dim in [Dimension::Px(12.0), Dimension::Percent(50.0), Dimension::Auto] {
            assert_eq!(Dimension::parse(&dim.to_string()), Some(dim));
        }
    }
}
