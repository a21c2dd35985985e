use serde::{de::Visitor, Deserialize, Deserializer, Serialize};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

const MAX_NAME_GRAPHEMES: usize = 100;
const FORBIDDEN_CHARS: [char; 9] = ['/', '{', '}', '"', '>', '<', '\\', '(', ')'];

#[derive(Debug, Serialize, Clone)]
pub struct ContactName(String);

impl ContactName {
    pub fn parse(s: String) -> Result<Self, String> {
        let is_empty_or_whitespace = s.trim().is_empty();
        let is_too_long = s.graphemes(true).count() > MAX_NAME_GRAPHEMES;
        let contains_forbidden_chars = s.chars().any(|c| FORBIDDEN_CHARS.contains(&c));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_chars {
            Err(format!("{s} is not a valid contact name."))
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for ContactName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ContactName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ContactNameVisitor;

        impl<'de> Visitor<'de> for ContactNameVisitor {
            type Value = ContactName;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a valid contact name string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ContactName::parse(value.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(ContactNameVisitor)
    }
}
