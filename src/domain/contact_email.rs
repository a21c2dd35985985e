use serde::{de::Visitor, Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::validate_email;

#[derive(Debug, Serialize, Clone)]
pub struct ContactEmail(String);

impl AsRef<str> for ContactEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ContactEmail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ContactEmailVisitor;

        impl<'de> Visitor<'de> for ContactEmailVisitor {
            type Value = ContactEmail;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a valid contact email string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ContactEmail::parse(value.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(ContactEmailVisitor)
    }
}

impl ContactEmail {
    pub fn parse(s: String) -> Result<Self, String> {
        if validate_email(&s) {
            Ok(Self(s))
        } else {
            Err(format!("{s} is not a valid contact email."))
        }
    }
}
