use crate::routes::ContactFormData;

use super::{ContactEmail, ContactName};

const MAX_PHONE_CHARS: usize = 20;

#[derive(Debug)]
pub struct NewContactMessage {
    pub name: ContactName,
    pub email: ContactEmail,
    pub phone: String,
    pub message: String,
    pub consent_email_updates: bool,
}

impl TryFrom<ContactFormData> for NewContactMessage {
    type Error = String;

    fn try_from(value: ContactFormData) -> Result<Self, Self::Error> {
        let name = ContactName::parse(value.name)?;
        let email = ContactEmail::parse(value.email)?;
        if value.phone.chars().count() > MAX_PHONE_CHARS {
            return Err(format!("{} is not a valid phone number.", value.phone));
        }
        if value.message.trim().is_empty() {
            return Err("A contact message must not be empty.".into());
        }
        Ok(Self {
            name,
            email,
            phone: value.phone,
            message: value.message,
            consent_email_updates: value.consent_email_updates,
        })
    }
}
