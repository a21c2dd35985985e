mod application_base_url;
mod contact;
mod contact_email;
mod contact_name;
mod new_article;
mod new_contact_message;

pub use application_base_url::ApplicationBaseUrl;
pub use contact::Contact;
pub use contact_email::ContactEmail;
pub use contact_name::ContactName;
pub use new_article::NewArticle;
pub use new_contact_message::NewContactMessage;
