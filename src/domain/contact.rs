use serde::{Deserialize, Serialize};

use super::{ContactEmail, ContactName};

#[derive(Serialize, Deserialize, Clone)]
pub struct Contact {
    pub name: ContactName,
    pub email: ContactEmail,
}
