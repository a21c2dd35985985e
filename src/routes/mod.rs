mod articles;
mod contact;
mod health_check;
mod login;
mod signup;
mod unsubscribe;

pub use articles::*;
pub use contact::*;
pub use health_check::*;
pub use login::*;
pub use signup::*;
pub use unsubscribe::*;
