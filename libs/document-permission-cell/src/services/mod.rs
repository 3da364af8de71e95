pub mod grant;
pub mod permission;
