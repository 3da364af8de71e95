pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::{appointment_routes, slot_routes};
