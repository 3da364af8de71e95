pub mod backend;
pub mod error;

pub use backend::BackendClient;
pub use error::BackendError;
