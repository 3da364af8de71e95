pub mod extractor;
pub mod in_flight;
pub mod jwt;
pub mod pagination;
pub mod state;
pub mod test_utils;
