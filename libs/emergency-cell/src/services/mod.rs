pub mod emergency;
pub mod triage;
