pub mod eligibility;
pub mod review;
