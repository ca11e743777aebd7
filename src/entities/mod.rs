pub mod business;
pub mod funding_request;
pub mod transaction;
pub mod user;
