// Business domains
pub mod catalog;
pub mod discovery;
pub mod listings;
