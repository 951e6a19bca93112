pub mod cache;
pub mod price_source;
