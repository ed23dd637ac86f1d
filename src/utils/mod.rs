pub mod geocode;
pub mod signup_cache;
pub mod signup_filter;
