pub mod caching;
pub mod priceto_day;

pub use caching::CachingRateProvider;
pub use priceto_day::PricetoDayProvider;
