pub mod aggregate;
pub mod dedup;
pub mod geocoding;
pub mod normalize;
pub mod open_meteo;
pub mod pipeline;
pub mod query;
pub mod records;
