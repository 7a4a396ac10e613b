//! Geo Reference: hierarchical geographic lookup over three independently
//! authored reference datasets (boundary polygons, country-code gazetteer,
//! admin1 and city gazetteers).

pub mod config;
pub mod reference;
pub mod server;
