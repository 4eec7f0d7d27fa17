pub mod bucket;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod occupancy;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod stats;
