pub mod codec;
pub mod columns;
pub mod config;
pub mod context;
pub mod converter;
pub mod design;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod geo;
pub mod model;
pub mod output;
pub mod platform;
pub mod quantitation;
pub mod sample;
pub mod series;
pub mod store;
pub mod taxon;
pub mod vectors;
pub mod vocabulary;
