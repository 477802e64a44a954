//! Base architecture modules

pub mod aggregator;
pub mod attention;
pub mod config;
pub mod encoder;
pub mod layers;
pub mod loss_utils;
pub mod mlp;
pub mod model;
