pub mod case;
pub mod config;
pub mod data_io;
pub mod field;
pub mod math;
pub mod operators;
pub mod options;
pub mod pipeline;
pub mod render;
pub mod time_utils;

pub use time_utils::*;
