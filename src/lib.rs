pub mod chart;
pub mod driver;
pub mod errors;
mod information;
pub mod input;
pub mod loader;
pub mod melt;
pub mod output;
pub mod pivot;
pub mod reshape;
pub mod table;
