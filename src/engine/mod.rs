pub mod classifier;
pub mod generator;
pub mod legs;
pub mod odds;
pub mod selector;

pub use generator::BetGenerator;
