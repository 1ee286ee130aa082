pub mod configuration;
pub mod costs;
pub mod migrate;
pub mod pull;
pub mod qbo;
pub mod sync;
