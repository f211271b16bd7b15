pub mod migrate;
pub mod render;
pub mod token;
