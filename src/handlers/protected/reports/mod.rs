pub mod crud;
pub mod generate;

pub use crud::{create, delete, get, list, patch};
pub use generate::{executions, generate};
