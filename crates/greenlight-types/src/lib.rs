pub mod config;
pub mod validator;

pub use validator::{ValidationErrors, Validator};
