#![doc = "The `tasksphere` library crate."]
#![doc = ""]
#![doc = "Domain models, the identity core (credential hashing, token issuance, registration"]
#![doc = "and authentication), the project and task stores, the request gate, HTTP routes and"]
#![doc = "error handling. The binary (`main.rs`) wires these together from `Config`."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;

pub use crate::error::AppError;
pub use crate::state::AppState;
