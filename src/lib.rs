pub mod errors;
pub mod io_models;
pub mod kubernetes;
pub mod logger;
pub mod models;
mod runtime;
pub mod services;
