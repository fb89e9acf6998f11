pub mod cli;
pub mod convert;
pub mod extract;
pub mod schema;
pub mod types;
pub mod utils;
