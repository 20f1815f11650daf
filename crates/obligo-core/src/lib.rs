pub mod batch;
pub mod clock;
pub mod config;
pub mod due_date;
pub mod error;
pub mod frequency;
pub mod io;
pub mod materializer;
pub mod paths;
pub mod period;
pub mod registry;
pub mod store;
pub mod types;

pub use error::{ObligoError, Result};
