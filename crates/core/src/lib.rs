// GrabGrub Core - Domain Logic, Expiry Clock & Ports
// NO infrastructure dependencies (storage lives behind the KeyValueStore port)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
