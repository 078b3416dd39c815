// Application Layer - Use Cases and Business Logic

pub mod auth;
pub mod constants;
pub mod countdown;
pub mod expiry_sweep;
pub mod json_store;
pub mod listing;
pub mod shutdown;
pub mod state;

// Re-exports
pub use auth::AuthService;
pub use countdown::{Countdown, CountdownFrame, CountdownHandle};
pub use expiry_sweep::{ExpirySweeper, SweepStats};
pub use listing::ListingService;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use state::AppState;
