// Domain Layer - Pure business logic and entities

pub mod error;
pub mod expiry;
pub mod filter;
pub mod image;
pub mod labels;
pub mod listing;
pub mod user;

// Re-exports
pub use error::{DomainError, FieldErrors};
pub use expiry::{EndDateTime, EndInstant, ExpiryClock, TimeRemaining, Urgency, Zone};
pub use filter::{ListingFilter, TimeFilter};
pub use listing::{Deal, DealDraft, Listing, ListingDraft, ListingId, Post, PostDraft};
pub use user::{AuthSession, User, UserId};
