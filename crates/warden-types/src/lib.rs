pub mod error;
pub mod events;
pub mod outbound;
pub mod records;
