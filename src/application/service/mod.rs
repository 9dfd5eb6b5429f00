//! The insult service: orchestrates the document store and metric sinks.

mod core;
mod read;
mod types;
mod write;

#[cfg(test)]
mod tests;

pub use self::core::InsultService;
pub use types::{IdOnly, InsultView, LikeStatus, NewInsult, PageView, UpdateCommand};
