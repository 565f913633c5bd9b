pub mod message;

pub use message::{dedupe, dedupe_owned, Cursor, UnifiedMessage};
