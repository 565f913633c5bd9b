mod settings;

pub use settings::{ConversationConfig, HttpConfig, LoggingConfig, Settings};
