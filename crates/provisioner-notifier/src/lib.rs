pub mod channel;
pub mod client;
pub mod error;
pub mod logging;

pub use channel::ChannelNotifier;
pub use client::Notifier;
pub use error::NotifierError;
pub use logging::LoggingNotifier;
