pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod giveaway;
pub mod hooks;
pub mod poll;
pub mod sink;

pub use dispatcher::{DispatchConfig, Dispatcher, DispatcherParts};
pub use sink::ReplySink;
