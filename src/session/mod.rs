//! Session subsystem: event loop, UI commands and the line transport

pub mod command;
pub mod room;
pub mod subscription;
pub mod transport;

pub use command::UiCommand;
pub use room::RoomSession;
pub use subscription::{Subscription, SubscriptionSet};
pub use transport::{spawn_stdin_reader, spawn_stdout_writer, InputLine};
