//! Streaming connection protocol

pub mod command;

pub use command::{Command, CommandSession, MalformedCommand, Outcome};
