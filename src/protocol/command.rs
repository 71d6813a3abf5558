//! Text command protocol spoken over a streaming connection
//!
//! One command per message, tokens separated by whitespace:
//!
//! | Command | Reply to sender | Side effect |
//! |---|---|---|
//! | `set <key> [value...]` | none | broadcasts `UPDATE: <key>: <value>` to the endpoint |
//! | `get <key>` | raw value, empty text if absent | - |
//! | `del <key>` | `Deleted <key>` | - |
//! | `ping` | `pong` | - |
//! | `exit` | `BYE` | connection closes |
//! | anything else | `Unknown command: <cmd>` | - |
//!
//! Commands with missing arguments are logged and ignored. A persistence
//! failure drops the reply but leaves the connection open.

use crate::error::TablecastError;
use crate::pubsub::SubscriptionHub;
use crate::storage::{TableId, TableStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Reply sent for `ping`
pub const PONG: &str = "pong";

/// Reply sent for `exit` before the connection closes
pub const BYE: &str = "BYE";

/// Prefix of the identity announcement sent on connect
pub const TENANT_PREFIX: &str = "TENANT: ";

/// Broadcast payload for a committed `set`
pub fn update_message(key: &str, value: &str) -> String {
    format!("UPDATE: {}: {}", key, value)
}

/// Reply for a `del`
pub fn deleted_message(key: &str) -> String {
    format!("Deleted {}", key)
}

/// A parsed protocol command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: String, value: String },
    Get { key: String },
    Del { key: String },
    Ping,
    Exit,
    Unknown(String),
}

/// Input that does not form a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedCommand {
    #[error("empty command")]
    Empty,

    #[error("'{command}' requires a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
}

impl Command {
    /// Parse one text message.
    ///
    /// The `set` value is every token after the key rejoined with single
    /// spaces, so runs of whitespace inside a value collapse.
    pub fn parse(text: &str) -> Result<Self, MalformedCommand> {
        let mut tokens = text.split_whitespace();
        let name = tokens.next().ok_or(MalformedCommand::Empty)?;

        let command = match name {
            "set" => {
                let key = required_key(tokens.next(), "set")?;
                let value = tokens.collect::<Vec<_>>().join(" ");
                Command::Set { key, value }
            }
            "get" => Command::Get {
                key: required_key(tokens.next(), "get")?,
            },
            "del" => Command::Del {
                key: required_key(tokens.next(), "del")?,
            },
            "ping" => Command::Ping,
            "exit" => Command::Exit,
            other => Command::Unknown(other.to_string()),
        };
        Ok(command)
    }

    /// Command name for logging
    pub fn name(&self) -> &str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Del { .. } => "del",
            Command::Ping => "ping",
            Command::Exit => "exit",
            Command::Unknown(name) => name.as_str(),
        }
    }
}

fn required_key(token: Option<&str>, command: &'static str) -> Result<String, MalformedCommand> {
    token
        .map(str::to_string)
        .ok_or(MalformedCommand::MissingArgument {
            command,
            argument: "key",
        })
}

/// What the connection should do after a message was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to send back
    Silent,
    /// Send this text to the sender only
    Reply(String),
    /// Send this text, then close the connection
    Close(String),
}

/// Per-connection command handler bound to one table
#[derive(Debug, Clone)]
pub struct CommandSession {
    table: TableId,
    endpoint: String,
    store: Arc<TableStore>,
    hub: Arc<SubscriptionHub>,
}

impl CommandSession {
    pub fn new(table: TableId, store: Arc<TableStore>, hub: Arc<SubscriptionHub>) -> Self {
        let endpoint = table.endpoint();
        Self {
            table,
            endpoint,
            store,
            hub,
        }
    }

    pub fn table(&self) -> &TableId {
        &self.table
    }

    /// Endpoint this session broadcasts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Identity announcement sent once on connect
    pub fn announcement(&self) -> String {
        format!("{}{}", TENANT_PREFIX, self.table.tenant())
    }

    /// Handle one inbound text message
    pub async fn handle_text(&self, text: &str) -> Outcome {
        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Ignoring malformed command");
                return Outcome::Silent;
            }
        };
        debug!(endpoint = %self.endpoint, command = command.name(), "Handling command");

        match self.execute(command).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(endpoint = %self.endpoint, error = %e, "Command failed");
                Outcome::Silent
            }
        }
    }

    async fn execute(&self, command: Command) -> Result<Outcome, TablecastError> {
        let outcome = match command {
            Command::Set { key, value } => {
                let message = update_message(&key, &value);
                let hub = self.hub.clone();
                let endpoint = self.endpoint.clone();
                self.store
                    .set_key_then(&self.table, &key, &value, move || {
                        hub.broadcast(&endpoint, &message);
                    })
                    .await?;
                Outcome::Silent
            }
            Command::Get { key } => {
                let value = self.store.get_key(&self.table, &key).await?;
                Outcome::Reply(value.unwrap_or_default())
            }
            Command::Del { key } => {
                self.store.delete_key(&self.table, &key).await?;
                Outcome::Reply(deleted_message(&key))
            }
            Command::Ping => Outcome::Reply(PONG.to_string()),
            Command::Exit => Outcome::Close(BYE.to_string()),
            Command::Unknown(name) => Outcome::Reply(format!("Unknown command: {}", name)),
        };
        Ok(outcome)
    }
}
