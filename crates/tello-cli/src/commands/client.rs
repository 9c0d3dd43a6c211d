//! External-command renewal client adapter.
//!
//! The browser automation lives in a separate program. This adapter runs
//! the configured command with `observe` or `renew` appended and reads the
//! observed due date from the last line of its stdout:
//!
//! ```text
//! {"due_date": "2025-12-14"}
//! ```

use std::process::Command;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use tello_core::runner::{ClientError, Observation, RenewalClient};

#[derive(Debug, Deserialize)]
struct ClientReply {
    due_date: NaiveDate,
}

/// Renewal client backed by an external command.
#[derive(Debug)]
pub struct CommandClient {
    command: Vec<String>,
}

impl CommandClient {
    /// Build the adapter from the configured `[client] command` line.
    ///
    /// An empty command is accepted here and reported as a launch failure
    /// only when the client is actually invoked, so that skip decisions
    /// never require a configured client.
    #[must_use]
    pub fn new(command: &[String]) -> Self {
        Self {
            command: command.to_vec(),
        }
    }

    fn invoke(&self, action: &str) -> Result<Observation, ClientError> {
        if self.command.is_empty() {
            return Err(ClientError::Launch {
                detail: "no [client] command configured".to_string(),
            });
        }
        debug!(command = ?self.command, action, "invoking renewal client");
        let output = Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg(action)
            .output()
            .map_err(|err| ClientError::Launch {
                detail: format!("{}: {err}", self.command[0]),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(ClientError::Failed {
                detail: if detail.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    detail.to_string()
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| ClientError::Malformed {
                detail: "client produced no output".to_string(),
            })?;
        let reply: ClientReply =
            serde_json::from_str(line.trim()).map_err(|err| ClientError::Malformed {
                detail: format!("expected a due-date JSON line, got {line:?}: {err}"),
            })?;
        Ok(Observation {
            due_date: reply.due_date,
        })
    }
}

impl RenewalClient for CommandClient {
    fn observe(&self) -> Result<Observation, ClientError> {
        self.invoke("observe")
    }

    fn renew(&self) -> Result<Observation, ClientError> {
        self.invoke("renew")
    }
}
