//! Line-oriented wire protocol
//!
//! All traffic is one `|`-delimited text line per message:
//!
//! ```text
//! client      -> coordinator   REQUEST|<OPERATION>|<args...>
//! coordinator -> worker        TASK|<taskId>|<OPERATION>|<args...>
//! worker      -> coordinator   RESPONSE|<taskId>|OK|<value>
//!                              RESPONSE|<taskId>|ERROR|<reason>
//! ```
//!
//! The coordinator relays worker response lines to the client verbatim, so
//! a client always receives a `RESPONSE` line whether the result came from
//! a worker or from the coordinator itself.

use crate::common::{Error, Result};
use std::fmt;

/// Balance query operation name.
pub const OP_QUERY_BALANCE: &str = "CONSULTAR_SALDO";
/// Fund transfer operation name.
pub const OP_TRANSFER: &str = "TRANSFERIR_FONDOS";

const REQUEST_MARKER: &str = "REQUEST";
const TASK_MARKER: &str = "TASK";
const RESPONSE_MARKER: &str = "RESPONSE";

/// A client request as received by the coordinator.
///
/// The coordinator validates only the marker and field count; the operation
/// name travels as-is and unknown operations are rejected by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    pub operation: String,
    pub args: Vec<String>,
}

impl ClientRequest {
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('|').collect();
        if fields.len() < 3 || fields[0] != REQUEST_MARKER {
            return Err(Error::MalformedRequest(line.trim().to_string()));
        }
        Ok(Self {
            operation: fields[1].to_string(),
            args: fields[2..].iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn encode(&self) -> String {
        let mut line = format!("{}|{}", REQUEST_MARKER, self.operation);
        for arg in &self.args {
            line.push('|');
            line.push_str(arg);
        }
        line
    }
}

/// A task line dispatched from the coordinator to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine {
    pub task_id: u64,
    pub operation: String,
    pub args: Vec<String>,
}

impl TaskLine {
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('|').collect();
        if fields.len() < 3 || fields[0] != TASK_MARKER {
            return Err(Error::MalformedRequest(line.trim().to_string()));
        }
        let task_id = fields[1]
            .parse()
            .map_err(|_| Error::MalformedRequest(format!("bad task id: {}", fields[1])))?;
        Ok(Self {
            task_id,
            operation: fields[2].to_string(),
            args: fields[3..].iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn encode(&self) -> String {
        let mut line = format!("{}|{}|{}", TASK_MARKER, self.task_id, self.operation);
        for arg in &self.args {
            line.push('|');
            line.push_str(arg);
        }
        line
    }
}

/// The outcome carried by a response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Ok(String),
    Error(String),
}

impl TaskResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskResult::Ok(_))
    }
}

/// A worker (or coordinator-generated) response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    pub task_id: u64,
    pub result: TaskResult,
}

impl ResponseLine {
    pub fn ok(task_id: u64, value: impl fmt::Display) -> Self {
        Self {
            task_id,
            result: TaskResult::Ok(value.to_string()),
        }
    }

    pub fn error(task_id: u64, reason: impl fmt::Display) -> Self {
        Self {
            task_id,
            result: TaskResult::Error(reason.to_string()),
        }
    }

    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('|').collect();
        if fields.len() < 3 || fields[0] != RESPONSE_MARKER {
            return Err(Error::MalformedRequest(line.trim().to_string()));
        }
        let task_id = fields[1]
            .parse()
            .map_err(|_| Error::MalformedRequest(format!("bad task id: {}", fields[1])))?;
        let payload = fields[3..].join("|");
        let result = match fields[2] {
            "OK" => TaskResult::Ok(payload),
            "ERROR" => TaskResult::Error(payload),
            other => {
                return Err(Error::MalformedRequest(format!(
                    "bad result tag: {}",
                    other
                )))
            }
        };
        Ok(Self { task_id, result })
    }

    pub fn encode(&self) -> String {
        match &self.result {
            TaskResult::Ok(value) => format!("{}|{}|OK|{}", RESPONSE_MARKER, self.task_id, value),
            TaskResult::Error(reason) => {
                format!("{}|{}|ERROR|{}", RESPONSE_MARKER, self.task_id, reason)
            }
        }
    }
}
