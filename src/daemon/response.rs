//! Response envelope.
//!
//! ```text
//! {"status":"success","data":...}
//! {"status":"error","error":"Render Error","message":"...","details":...,"traceback":"..."}
//! ```
//!
//! `None` fields are omitted. `traceback` is diagnostic only.

use std::error::Error as _;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, PosError, error_chain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// One control-output line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl Response {
    /// Success without a payload.
    pub fn ok() -> Self {
        Self {
            status: ResponseStatus::Success,
            data: None,
            error: None,
            message: None,
            details: None,
            traceback: None,
        }
    }

    /// Success carrying `data`.
    pub fn with_data<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                data: Some(value),
                ..Self::ok()
            },
            Err(e) => Self::error(ErrorKind::System, format!("cannot serialize response: {e}")),
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            error: Some(kind.label().to_string()),
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    /// Error response for `err`; the cause chain goes to `traceback`.
    pub fn from_error(err: &PosError) -> Self {
        let mut response = Self::error(err.kind(), err.to_string());
        if err.source().is_some() {
            response.traceback = Some(error_chain(err));
        }
        response
    }

    /// Error response for a failed job; `report` goes to `details`.
    pub fn job_failed<T: Serialize>(
        kind: Option<ErrorKind>,
        message: Option<String>,
        report: &T,
        trace: Option<String>,
    ) -> Self {
        let kind = kind.unwrap_or(ErrorKind::System);
        let mut response = Self::error(kind, message.unwrap_or_else(|| kind.label().to_string()));
        response.details = serde_json::to_value(report).ok();
        response.traceback = trace;
        response
    }

    /// A caught panic.
    pub fn system(message: impl Into<String>, traceback: Option<String>) -> Self {
        Self {
            traceback,
            ..Self::error(ErrorKind::System, message)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Write as one compact JSON line and flush.
    pub fn write_line<W: Write>(&self, out: &mut W) -> io::Result<()> {
        serde_json::to_writer(&mut *out, self).map_err(io::Error::from)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}
