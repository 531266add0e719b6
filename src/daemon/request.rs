//! Request decoding.
//!
//! A line is decoded in two steps so the three ways a request can be wrong
//! stay distinguishable:
//!
//! 1. parse as JSON (`Invalid JSON`)
//! 2. read the `action` string and pick a request type (`Unknown Action`)
//! 3. decode the typed fields (`Validation Error`, with the serde message)

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::printer::ProfileSpec;
use crate::task::Task;
use crate::transport::ConnectionSpec;

/// A decoded control request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    GetPrinters,
    CheckStatus(StatusRequest),
    Print(PrintRequest),
    CalibrateImage(CalibrationRequest),
    CalibrateText(CalibrationRequest),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusRequest {
    pub connection: ConnectionSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrintRequest {
    pub connection: ConnectionSpec,
    #[serde(default)]
    pub profile: Option<ProfileSpec>,
    pub tasks: Vec<Task>,
}

/// Sweep bounds; missing values fall back to the driver's defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalibrationRequest {
    pub connection: ConnectionSpec,
    #[serde(default)]
    pub profile: Option<ProfileSpec>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
    #[serde(default)]
    pub step: Option<i64>,
}

impl Request {
    /// Decode one request line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(line).map_err(ProtocolError::InvalidJson)?;
        let action = match value.get("action") {
            None | Some(Value::Null) => return Err(ProtocolError::MissingAction),
            Some(Value::String(action)) => action.clone(),
            Some(other) => return Err(ProtocolError::UnknownAction(other.to_string())),
        };

        match action.as_str() {
            "get_printers" => Ok(Request::GetPrinters),
            "check_status" => typed(value).map(Request::CheckStatus),
            "print" => typed(value).map(Request::Print),
            "print_calibration_image" => typed(value).map(Request::CalibrateImage),
            "print_calibration_text" => typed(value).map(Request::CalibrateText),
            _ => Err(ProtocolError::UnknownAction(action)),
        }
    }

    /// The wire action name.
    pub fn action(&self) -> &'static str {
        match self {
            Request::GetPrinters => "get_printers",
            Request::CheckStatus(_) => "check_status",
            Request::Print(_) => "print",
            Request::CalibrateImage(_) => "print_calibration_image",
            Request::CalibrateText(_) => "print_calibration_text",
        }
    }
}

fn typed<T: DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|e| ProtocolError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, PosError};

    fn kind(line: &str) -> ErrorKind {
        PosError::from(Request::parse(line).unwrap_err()).kind()
    }

    #[test]
    fn test_parse_print() {
        let req = Request::parse(
            r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"cut"}]}"#,
        )
        .unwrap();
        let Request::Print(print) = req else {
            panic!("expected print request");
        };
        assert_eq!(print.connection, ConnectionSpec::Null);
        assert_eq!(print.tasks, vec![Task::Cut]);
        assert!(print.profile.is_none());
    }

    #[test]
    fn test_parse_calibration_defaults_missing() {
        let req = Request::parse(
            r#"{"action":"print_calibration_text","connection":{"type":"dummy"},"start":30}"#,
        )
        .unwrap();
        let Request::CalibrateText(cal) = req else {
            panic!("expected text calibration");
        };
        assert_eq!(cal.start, Some(30));
        assert_eq!(cal.end, None);
        assert_eq!(cal.step, None);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(kind("{not json"), ErrorKind::InvalidJson);
        assert_eq!(kind(r#"{"action":"dance"}"#), ErrorKind::UnknownAction);
        assert_eq!(kind(r#"{"action":5}"#), ErrorKind::UnknownAction);
        assert_eq!(kind(r#"{"action":["print"]}"#), ErrorKind::UnknownAction);
        assert_eq!(kind(r#"{"action":null}"#), ErrorKind::Validation);
        assert_eq!(kind(r#"{"tasks":[]}"#), ErrorKind::Validation);
        assert_eq!(kind("[1,2,3]"), ErrorKind::Validation);
        assert_eq!(kind(r#"{"action":"print","tasks":[]}"#), ErrorKind::Validation);
        assert_eq!(
            kind(r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"sparkle"}]}"#),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = Request::parse(r#"{"action":"check_status"}"#).unwrap_err();
        assert!(err.to_string().contains("connection"));
    }
}
