//! Per-action handlers. Each one turns a decoded request into exactly one
//! [`Response`]; no error escapes.

use tracing::{info, instrument, warn};

use crate::calibration::{self, Calibration, ImageCalibration, TextCalibration};
use crate::error::PosError;
use crate::job;
use crate::printer::{PrinterStatus, Profile, profile::resolve_profile};
use crate::transport::{ConnectionSpec, Connector};

use super::request::{CalibrationRequest, PrintRequest, Request};
use super::response::Response;

/// Route `request` to its handler.
pub fn dispatch<C: Connector + ?Sized>(
    connector: &C,
    defaults: &Profile,
    request: Request,
) -> Response {
    match request {
        Request::GetPrinters => get_printers(connector),
        Request::CheckStatus(req) => check_status(connector, &req.connection),
        Request::Print(req) => print(connector, defaults, req),
        Request::CalibrateImage(req) => calibrate(connector, defaults, &ImageCalibration, req),
        Request::CalibrateText(req) => calibrate(connector, defaults, &TextCalibration, req),
    }
}

#[instrument(skip_all)]
fn get_printers<C: Connector + ?Sized>(connector: &C) -> Response {
    match connector.printers() {
        Ok(printers) => {
            info!(count = printers.len(), "printers listed");
            Response::with_data(&printers)
        }
        Err(e) => {
            warn!(error = %e, "printer enumeration failed");
            Response::from_error(&PosError::Spooler(e.to_string()))
        }
    }
}

#[instrument(skip_all, fields(conn = spec.kind()))]
fn check_status<C: Connector + ?Sized>(connector: &C, spec: &ConnectionSpec) -> Response {
    let mut conn = match connector.connect(spec) {
        Ok(conn) => conn,
        Err(e) => return Response::from_error(&PosError::from(e)),
    };

    let status = conn.read_status().unwrap_or_else(|e| {
        warn!(error = %e, "status query failed");
        PrinterStatus::io_error(e.to_string())
    });
    if let Err(e) = conn.close() {
        warn!(error = %e, "close failed after status query");
    }

    info!(state = ?status.state, paper_out = status.paper_out, "status read");
    Response::with_data(&status)
}

fn print<C: Connector + ?Sized>(connector: &C, defaults: &Profile, req: PrintRequest) -> Response {
    let profile = match resolve_profile(req.profile.as_ref(), defaults) {
        Ok(profile) => profile,
        Err(e) => return Response::from_error(&PosError::from(e)),
    };

    let result = job::execute(connector, &req.connection, &profile, &req.tasks);
    if result.is_success() {
        Response::with_data(&result)
    } else {
        Response::job_failed(
            result.error_kind,
            result.message.clone(),
            &result,
            result.trace.clone(),
        )
    }
}

fn calibrate<C, K>(
    connector: &C,
    defaults: &Profile,
    calibration: &K,
    req: CalibrationRequest,
) -> Response
where
    C: Connector + ?Sized,
    K: Calibration,
{
    let profile = match resolve_profile(req.profile.as_ref(), defaults) {
        Ok(profile) => profile,
        Err(e) => return Response::from_error(&PosError::from(e)),
    };
    let range = match calibration.range(req.start, req.end, req.step) {
        Ok(range) => range,
        Err(e) => {
            warn!(calibration = calibration.name(), error = %e, "rejected sweep range");
            return Response::from_error(&PosError::from(e));
        }
    };

    let report = calibration::run(connector, &req.connection, &profile, calibration, range);
    if report.is_success() {
        Response::with_data(&report)
    } else {
        Response::job_failed(
            report.error_kind,
            report.message.clone(),
            &report,
            report.trace.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, ErrorKind};
    use crate::transport::{Connection, PrinterInfo, SharedSink, SystemConnector};
    use std::cell::Cell;

    fn request(line: &str) -> Request {
        Request::parse(line).unwrap()
    }

    /// Counts connection attempts and fails every one.
    #[derive(Default)]
    struct Refusing {
        attempts: Cell<usize>,
    }

    impl Connector for Refusing {
        fn connect(&self, spec: &ConnectionSpec) -> Result<Connection, ConnectionError> {
            self.attempts.set(self.attempts.get() + 1);
            Err(ConnectionError::NotFound(spec.kind().into()))
        }

        fn printers(&self) -> Result<Vec<PrinterInfo>, ConnectionError> {
            Err(ConnectionError::SpoolerUnavailable("lpstat missing".into()))
        }
    }

    #[test]
    fn test_range_error_before_connect() {
        let connector = Refusing::default();
        let response = dispatch(
            &connector,
            &Profile::default(),
            request(r#"{"action":"print_calibration_text","connection":{"type":"null"},"start":60,"end":20,"step":2}"#),
        );
        assert_eq!(response.error.as_deref(), Some("Range Error"));
        assert_eq!(connector.attempts.get(), 0);
    }

    #[test]
    fn test_zero_step_rejected() {
        let response = dispatch(
            &SystemConnector::new(),
            &Profile::default(),
            request(r#"{"action":"print_calibration_image","connection":{"type":"null"},"step":0}"#),
        );
        assert_eq!(response.error.as_deref(), Some("Range Error"));
    }

    #[test]
    fn test_invalid_profile_is_validation_error() {
        let connector = Refusing::default();
        let response = dispatch(
            &connector,
            &Profile::default(),
            request(r#"{"action":"print","connection":{"type":"null"},"profile":{"printer_total_chars":0},"tasks":[]}"#),
        );
        assert_eq!(response.error.as_deref(), Some("Validation Error"));
        assert_eq!(connector.attempts.get(), 0);
    }

    #[test]
    fn test_connection_error_response() {
        let response = dispatch(
            &Refusing::default(),
            &Profile::default(),
            request(r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"cut"}]}"#),
        );
        assert_eq!(response.error.as_deref(), Some(ErrorKind::Connection.label()));
        let details = response.details.unwrap();
        assert_eq!(details["per_task_outcomes"], serde_json::json!([]));
    }

    #[test]
    fn test_spooler_failure_is_printer_error() {
        let response = dispatch(&Refusing::default(), &Profile::default(), Request::GetPrinters);
        assert_eq!(response.error.as_deref(), Some("Printer Error"));
    }

    #[test]
    fn test_print_success_carries_result() {
        let sink = SharedSink::default();
        let response = dispatch(
            &SystemConnector::with_null_sink(sink.clone()),
            &Profile::default(),
            request(r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"text","value":"hello"},{"type":"cut"}]}"#),
        );
        assert!(response.is_success());
        let data = response.data.unwrap();
        assert_eq!(data["status"], "success");
        assert_eq!(data["per_task_outcomes"].as_array().unwrap().len(), 2);
        assert!(!sink.lock().unwrap().is_empty());
    }

    #[test]
    fn test_check_status_null() {
        let response = dispatch(
            &SystemConnector::new(),
            &Profile::default(),
            request(r#"{"action":"check_status","connection":{"type":"null"}}"#),
        );
        let data = response.data.unwrap();
        assert_eq!(data["state"], "online");
        assert_eq!(data["ready"], true);
    }
}
