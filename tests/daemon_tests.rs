//! # Daemon Tests
//!
//! Drive the protocol loop over in-memory streams, the way a host process
//! would over pipes, and check the control stream framing together with the
//! bytes that reach the printer.
//!
//! Every test uses the null transport, so no hardware or spooler is needed.

use posprinter::Daemon;
use posprinter::daemon::Response;
use posprinter::error::ConnectionError;
use posprinter::printer::Profile;
use posprinter::transport::{
    Connection, ConnectionSpec, Connector, PrinterInfo, SharedSink, SystemConnector,
};
use pretty_assertions::assert_eq;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Run the loop over `input` and return the parsed response lines and the
/// bytes written to null connections.
fn run(input: &str) -> (Vec<Response>, Vec<u8>) {
    let sink = SharedSink::default();
    let connector = SystemConnector::with_null_sink(sink.clone());
    let responses = run_with(connector, input);
    let bytes = sink.lock().unwrap().clone();
    (responses, bytes)
}

fn run_with<C: Connector>(connector: C, input: &str) -> Vec<Response> {
    let mut daemon = Daemon::with_connector(connector, Profile::default());
    let mut output = Vec::new();
    daemon.run(input.as_bytes(), &mut output).unwrap();

    let text = String::from_utf8(output).unwrap();
    assert!(text.is_empty() || text.ends_with('\n'));
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// A connector that reports a fixed queue list and refuses connections.
struct FixedQueues;

impl Connector for FixedQueues {
    fn connect(&self, spec: &ConnectionSpec) -> Result<Connection, ConnectionError> {
        Err(ConnectionError::NotFound(spec.kind().into()))
    }

    fn printers(&self) -> Result<Vec<PrinterInfo>, ConnectionError> {
        Ok(vec![PrinterInfo {
            name: "POS-58".into(),
            port: "usb://Unknown/Printer".into(),
            driver: "Generic Text-Only".into(),
        }])
    }
}

// ============================================================================
// FRAMING
// ============================================================================

#[test]
fn test_one_response_per_request_in_order() {
    let input = concat!(
        r#"{"action":"check_status","connection":{"type":"null"}}"#, "\n",
        "not json\n",
        "\n",
        r#"{"action":"dance"}"#, "\n",
        r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"cut"}]}"#, "\n",
    );
    let (responses, _) = run(input);

    let errors: Vec<Option<&str>> = responses.iter().map(|r| r.error.as_deref()).collect();
    assert_eq!(
        errors,
        vec![None, Some("Invalid JSON"), Some("Unknown Action"), None]
    );
}

#[test]
fn test_last_line_without_newline_is_served() {
    let (responses, _) = run(r#"{"action":"check_status","connection":{"type":"null"}}"#);
    assert_eq!(responses.len(), 1);
    assert!(responses[0].is_success());
}

#[test]
fn test_empty_input_shuts_down_cleanly() {
    let (responses, bytes) = run("");
    assert!(responses.is_empty());
    assert!(bytes.is_empty());
}

#[test]
fn test_invalid_json_never_touches_transport() {
    let (responses, bytes) = run("{\"action\": \"print\", \n");
    assert_eq!(responses[0].error.as_deref(), Some("Invalid JSON"));
    assert!(bytes.is_empty());
}

#[test]
fn test_oversized_profile_rejected_and_loop_continues() {
    let input = concat!(
        r#"{"action":"print","connection":{"type":"null"},"profile":{"image_width_px":60000},"tasks":[{"type":"cut"}]}"#, "\n",
        r#"{"action":"print","connection":{"type":"null"},"profile":{"printer_total_chars":100000000000},"tasks":[{"type":"text","value":"x"}]}"#, "\n",
        r#"{"action":"print_calibration_image","connection":{"type":"null"},"start":450,"end":60000,"step":10}"#, "\n",
        r#"{"action":"dance"}"#, "\n",
    );
    let (responses, bytes) = run(input);

    let errors: Vec<Option<&str>> = responses.iter().map(|r| r.error.as_deref()).collect();
    assert_eq!(
        errors,
        vec![
            Some("Validation Error"),
            Some("Validation Error"),
            Some("Range Error"),
            Some("Unknown Action"),
        ]
    );
    assert!(bytes.is_empty());
}

// ============================================================================
// ACTIONS
// ============================================================================

#[test]
fn test_check_status_null_online() {
    let (responses, _) = run("{\"action\":\"check_status\",\"connection\":{\"type\":\"dummy\"}}\n");
    let data = responses[0].data.as_ref().unwrap();
    assert_eq!(data["state"], "online");
    assert_eq!(data["online"], true);
    assert_eq!(data["paper_out"], false);
}

#[test]
fn test_get_printers() {
    let responses = run_with(FixedQueues, "{\"action\":\"get_printers\"}\n");
    assert_eq!(
        responses[0].data,
        Some(serde_json::json!([
            {"name": "POS-58", "port": "usb://Unknown/Printer", "driver": "Generic Text-Only"}
        ]))
    );
}

#[test]
fn test_print_bytes() {
    let request = r#"{"action":"print","connection":{"type":"null"},"profile":{"printer_total_chars":20,"paper_width_chars":20},"tasks":[{"type":"text","value":"ab","align":"right"},{"type":"feed","lines":2},{"type":"cut"}]}"#;
    let (responses, bytes) = run(&format!("{request}\n"));

    assert!(responses[0].is_success());
    let mut expected = vec![0x1B, 0x40, 0x1B, 0x74, 73];
    expected.extend_from_slice(format!("{:>20}\n", "ab").as_bytes());
    expected.extend_from_slice(&[0x1B, 0x64, 2]);
    expected.extend_from_slice(&[0x0A, 0x0A, 0x0A, 0x1D, 0x56, 0x01]);
    assert_eq!(bytes, expected);
}

#[test]
fn test_fail_fast_skips_cut() {
    let request = r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"text","value":"kept"},{"type":"raw","hex_data":"zz"},{"type":"cut"}]}"#;
    let (responses, bytes) = run(&format!("{request}\n"));

    let response = &responses[0];
    assert_eq!(response.error.as_deref(), Some("Render Error"));
    let outcomes = response.details.as_ref().unwrap()["per_task_outcomes"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["outcome"], "printed");
    assert_eq!(outcomes[1]["outcome"], "failed");

    assert!(contains(&bytes, b"kept"));
    assert!(!contains(&bytes, &[0x1D, 0x56]));
}

#[test]
fn test_table_column_mismatch() {
    let request = r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"table","data":[["a","b","c"]],"columns_ratio":[0.5,0.5]}]}"#;
    let (responses, _) = run(&format!("{request}\n"));
    assert_eq!(responses[0].error.as_deref(), Some("Render Error"));
}

#[test]
fn test_raw_passthrough() {
    let request = r#"{"action":"print","connection":{"type":"null"},"tasks":[{"type":"raw","hex_data":"1b 70 00 19 fa"}]}"#;
    let (_, bytes) = run(&format!("{request}\n"));
    assert!(bytes.ends_with(&[0x1B, 0x70, 0x00, 0x19, 0xFA]));
}

// ============================================================================
// CALIBRATION
// ============================================================================

#[test]
fn test_image_calibration_count() {
    let request = r#"{"action":"print_calibration_image","connection":{"type":"null"},"start":450,"end":500,"step":10}"#;
    let (responses, bytes) = run(&format!("{request}\n"));

    let data = responses[0].data.as_ref().unwrap();
    assert_eq!(data["planned"], 6);
    assert_eq!(data["completed"], 6);
    assert!(contains(&bytes, b"450 px"));
    assert!(contains(&bytes, b"500 px"));
    assert!(!contains(&bytes, b"510 px"));
    assert!(bytes.ends_with(&[0x1D, 0x56, 0x01]));
}

#[test]
fn test_text_calibration_count() {
    let request = r#"{"action":"print_calibration_text","connection":{"type":"null"},"start":30,"end":48,"step":1}"#;
    let (responses, bytes) = run(&format!("{request}\n"));

    let data = responses[0].data.as_ref().unwrap();
    assert_eq!(data["completed"], 19);
    assert!(contains(&bytes, b" 30 "));
    assert!(contains(&bytes, b" 48 "));
}

#[test]
fn test_calibration_range_error_sends_nothing() {
    let request = r#"{"action":"print_calibration_text","connection":{"type":"null"},"start":10,"end":20,"step":-1}"#;
    let (responses, bytes) = run(&format!("{request}\n"));
    assert_eq!(responses[0].error.as_deref(), Some("Range Error"));
    assert!(bytes.is_empty());
}

// ============================================================================
// ENVELOPE
// ============================================================================

#[test]
fn test_response_round_trip() {
    let (responses, _) = run("{\"action\":\"dance\"}\n");
    let line = serde_json::to_string(&responses[0]).unwrap();
    assert_eq!(
        line,
        r#"{"status":"error","error":"Unknown Action","message":"unknown action 'dance'"}"#
    );
}
