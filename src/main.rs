//! # posprinter daemon
//!
//! Reads JSON requests from stdin, one per line, and answers each with one
//! JSON line on stdout. Diagnostics go to stderr, which the caller must keep
//! draining.
//!
//! ## Usage
//!
//! ```bash
//! # Default profile, warnings only
//! posprinter
//!
//! # 58 mm printer, verbose JSON diagnostics
//! posprinter --default-total-chars 32 --default-image-width-px 384 \
//!     --log-level posprinter=debug --log-format json
//!
//! # One-shot
//! echo '{"action":"get_printers"}' | posprinter
//! ```

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use posprinter::{
    Daemon,
    printer::{
        Profile,
        profile::{
            DEFAULT_ENCODING, DEFAULT_IMAGE_WIDTH_PX, DEFAULT_PAPER_WIDTH_CHARS,
            DEFAULT_TOTAL_CHARS,
        },
    },
    telemetry::{self, LogFormat},
};

/// Line-delimited JSON print daemon for ESC/POS receipt printers
#[derive(Parser, Debug)]
#[command(name = "posprinter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Diagnostic filter (EnvFilter syntax)
    #[arg(long, env = "POSPRINTER_LOG", default_value = "warn")]
    log_level: String,

    /// Diagnostic line format
    #[arg(long, value_enum, env = "POSPRINTER_LOG_FORMAT", default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Characters per printed line when a request has no profile (20-100)
    #[arg(long, env = "POSPRINTER_TOTAL_CHARS", default_value_t = DEFAULT_TOTAL_CHARS)]
    default_total_chars: usize,

    /// Wrap width in characters when a request has no profile (10-100)
    #[arg(long, env = "POSPRINTER_PAPER_WIDTH_CHARS", default_value_t = DEFAULT_PAPER_WIDTH_CHARS)]
    default_paper_width_chars: usize,

    /// Image width in dots when a request has no profile (100-3000)
    #[arg(long, env = "POSPRINTER_IMAGE_WIDTH_PX", default_value_t = DEFAULT_IMAGE_WIDTH_PX)]
    default_image_width_px: u32,

    /// Text encoding when a request has no profile
    #[arg(long, env = "POSPRINTER_ENCODING", default_value = DEFAULT_ENCODING)]
    default_encoding: String,
}

impl Cli {
    fn profile(&self) -> Profile {
        Profile {
            total_chars: self.default_total_chars,
            paper_width_chars: self.default_paper_width_chars,
            image_width_px: self.default_image_width_px,
            encoding: self.default_encoding.clone(),
            codepage_id: None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = telemetry::initialise(&cli.log_level, cli.log_format) {
        eprintln!("Error: {e}");
        return ExitCode::from(2);
    }
    telemetry::install_panic_hook();

    let defaults = cli.profile();
    if let Err(e) = defaults.validate() {
        error!(error = %e, "invalid default profile");
        return ExitCode::from(2);
    }

    info!(
        total_chars = defaults.total_chars,
        image_width_px = defaults.image_width_px,
        encoding = %defaults.encoding,
        "printer daemon ready"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    match Daemon::new(defaults).run(stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "control output failed");
            ExitCode::FAILURE
        }
    }
}
