//! # Serial Transport
//!
//! Printers on RS-232 or USB-serial adapters (`/dev/ttyUSB0`, `/dev/ttyS0`).
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary data passes unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL off
//! - **No software flow control**: IXON, IXOFF, IXANY off (0x11 and 0x13 appear in raster data)
//! - **No output processing**: OPOST off
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN off
//! - **Framing**: data bits, parity and stop bits from the descriptor
//! - **Reads**: VMIN = 0, VTIME = timeout in deciseconds, so a silent
//!   printer yields an empty read instead of blocking forever
//!
//! ## Exclusive Access
//!
//! An advisory `flock` is taken on open. A second daemon (or any other
//! cooperating process) holding the device makes the open fail with
//! `DeviceUnavailable` instead of interleaving two jobs on one wire.
//!
//! ## Chunked Writes
//!
//! Large writes are split into 4096-byte chunks with a short pause between
//! them so slow printers with small receive buffers keep up.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::error::{ConnectionError, TransportError};
use crate::printer::PrinterStatus;

use super::{Parity, SerialSpec, Transport, seconds};

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// An open serial device.
#[derive(Debug)]
pub struct SerialTransport {
    file: File,
    path: String,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl SerialTransport {
    /// Open and configure the device named by `spec.port`.
    #[instrument(skip_all, fields(port = %spec.port, baud = spec.baudrate))]
    pub fn open(spec: &SerialSpec) -> Result<Self, ConnectionError> {
        let path = spec.port.clone();
        let timeout = seconds(spec.timeout, "timeout")?;
        let settings = LineSettings::from_spec(spec, timeout)?;

        // O_NONBLOCK so the open does not wait for carrier detect.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| unavailable(&path, e))?;
        let fd = file.as_raw_fd();

        // SAFETY: fd is a valid descriptor owned by `file`.
        if unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) } != 0 {
            let err = io::Error::last_os_error();
            let reason = if err.kind() == io::ErrorKind::WouldBlock {
                "device is held by another process".to_string()
            } else {
                err.to_string()
            };
            return Err(ConnectionError::DeviceUnavailable { path, reason });
        }

        configure_tty(fd, &settings).map_err(|e| unavailable(&path, e))?;
        clear_nonblocking(fd).map_err(|e| unavailable(&path, e))?;

        info!("serial device opened");
        Ok(Self {
            file,
            path,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }
}

fn unavailable(path: &str, err: io::Error) -> ConnectionError {
    ConnectionError::DeviceUnavailable {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

impl Transport for SerialTransport {
    fn describe(&self) -> String {
        format!("serial://{}", self.path)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if data.len() <= self.chunk_size {
            self.file.write_all(data).map_err(TransportError::Write)?;
        } else {
            for chunk in data.chunks(self.chunk_size) {
                self.file.write_all(chunk).map_err(TransportError::Write)?;
                if !self.chunk_delay.is_zero() {
                    thread::sleep(self.chunk_delay);
                }
            }
        }
        self.file.flush().map_err(TransportError::Write)
    }

    fn read_status(&mut self) -> Result<PrinterStatus, TransportError> {
        PrinterStatus::query(&mut self.file)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // Wait until the kernel has shifted everything out of the UART.
        // SAFETY: fd is a valid descriptor owned by `self.file`.
        if unsafe { libc::tcdrain(self.file.as_raw_fd()) } != 0 {
            return Err(TransportError::Write(io::Error::last_os_error()));
        }
        debug!("serial output drained");
        Ok(())
    }
}

// ============================================================================
// LINE SETTINGS
// ============================================================================

/// Validated termios parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineSettings {
    speed: libc::speed_t,
    char_size: libc::tcflag_t,
    parity: Parity,
    two_stop_bits: bool,
    /// VTIME, in deciseconds.
    read_timeout: u8,
}

impl LineSettings {
    fn from_spec(spec: &SerialSpec, timeout: Duration) -> Result<Self, ConnectionError> {
        let speed = match spec.baudrate {
            1200 => libc::B1200,
            2400 => libc::B2400,
            4800 => libc::B4800,
            9600 => libc::B9600,
            19200 => libc::B19200,
            38400 => libc::B38400,
            57600 => libc::B57600,
            115200 => libc::B115200,
            230400 => libc::B230400,
            other => {
                return Err(ConnectionError::InvalidConfig(format!(
                    "unsupported baud rate {other}"
                )));
            }
        };
        let char_size = match spec.bytesize {
            5 => libc::CS5,
            6 => libc::CS6,
            7 => libc::CS7,
            8 => libc::CS8,
            other => {
                return Err(ConnectionError::InvalidConfig(format!(
                    "bytesize must be 5-8, got {other}"
                )));
            }
        };
        let two_stop_bits = match spec.stopbits {
            1 => false,
            2 => true,
            other => {
                return Err(ConnectionError::InvalidConfig(format!(
                    "stopbits must be 1 or 2, got {other}"
                )));
            }
        };
        let read_timeout = (timeout.as_millis() / 100).clamp(1, u8::MAX as u128) as u8;

        Ok(Self {
            speed,
            char_size,
            parity: spec.parity,
            two_stop_bits,
            read_timeout,
        })
    }
}

/// Put the TTY in raw mode with the requested framing.
fn configure_tty(fd: i32, settings: &LineSettings) -> io::Result<()> {
    let mut termios = MaybeUninit::uninit();
    // SAFETY: tcgetattr fully initializes the struct on success.
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::PARODD | libc::CSTOPB);
    termios.c_cflag |= settings.char_size | libc::CLOCAL | libc::CREAD;
    match settings.parity {
        Parity::None => {}
        Parity::Even => termios.c_cflag |= libc::PARENB,
        Parity::Odd => termios.c_cflag |= libc::PARENB | libc::PARODD,
    }
    if settings.two_stop_bits {
        termios.c_cflag |= libc::CSTOPB;
    }

    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = settings.read_timeout;

    // SAFETY: termios is initialized and fd is valid.
    unsafe {
        if libc::cfsetispeed(&mut termios, settings.speed) != 0
            || libc::cfsetospeed(&mut termios, settings.speed) != 0
        {
            return Err(io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Return the descriptor to blocking mode after open.
fn clear_nonblocking(fd: i32) -> io::Result<()> {
    // SAFETY: fcntl on a valid descriptor.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SerialSpec {
        serde_json::from_str(r#"{"port": "/dev/ttyUSB0"}"#).unwrap()
    }

    #[test]
    fn test_default_line_settings() {
        let settings = LineSettings::from_spec(&spec(), Duration::from_secs(1)).unwrap();
        assert_eq!(settings.speed, libc::B9600);
        assert_eq!(settings.char_size, libc::CS8);
        assert_eq!(settings.parity, Parity::None);
        assert!(!settings.two_stop_bits);
        assert_eq!(settings.read_timeout, 10);
    }

    #[test]
    fn test_read_timeout_clamped() {
        let s = LineSettings::from_spec(&spec(), Duration::from_millis(20)).unwrap();
        assert_eq!(s.read_timeout, 1);
        let s = LineSettings::from_spec(&spec(), Duration::from_secs(60)).unwrap();
        assert_eq!(s.read_timeout, 255);
    }

    #[test]
    fn test_invalid_framing_rejected() {
        let mut s = spec();
        s.baudrate = 12345;
        assert!(LineSettings::from_spec(&s, Duration::from_secs(1)).is_err());

        let mut s = spec();
        s.bytesize = 9;
        assert!(LineSettings::from_spec(&s, Duration::from_secs(1)).is_err());

        let mut s = spec();
        s.stopbits = 3;
        assert!(LineSettings::from_spec(&s, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_missing_device() {
        let mut s = spec();
        s.port = "/dev/definitely-not-a-printer".into();
        let err = SerialTransport::open(&s).unwrap_err();
        assert!(matches!(err, ConnectionError::DeviceUnavailable { .. }));
    }

    #[test]
    fn test_non_tty_rejected() {
        let dir = std::env::temp_dir().join(format!("posprinter-serial-{}", std::process::id()));
        std::fs::write(&dir, b"").unwrap();
        let mut s = spec();
        s.port = dir.to_string_lossy().into_owned();
        let err = SerialTransport::open(&s).unwrap_err();
        std::fs::remove_file(&dir).ok();
        assert!(matches!(err, ConnectionError::DeviceUnavailable { .. }));
    }
}
