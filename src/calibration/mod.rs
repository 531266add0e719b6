//! # Calibration Drivers
//!
//! Sweeps that help find a printer's real limits by printing one sample per
//! value and letting the operator pick the last good one.
//!
//! | Driver | Varies | Sample | Default range | Allowed values |
//! |--------|--------|--------|---------------|----------------|
//! | [`ImageCalibration`] | `image_width_px` | bar image with a width label | 450..=700 step 10 | 10..=1500 |
//! | [`TextCalibration`] | `printer_total_chars` | `[<<< N >>>]` grid line | 20..=60 step 2 | 10..=200 |
//!
//! ## Sweep Ranges
//!
//! Ranges are inclusive of `end` when the step lands on it:
//!
//! ```text
//! iterations = floor((end - start) / step) + 1
//! 450..500 step 10  →  450 460 470 480 490 500   (6)
//! 30..48 step 1     →  30 31 ... 48              (19)
//! ```
//!
//! Sub-jobs are generated lazily from the range, so a huge sweep costs no
//! memory up front. Everything runs on one connection: header, every
//! sub-job in order, trailer. The first failure stops the sweep.
//!
//! ## Example
//!
//! ```
//! use posprinter::calibration::{Calibration, SweepRange, TextCalibration};
//! use posprinter::printer::Profile;
//!
//! let range = SweepRange::new(30, 48, 1).unwrap();
//! assert_eq!(range.iterations(), 19);
//!
//! let jobs: Vec<_> = TextCalibration.sweep(range, &Profile::default()).collect();
//! assert_eq!(jobs.len(), 19);
//! ```

mod image;
mod text;

pub use image::ImageCalibration;
pub use text::{TextCalibration, grid_line};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{ErrorKind, PosError, RangeError, RenderError, error_chain};
use crate::job::{self, JobResult, JobStatus};
use crate::printer::Profile;
use crate::task::Task;
use crate::transport::{Connection, ConnectionSpec, Connector};

// ============================================================================
// SWEEP RANGE
// ============================================================================

/// A validated arithmetic progression `start, start + step, ...` up to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepRange {
    start: i64,
    end: i64,
    step: i64,
}

impl SweepRange {
    /// Reject a zero step or a step pointing away from `end`.
    pub fn new(start: i64, end: i64, step: i64) -> Result<Self, RangeError> {
        if step == 0 {
            return Err(RangeError::ZeroStep);
        }
        if (step > 0 && start > end) || (step < 0 && start < end) {
            return Err(RangeError::WrongDirection { start, end, step });
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Number of values, `floor((end - start) / step) + 1`.
    pub fn iterations(&self) -> u64 {
        let span = self.end as i128 - self.start as i128;
        (span / self.step as i128) as u64 + 1
    }

    /// The last value actually produced.
    pub fn last(&self) -> i64 {
        let last = self.start as i128 + (self.iterations() as i128 - 1) * self.step as i128;
        last as i64
    }

    /// Require every value to lie in `min..=max`.
    pub fn check_bounds(&self, min: i64, max: i64) -> Result<(), RangeError> {
        let (lo, hi) = if self.step > 0 {
            (self.start, self.last())
        } else {
            (self.last(), self.start)
        };
        if lo < min || hi > max {
            return Err(RangeError::OutOfBounds {
                start: self.start,
                end: self.end,
                min,
                max,
            });
        }
        Ok(())
    }

    /// A fresh iterator over the values. Can be called any number of times.
    pub fn values(&self) -> SweepValues {
        SweepValues {
            next: self.start as i128,
            step: self.step as i128,
            remaining: self.iterations(),
        }
    }
}

/// Lazy iterator over a [`SweepRange`].
#[derive(Debug, Clone)]
pub struct SweepValues {
    next: i128,
    step: i128,
    remaining: u64,
}

impl Iterator for SweepValues {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.next as i64;
        self.next += self.step;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

// ============================================================================
// CALIBRATION TRAIT
// ============================================================================

/// One generated iteration: a profile override and the tasks to print.
#[derive(Debug, Clone, PartialEq)]
pub struct SubJob {
    pub value: i64,
    pub profile: Profile,
    pub tasks: Vec<Task>,
}

/// A calibration sweep definition.
pub trait Calibration {
    /// Name used in logs and reports.
    fn name(&self) -> &'static str;

    /// `(start, end, step)` used when a request omits them.
    fn default_range(&self) -> (i64, i64, i64);

    /// Smallest and largest value a sweep may print.
    fn bounds(&self) -> (i64, i64);

    /// Tasks printed once before the sweep.
    fn header(&self, range: &SweepRange) -> Vec<Task>;

    /// Tasks for one sweep value.
    fn iteration(&self, value: i64, base: &Profile) -> Result<SubJob, RenderError>;

    /// Tasks printed once after the sweep.
    fn trailer(&self) -> Vec<Task> {
        vec![Task::Cut]
    }

    /// Build and bounds-check a range, filling gaps from [`Self::default_range`].
    fn range(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    ) -> Result<SweepRange, RangeError> {
        let (d_start, d_end, d_step) = self.default_range();
        let range = SweepRange::new(
            start.unwrap_or(d_start),
            end.unwrap_or(d_end),
            step.unwrap_or(d_step),
        )?;
        let (min, max) = self.bounds();
        range.check_bounds(min, max)?;
        Ok(range)
    }

    /// Lazily generate the sub-jobs for `range`.
    fn sweep(&self, range: SweepRange, base: &Profile) -> Sweep<'_, Self>
    where
        Self: Sized,
    {
        Sweep {
            calibration: self,
            base: base.clone(),
            values: range.values(),
        }
    }
}

/// Lazy sequence of `(value, sub-job)` pairs.
pub struct Sweep<'a, C: Calibration + ?Sized> {
    calibration: &'a C,
    base: Profile,
    values: SweepValues,
}

impl<C: Calibration + ?Sized> Iterator for Sweep<'_, C> {
    type Item = (i64, Result<SubJob, RenderError>);

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.values.next()?;
        Some((value, self.calibration.iteration(value, &self.base)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// Result of a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub status: JobStatus,
    pub calibration: String,
    pub planned: u64,
    pub completed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The job that failed, with its per-task outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobResult>,
    #[serde(skip)]
    pub trace: Option<String>,
}

impl CalibrationReport {
    fn new(calibration: &str, planned: u64) -> Self {
        Self {
            status: JobStatus::Success,
            calibration: calibration.to_string(),
            planned,
            completed: 0,
            failed_value: None,
            error_kind: None,
            message: None,
            job: None,
            trace: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }

    fn fail(&mut self, err: &PosError, value: Option<i64>) {
        self.status = JobStatus::Error;
        self.failed_value = value;
        self.error_kind = Some(err.kind());
        self.message = Some(err.to_string());
        self.trace = Some(error_chain(err));
    }

    fn fail_job(&mut self, value: Option<i64>, job: JobResult) {
        self.status = JobStatus::Error;
        self.failed_value = value;
        self.error_kind = job.error_kind;
        self.message = job.message.clone();
        self.trace = job.trace.clone();
        self.job = Some(job);
    }
}

/// Print `calibration` over `range` on one connection.
#[instrument(skip_all, fields(calibration = calibration.name(), start = range.start(), end = range.end(), step = range.step()))]
pub fn run<C, K>(
    connector: &C,
    spec: &ConnectionSpec,
    base: &Profile,
    calibration: &K,
    range: SweepRange,
) -> CalibrationReport
where
    C: Connector + ?Sized,
    K: Calibration,
{
    let mut report = CalibrationReport::new(calibration.name(), range.iterations());

    let mut conn = match connector.connect(spec) {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "connection failed, nothing sent");
            report.fail(&PosError::from(e), None);
            return report;
        }
    };

    drive(&mut conn, base, calibration, range, &mut report);

    match conn.close() {
        Ok(()) => {}
        Err(e) if report.is_success() => report.fail(&PosError::from(e), None),
        Err(e) => warn!(error = %e, "close failed after an aborted calibration"),
    }

    if report.is_success() {
        info!(completed = report.completed, "calibration complete");
    }
    report
}

fn drive<K: Calibration>(
    conn: &mut Connection,
    base: &Profile,
    calibration: &K,
    range: SweepRange,
    report: &mut CalibrationReport,
) {
    if let Err(e) = job::write_preamble(conn, base) {
        report.fail(&PosError::from(e), None);
        return;
    }

    let header = job::run_tasks(conn, base, &calibration.header(&range));
    if !header.is_success() {
        report.fail_job(None, header);
        return;
    }

    for (value, sub) in calibration.sweep(range, base) {
        let sub = match sub {
            Ok(sub) => sub,
            Err(e) => {
                warn!(value, error = %e, "sub-job generation failed");
                report.fail(&PosError::from(e), Some(value));
                return;
            }
        };

        let result = job::run_tasks(conn, &sub.profile, &sub.tasks);
        if !result.is_success() {
            warn!(value, "sub-job failed, aborting sweep");
            report.fail_job(Some(value), result);
            return;
        }

        report.completed += 1;
        info!(value, done = report.completed, of = report.planned, "calibration step printed");
    }

    let trailer = job::run_tasks(conn, base, &calibration.trailer());
    if !trailer.is_success() {
        report.fail_job(None, trailer);
    }
}

// ============================================================================
// TESTS
// ============================================================================
