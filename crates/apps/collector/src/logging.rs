//! Log setup and cycle report rendering
//!
//! Logs go to stderr and are appended to the configured log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{Level, log};
use signals::{CycleOutcome, CycleReport};

/// Writer that duplicates output to stderr and a file
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A broken stderr must not stop file logging
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Initialize the global logger, appending to `log_file`
pub fn init(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(Tee { file })))
        .try_init()
        .context("Failed to initialize logger")?;

    Ok(())
}

/// Render a finished cycle to the log
pub fn log_report(report: &CycleReport) {
    for (level, message) in report_lines(report) {
        log!(level, "{}", message);
    }
}

/// Log lines for a finished cycle: one warning per rejected line, then the
/// outcome, then a debug summary
fn report_lines(report: &CycleReport) -> Vec<(Level, String)> {
    let mut lines: Vec<(Level, String)> = report
        .rejected
        .iter()
        .map(|rejected| {
            (
                Level::Warn,
                format!(
                    "Skipping malformed line {}: {:?} - {}",
                    rejected.line_number, rejected.line, rejected.error
                ),
            )
        })
        .collect();

    lines.push(match &report.outcome {
        CycleOutcome::Uploaded { rows, watermark } => (
            Level::Info,
            format!(
                "Upload successful: {} new rows, last synced timestamp is now {}",
                rows, watermark
            ),
        ),
        CycleOutcome::NoNewData => (Level::Info, "No new data found.".to_string()),
        CycleOutcome::Failed(err) => (Level::Error, err.to_string()),
    });

    lines.push((
        Level::Debug,
        format!(
            "Cycle finished in {}ms ({} lines, {} rejected, started from {})",
            report.duration_ms,
            report.lines_seen,
            report.rejected.len(),
            report
                .previous_watermark
                .map(|w| w.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ),
    ));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use signals::{RejectedLine, RowError, Watermark};

    fn report(outcome: CycleOutcome, rejected: Vec<RejectedLine>) -> CycleReport {
        CycleReport {
            outcome,
            started_at: chrono::Utc::now(),
            previous_watermark: Watermark::new(100.0),
            lines_seen: 5,
            rejected,
            duration_ms: 12,
        }
    }

    fn rejected(line_number: usize, line: &str, error: RowError) -> RejectedLine {
        RejectedLine {
            line_number,
            line: line.to_string(),
            error,
        }
    }

    fn warnings(lines: &[(Level, String)]) -> Vec<&str> {
        lines
            .iter()
            .filter(|(level, _)| *level == Level::Warn)
            .map(|(_, msg)| msg.as_str())
            .collect()
    }

    #[test]
    fn test_one_warning_per_rejected_line() {
        let report = report(
            CycleOutcome::Uploaded {
                rows: 2,
                watermark: Watermark::new(130.0).unwrap(),
            },
            vec![
                rejected(4, "120,abc", RowError::BadCount),
                rejected(6, "oops", RowError::TooFewFields),
            ],
        );

        let lines = report_lines(&report);
        let warned = warnings(&lines);
        assert_eq!(warned.len(), 2);
        assert!(warned[0].starts_with("Skipping malformed line 4: \"120,abc\""));
        assert!(warned[1].starts_with("Skipping malformed line 6: \"oops\""));

        assert!(lines.contains(&(
            Level::Info,
            "Upload successful: 2 new rows, last synced timestamp is now 130".to_string()
        )));
    }

    #[test]
    fn test_clean_cycle_has_no_warnings() {
        let lines = report_lines(&report(CycleOutcome::NoNewData, Vec::new()));

        assert!(warnings(&lines).is_empty());
        assert_eq!(lines[0], (Level::Info, "No new data found.".to_string()));
        assert_eq!(lines.last().unwrap().0, Level::Debug);
    }

    #[test]
    fn test_tee_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.log");
        std::fs::write(&path, "earlier line\n").unwrap();

        let file = OpenOptions::new().append(true).open(&path).unwrap();
        let mut tee = Tee { file };
        tee.write_all(b"new line\n").unwrap();
        tee.flush().unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier line\nnew line\n"
        );
    }
}
