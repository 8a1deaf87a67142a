//! Single fetch → filter → upload → commit cycle

use std::time::Instant;

use super::{CycleOutcome, CycleReport, SyncError};
use crate::device::DeviceSource;
use crate::models::Batch;
use crate::sheets::SheetService;
use crate::storage::StateStore;

/// Runs sync cycles against a device, a sheet and a watermark store
///
/// The engine holds no state between cycles; everything it learns during a
/// cycle is either committed to the state store or returned in the report.
pub struct SyncEngine<'a> {
    sheet_name: &'a str,
    sheets: &'a dyn SheetService,
    device: &'a dyn DeviceSource,
    state: &'a dyn StateStore,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        sheet_name: &'a str,
        sheets: &'a dyn SheetService,
        device: &'a dyn DeviceSource,
        state: &'a dyn StateStore,
    ) -> Self {
        Self {
            sheet_name,
            sheets,
            device,
            state,
        }
    }

    /// Run one cycle
    ///
    /// Never panics on collaborator failures and never returns an error:
    /// failures are reported through [`CycleOutcome::Failed`]. The watermark
    /// is written only after the batch has been appended to the sheet.
    pub fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::started();

        report.outcome = match self.execute(&mut report) {
            Ok(outcome) => outcome,
            Err(e) => CycleOutcome::Failed(e),
        };

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    fn execute(&self, report: &mut CycleReport) -> Result<CycleOutcome, SyncError> {
        // 1. Open the sheet first so a bad connection costs no device traffic
        let worksheet = self
            .sheets
            .open(self.sheet_name)
            .map_err(SyncError::Connect)?;

        // 2. Fetch the device export
        let body = self.device.fetch().map_err(SyncError::Fetch)?;

        // 3. Parse and keep only readings past the watermark
        let watermark = self.state.read().map_err(SyncError::State)?;
        report.previous_watermark = Some(watermark);

        let Batch {
            rows,
            candidate,
            rejected,
            lines_seen,
        } = Batch::collect(&body, watermark);
        report.lines_seen = lines_seen;
        report.rejected = rejected;

        if rows.is_empty() {
            return Ok(CycleOutcome::NoNewData);
        }

        // 4. Upload the whole batch in one append
        worksheet.append_rows(&rows).map_err(SyncError::Upload)?;

        // 5. Commit only after the rows are in the sheet
        self.state.write(candidate).map_err(SyncError::Commit)?;

        Ok(CycleOutcome::Uploaded {
            rows: rows.len(),
            watermark: candidate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Reading, Watermark};
    use crate::parse::RowError;
    use crate::sheets::Worksheet;
    use crate::storage::{InMemoryStateStore, StateError};
    use crate::sync::SyncStage;
    use anyhow::{Result, anyhow};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticDevice {
        body: Mutex<Result<String, String>>,
        calls: AtomicUsize,
    }

    impl StaticDevice {
        fn ok(body: &str) -> Self {
            Self {
                body: Mutex::new(Ok(body.to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                body: Mutex::new(Err(msg.to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        fn set_body(&self, body: &str) {
            *self.body.lock().unwrap() = Ok(body.to_string());
        }
    }

    impl DeviceSource for StaticDevice {
        fn fetch(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.lock().unwrap().clone().map_err(|e| anyhow!(e))
        }
    }

    #[derive(Default)]
    struct RecordingSheets {
        fail_open: bool,
        fail_append: Mutex<bool>,
        appends: Mutex<Vec<Vec<Reading>>>,
    }

    struct RecordingWorksheet<'a>(&'a RecordingSheets);

    impl SheetService for RecordingSheets {
        fn open(&self, sheet_name: &str) -> Result<Box<dyn Worksheet + '_>> {
            if self.fail_open {
                return Err(anyhow!("Spreadsheet not found: {}", sheet_name));
            }
            Ok(Box::new(RecordingWorksheet(self)))
        }
    }

    impl Worksheet for RecordingWorksheet<'_> {
        fn append_rows(&self, rows: &[Reading]) -> Result<()> {
            if *self.0.fail_append.lock().unwrap() {
                return Err(anyhow!("503 Service Unavailable"));
            }
            self.0.appends.lock().unwrap().push(rows.to_vec());
            Ok(())
        }
    }

    impl RecordingSheets {
        fn appends(&self) -> Vec<Vec<Reading>> {
            self.appends.lock().unwrap().clone()
        }
    }

    /// State store whose reads or writes always fail
    struct BrokenStateStore {
        fail_read: bool,
    }

    impl StateStore for BrokenStateStore {
        fn read(&self) -> Result<Watermark, StateError> {
            if self.fail_read {
                return Err(StateError::Read {
                    path: "state.txt".into(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            Ok(Watermark::ZERO)
        }

        fn write(&self, _watermark: Watermark) -> Result<(), StateError> {
            Err(StateError::Write {
                path: "state.txt".into(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    fn wm(ts: f64) -> Watermark {
        Watermark::new(ts).unwrap()
    }

    #[test]
    fn test_cycle_uploads_new_rows_and_commits() {
        let sheets = RecordingSheets::default();
        let device = StaticDevice::ok("90,5\n100,6\n110,7\n120,abc\n130,9\n");
        let state = InMemoryStateStore::with_watermark(wm(100.0));
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        let report = engine.run_cycle();

        assert_eq!(report.rows_uploaded(), 2);
        assert_eq!(
            sheets.appends(),
            vec![vec![Reading::new(110.0, 7), Reading::new(130.0, 9)]]
        );
        assert_eq!(state.read().unwrap(), wm(130.0));
        assert_eq!(report.previous_watermark, Some(wm(100.0)));
        assert_eq!(report.lines_seen, 5);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].error, RowError::BadCount);
    }

    #[test]
    fn test_empty_body_skips_upload() {
        let sheets = RecordingSheets::default();
        let device = StaticDevice::ok("");
        let state = InMemoryStateStore::new();
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        let report = engine.run_cycle();

        assert!(matches!(report.outcome, CycleOutcome::NoNewData));
        assert!(sheets.appends().is_empty());
        assert_eq!(state.read().unwrap(), Watermark::ZERO);
        assert!(state.history().is_empty());
        assert_eq!(report.summary(), "No new data found.");
    }

    #[test]
    fn test_connect_failure_skips_fetch() {
        let sheets = RecordingSheets {
            fail_open: true,
            ..Default::default()
        };
        let device = StaticDevice::ok("110,7\n");
        let state = InMemoryStateStore::new();
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        let report = engine.run_cycle();

        assert_eq!(report.failed_stage(), Some(SyncStage::Connect));
        assert_eq!(device.calls.load(Ordering::SeqCst), 0);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_fetch_failure_leaves_watermark() {
        let sheets = RecordingSheets::default();
        let device = StaticDevice::failing("timed out");
        let state = InMemoryStateStore::with_watermark(wm(50.0));
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        let report = engine.run_cycle();

        assert_eq!(report.failed_stage(), Some(SyncStage::Fetch));
        assert!(sheets.appends().is_empty());
        assert_eq!(state.read().unwrap(), wm(50.0));
    }

    #[test]
    fn test_upload_failure_does_not_commit_and_retry_recovers() {
        let sheets = RecordingSheets::default();
        *sheets.fail_append.lock().unwrap() = true;
        let device = StaticDevice::ok("110,7\n130,9\n");
        let state = InMemoryStateStore::with_watermark(wm(100.0));
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        let failed = engine.run_cycle();
        assert_eq!(failed.failed_stage(), Some(SyncStage::Upload));
        assert_eq!(state.read().unwrap(), wm(100.0));
        assert!(state.history().is_empty());

        // Device has appended one more reading by the time we retry
        *sheets.fail_append.lock().unwrap() = false;
        device.set_body("110,7\n130,9\n140,2\n");

        let retried = engine.run_cycle();
        assert_eq!(retried.rows_uploaded(), 3);
        assert_eq!(
            sheets.appends(),
            vec![vec![
                Reading::new(110.0, 7),
                Reading::new(130.0, 9),
                Reading::new(140.0, 2)
            ]]
        );
        assert_eq!(state.read().unwrap(), wm(140.0));
    }

    #[test]
    fn test_replaying_same_export_uploads_nothing() {
        let sheets = RecordingSheets::default();
        let device = StaticDevice::ok("110,7\n130,9\n");
        let state = InMemoryStateStore::new();
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        assert_eq!(engine.run_cycle().rows_uploaded(), 2);
        let second = engine.run_cycle();

        assert!(matches!(second.outcome, CycleOutcome::NoNewData));
        assert_eq!(sheets.appends().len(), 1);
    }

    #[test]
    fn test_older_data_never_lowers_watermark() {
        let sheets = RecordingSheets::default();
        let device = StaticDevice::ok("500,1\n");
        let state = InMemoryStateStore::new();
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        engine.run_cycle();
        // Device was reset and now reports older timestamps
        device.set_body("10,1\n20,2\n");
        let report = engine.run_cycle();

        assert!(matches!(report.outcome, CycleOutcome::NoNewData));
        assert_eq!(state.read().unwrap(), wm(500.0));
    }

    #[test]
    fn test_state_read_failure_aborts_before_upload() {
        let sheets = RecordingSheets::default();
        let device = StaticDevice::ok("110,7\n");
        let state = BrokenStateStore { fail_read: true };
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        let report = engine.run_cycle();

        assert_eq!(report.failed_stage(), Some(SyncStage::State));
        assert!(report.previous_watermark.is_none());
        assert!(sheets.appends().is_empty());
    }

    #[test]
    fn test_commit_failure_is_reported() {
        let sheets = RecordingSheets::default();
        let device = StaticDevice::ok("110,7\n");
        let state = BrokenStateStore { fail_read: false };
        let engine = SyncEngine::new("Lights", &sheets, &device, &state);

        let report = engine.run_cycle();

        assert_eq!(report.failed_stage(), Some(SyncStage::Commit));
        assert_eq!(sheets.appends().len(), 1);
    }
}
