//! Process-wide logger that keeps every record for inspection.
//!
//! Tests in one binary share the logger, so assertions filter by a socket
//! name unique to the test, and tests that count records run `#[serial]`.

use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[derive(Debug, Clone)]
pub struct CapturedRecord {
    pub level: Level,
    pub target: String,
    pub message: String,
}

struct CaptureLogger {
    records: Mutex<Vec<CapturedRecord>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let captured = CapturedRecord {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        };
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(captured);
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

/// Install the capturing logger. Safe to call from every test.
pub fn install() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
}

/// Records at `level` whose message mentions `needle`.
pub fn records_containing(level: Level, needle: &str) -> Vec<CapturedRecord> {
    LOGGER
        .records
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .filter(|record| record.level == level && record.message.contains(needle))
        .cloned()
        .collect()
}
