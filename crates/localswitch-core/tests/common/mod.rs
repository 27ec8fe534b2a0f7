// Shared test fixtures: an in-memory device with scripted failures and a
// log recorder.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use localswitch_core::{DeviceError, DeviceHandle, DpValue, StatusBlob};

/// Device that answers from an in-memory report after a fixed latency.
///
/// Failures are scripted per operation: the next `n` calls fail, the rest
/// succeed. Overlapping calls are counted so tests can assert the cache
/// never lets two operations reach the device at once.
pub struct ScriptedDevice {
    address: String,
    id: String,
    latency: Duration,
    report: Mutex<StatusBlob>,
    fetch_failures: AtomicU32,
    write_failures: AtomicU32,
    fetch_calls: AtomicU32,
    write_calls: AtomicU32,
    in_flight: AtomicBool,
    overlaps: AtomicU32,
    writes: Mutex<Vec<(bool, String)>>,
}

impl ScriptedDevice {
    pub fn new(report: StatusBlob) -> Arc<Self> {
        Self::with_latency(report, Duration::from_millis(50))
    }

    pub fn with_latency(report: StatusBlob, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            address: "192.168.0.1".into(),
            id: "12345678912345671234".into(),
            latency,
            report: Mutex::new(report),
            fetch_failures: AtomicU32::new(0),
            write_failures: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            write_calls: AtomicU32::new(0),
            in_flight: AtomicBool::new(false),
            overlaps: AtomicU32::new(0),
            writes: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_next_fetches(&self, n: u32) {
        self.fetch_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_writes(&self, n: u32) {
        self.write_failures.store(n, Ordering::SeqCst);
    }

    pub fn set_report(&self, report: StatusBlob) {
        *self.report.lock().unwrap() = report;
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> u32 {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(bool, String)> {
        self.writes.lock().unwrap().clone()
    }

    fn enter(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DeviceHandle for ScriptedDevice {
    fn address(&self) -> &str {
        &self.address
    }

    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_status(&self) -> Result<StatusBlob, DeviceError> {
        self.enter();
        tokio::time::sleep(self.latency).await;
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let result = if Self::take_failure(&self.fetch_failures) {
            Err(DeviceError::Timeout { timeout_ms: 5000 })
        } else {
            let report = self.report.lock().unwrap().clone();
            Ok(report)
        };
        self.leave();
        result
    }

    async fn write_status(&self, state: bool, switch_index: &str) -> Result<(), DeviceError> {
        self.enter();
        tokio::time::sleep(self.latency).await;
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        let result = if Self::take_failure(&self.write_failures) {
            Err(DeviceError::Protocol {
                message: "unexpected payload".into(),
            })
        } else {
            self.writes
                .lock()
                .unwrap()
                .push((state, switch_index.to_owned()));
            let mut report = self.report.lock().unwrap();
            let mut dps = report.dps().clone();
            dps.insert(switch_index.to_owned(), DpValue::Bool(state));
            *report = StatusBlob::new(dps);
            Ok(())
        };
        self.leave();
        result
    }
}

/// Report of a two-outlet plug with power metering on outlet 1.
pub fn plug_report() -> StatusBlob {
    serde_json::from_value(serde_json::json!({
        "dps": { "1": true, "7": false, "18": 120, "19": 305, "20": 2300 }
    }))
    .unwrap()
}

// ── Log capture ─────────────────────────────────────────────────────

/// A recorded log event with its fields rendered as strings.
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl LoggedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that keeps every event emitted while it is installed.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<LoggedEvent>>>,
}

impl LogCapture {
    /// Install a recorder as the current thread's subscriber.
    ///
    /// Recording stops when the guard is dropped. Tests on the current-thread
    /// runtime see events from spawned tasks too.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        (capture, tracing::subscriber::set_default(subscriber))
    }

    pub fn events(&self) -> Vec<LoggedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn at(&self, level: Level) -> Vec<LoggedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    /// Events of `level` that carry a retry `attempt` field.
    pub fn attempts_at(&self, level: Level) -> Vec<String> {
        self.at(level)
            .iter()
            .filter_map(|e| e.field("attempt").map(str::to_owned))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldRecorder(&mut fields));
        self.events.lock().unwrap().push(LoggedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

struct FieldRecorder<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldRecorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}
