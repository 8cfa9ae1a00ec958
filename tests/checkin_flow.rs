//! End-to-end tests for the check-in state machine, driven through scripted
//! platform seams: a fake camera that serves pre-rendered QR frames, an
//! in-memory backend that enforces the (student, event) uniqueness
//! constraint, and a host without geolocation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use trueattend_checkin::{
    ApiError, AttendanceApi, AttendanceRequest, AttendanceSubmitter, AuthContext, CaptureDevice,
    CaptureDeviceFactory, CaptureOpenError, CheckinConfig, CheckinController, CheckinError,
    CheckinPhase, CheckinSnapshot, DeviceSignals, EventSummary, FacingMode, FingerprintStore,
    NoLocationProvider, ScanFrame, StaticAuth, TerminalOutcome,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Renders a real QR code into an RGBA frame so the decode path is exercised
/// for real, not stubbed.
fn qr_frame(payload: &str) -> ScanFrame {
    let code = qrcode::QrCode::new(payload.as_bytes()).expect("payload encodes");
    let luma: image::GrayImage = code
        .render::<image::Luma<u8>>()
        .min_dimensions(240, 240)
        .build();
    let rgba = image::DynamicImage::ImageLuma8(luma).to_rgba8();
    ScanFrame::new(rgba.width(), rgba.height(), rgba.into_raw())
}

/// Camera double that serves a scripted sequence of polls (`None` = frame
/// not buffered yet) and records release.
struct ScriptedDevice {
    polls: Mutex<VecDeque<Option<ScanFrame>>>,
    released: AtomicBool,
}

impl ScriptedDevice {
    fn new(polls: Vec<Option<ScanFrame>>) -> Arc<Self> {
        Arc::new(Self {
            polls: Mutex::new(polls.into()),
            released: AtomicBool::new(false),
        })
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

struct DeviceHandle(Arc<ScriptedDevice>);

impl CaptureDevice for DeviceHandle {
    fn poll_frame(&self) -> anyhow::Result<Option<ScanFrame>> {
        if self.0.is_released() {
            return Ok(None);
        }
        Ok(self.0.polls.lock().unwrap().pop_front().flatten())
    }

    fn release(&self) {
        self.0.released.store(true, Ordering::SeqCst);
    }
}

/// Factory handing out scripted devices in order, keeping hold of each so
/// tests can assert on the release flag afterwards.
struct ScriptedFactory {
    scripts: Mutex<VecDeque<Arc<ScriptedDevice>>>,
    opened: Mutex<Vec<Arc<ScriptedDevice>>>,
    fail_with: Option<CaptureOpenError>,
}

impl ScriptedFactory {
    fn serving(devices: Vec<Arc<ScriptedDevice>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(devices.into()),
            opened: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    fn failing(err: CaptureOpenError) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
            fail_with: Some(err),
        })
    }

    fn opened(&self) -> Vec<Arc<ScriptedDevice>> {
        self.opened.lock().unwrap().clone()
    }
}

impl CaptureDeviceFactory for ScriptedFactory {
    fn open(&self, _facing: FacingMode) -> Result<Box<dyn CaptureDevice>, CaptureOpenError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let device = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedDevice::new(Vec::new()));
        self.opened.lock().unwrap().push(Arc::clone(&device));
        Ok(Box::new(DeviceHandle(device)))
    }
}

/// In-memory backend. Enforces the same uniqueness constraint over
/// (student, event) the real backend does, so duplicate handling is tested
/// against the actual contract rather than a canned response.
struct FakeBackend {
    events: HashMap<String, EventSummary>,
    attended: Mutex<HashSet<(String, String)>>,
    submissions: Mutex<Vec<AttendanceRequest>>,
    fetch_delay: Option<Duration>,
    fetch_error: Option<u16>,
}

impl FakeBackend {
    fn with_event(event: EventSummary) -> Arc<Self> {
        let mut events = HashMap::new();
        events.insert(event.id.clone(), event);
        Arc::new(Self {
            events,
            attended: Mutex::new(HashSet::new()),
            submissions: Mutex::new(Vec::new()),
            fetch_delay: None,
            fetch_error: None,
        })
    }

    fn submissions(&self) -> Vec<AttendanceRequest> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttendanceApi for FakeBackend {
    async fn fetch_event(&self, event_id: &str) -> Result<EventSummary, ApiError> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(code) = self.fetch_error {
            return Err(ApiError::Status {
                code,
                message: None,
            });
        }
        self.events.get(event_id).cloned().ok_or(ApiError::Status {
            code: 404,
            message: None,
        })
    }

    async fn submit_attendance(&self, request: &AttendanceRequest) -> Result<(), ApiError> {
        self.submissions.lock().unwrap().push(request.clone());
        let key = (request.student.clone(), request.event.clone());
        if !self.attended.lock().unwrap().insert(key) {
            return Err(ApiError::DuplicateAttendance);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn sample_event() -> EventSummary {
    EventSummary {
        id: "evt-77".into(),
        name: "Linear Algebra Lecture".into(),
        location: Some("Siebel 1404".into()),
        date: Some("2026-02-12T10:00:00".into()),
        checkin_before_minutes: Some(15),
        checkin_after_minutes: Some(15),
    }
}

fn test_signals() -> DeviceSignals {
    DeviceSignals {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
        language: "en-US".into(),
        color_depth: 24,
        screen_width: 1920,
        screen_height: 1080,
    }
}

fn test_config() -> CheckinConfig {
    CheckinConfig {
        sample_period: Duration::from_millis(10),
        geolocation_timeout: Duration::from_millis(100),
        auto_reset_delay: Duration::from_millis(50),
        ..CheckinConfig::default()
    }
}

struct Harness {
    controller: CheckinController,
    rx: watch::Receiver<CheckinSnapshot>,
    _fingerprint_dir: tempfile::TempDir,
}

fn harness(
    backend: Arc<FakeBackend>,
    factory: Arc<ScriptedFactory>,
    auth: Arc<dyn AuthContext>,
) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FingerprintStore::new(dir.path().join("fingerprint.json")).unwrap());
    let submitter = Arc::new(AttendanceSubmitter::new(
        backend,
        Arc::new(NoLocationProvider),
        store,
        Some(test_signals()),
        Duration::from_millis(100),
    ));
    let controller = CheckinController::new(test_config(), auth, factory, submitter);
    let rx = controller.subscribe();
    Harness {
        controller,
        rx,
        _fingerprint_dir: dir,
    }
}

async fn wait_for(
    rx: &mut watch::Receiver<CheckinSnapshot>,
    what: &str,
    pred: impl Fn(&CheckinSnapshot) -> bool,
) -> CheckinSnapshot {
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if pred(&snapshot) {
                return snapshot;
            }
            rx.changed().await.expect("controller dropped");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Decode of an `/attend/` deep-link QR while authenticated walks the flow
/// to `Ready` with the event's display data, releasing the camera on the
/// way (P2).
#[tokio::test]
async fn scan_and_decode_reaches_ready_and_releases_camera() {
    let device = ScriptedDevice::new(vec![
        None, // camera warm-up: unready frames are skipped silently
        None,
        Some(qr_frame("https://app.example/attend/evt-77")),
    ]);
    let factory = ScriptedFactory::serving(vec![Arc::clone(&device)]);
    let backend = FakeBackend::with_event(sample_event());
    let mut h = harness(backend, factory, Arc::new(StaticAuth::signed_in("stu-1")));

    h.controller.start_scan().await.expect("scan starts");

    let ready = wait_for(&mut h.rx, "ready", |s| {
        matches!(s.phase, CheckinPhase::Ready { .. })
    })
    .await;

    let CheckinPhase::Ready { event } = ready.phase else {
        unreachable!()
    };
    assert_eq!(event.name, "Linear Algebra Lecture");
    assert_eq!(event.location.as_deref(), Some("Siebel 1404"));
    assert!(device.is_released(), "camera must be released after decode");
}

/// Camera permission denied: the flow returns to idle with a camera error
/// message and no event reference (Scenario A).
#[tokio::test]
async fn denied_camera_returns_to_idle_with_message() {
    let factory = ScriptedFactory::failing(CaptureOpenError::Denied("user dismissed".into()));
    let backend = FakeBackend::with_event(sample_event());
    let mut h = harness(backend, factory, Arc::new(StaticAuth::signed_in("stu-1")));

    let err = h.controller.start_scan().await.unwrap_err();
    assert!(matches!(err, CheckinError::CaptureDenied(_)));

    let snapshot = wait_for(&mut h.rx, "idle with message", |s| {
        s.phase.is_idle() && s.message.is_some()
    })
    .await;
    assert!(snapshot.message.unwrap().contains("Camera error"));
}

/// Confirming a previously-unseen event records attendance, shows the
/// terminal message, and auto-resets to idle (Scenario C).
#[tokio::test]
async fn confirm_records_attendance_then_auto_resets() {
    let backend = FakeBackend::with_event(sample_event());
    let factory = ScriptedFactory::serving(vec![]);
    let mut h = harness(
        Arc::clone(&backend),
        factory,
        Arc::new(StaticAuth::signed_in("stu-1")),
    );

    h.controller.open_event("evt-77").await.expect("deep link");
    wait_for(&mut h.rx, "ready", |s| {
        matches!(s.phase, CheckinPhase::Ready { .. })
    })
    .await;

    let outcome = h.controller.confirm().await.expect("confirmation runs");
    assert_eq!(outcome, TerminalOutcome::Confirmed);

    let terminal = wait_for(&mut h.rx, "terminal", |s| s.phase.is_terminal()).await;
    assert_eq!(
        terminal.message.as_deref(),
        Some("Attendance successfully recorded!")
    );

    wait_for(&mut h.rx, "auto reset to idle", |s| s.phase.is_idle()).await;

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1, "exactly one wire write per confirm");
    assert_eq!(submissions[0].student, "stu-1");
    assert_eq!(submissions[0].event, "evt-77");
    // Geolocation unavailable on this host: submission proceeds without it
    // (P5), while the cached fingerprint still rides along.
    assert_eq!(submissions[0].location, None);
    assert!(submissions[0].device_id.is_some());
}

/// A second confirmation of the same (student, event) pair trips the
/// backend's uniqueness constraint and surfaces as the benign
/// `AlreadyAttended` outcome, not a failure (Scenario D / P4).
#[tokio::test]
async fn duplicate_confirmation_is_already_attended() {
    let backend = FakeBackend::with_event(sample_event());
    let factory = ScriptedFactory::serving(vec![]);
    let mut h = harness(
        Arc::clone(&backend),
        factory,
        Arc::new(StaticAuth::signed_in("stu-1")),
    );

    h.controller.open_event("evt-77").await.unwrap();
    wait_for(&mut h.rx, "ready", |s| {
        matches!(s.phase, CheckinPhase::Ready { .. })
    })
    .await;
    assert_eq!(
        h.controller.confirm().await.unwrap(),
        TerminalOutcome::Confirmed
    );

    // Re-acquire the event; a stale confirmation click is never retried.
    h.controller.open_event("evt-77").await.unwrap();
    wait_for(&mut h.rx, "ready again", |s| {
        matches!(s.phase, CheckinPhase::Ready { .. })
    })
    .await;

    let outcome = h.controller.confirm().await.expect("duplicate is benign");
    assert_eq!(outcome, TerminalOutcome::AlreadyAttended);

    let terminal = wait_for(&mut h.rx, "terminal", |s| s.phase.is_terminal()).await;
    assert_eq!(
        terminal.message.as_deref(),
        Some("You have already recorded attendance for this event.")
    );
}

/// Restarting a scan fully releases the previous capture before the new one
/// opens, and cancel releases the last (P1).
#[tokio::test]
async fn restart_releases_previous_capture() {
    let first = ScriptedDevice::new(Vec::new());
    let second = ScriptedDevice::new(Vec::new());
    let factory = ScriptedFactory::serving(vec![Arc::clone(&first), Arc::clone(&second)]);
    let backend = FakeBackend::with_event(sample_event());
    let h = harness(backend, Arc::clone(&factory), Arc::new(StaticAuth::signed_in("stu-1")));

    h.controller.start_scan().await.unwrap();
    h.controller.start_scan().await.unwrap();

    let opened = factory.opened();
    assert_eq!(opened.len(), 2);
    assert!(opened[0].is_released(), "previous capture must be released");
    assert!(!opened[1].is_released(), "current capture stays open");

    h.controller.cancel().await;
    assert!(opened[1].is_released(), "cancel releases the camera");
}

/// Manual stop while scanning returns to idle with the camera released and
/// no event reference retained.
#[tokio::test]
async fn user_stop_during_scan_returns_to_idle() {
    let device = ScriptedDevice::new(Vec::new());
    let factory = ScriptedFactory::serving(vec![Arc::clone(&device)]);
    let backend = FakeBackend::with_event(sample_event());
    let mut h = harness(backend, factory, Arc::new(StaticAuth::signed_in("stu-1")));

    h.controller.start_scan().await.unwrap();
    wait_for(&mut h.rx, "scanning", |s| s.phase.is_scanning()).await;

    h.controller.cancel().await;
    let snapshot = wait_for(&mut h.rx, "idle", |s| s.phase.is_idle()).await;
    assert!(device.is_released());
    assert_eq!(snapshot.message, None);
}

/// Event lookup failure surfaces a message and returns to idle so the
/// student can rescan.
#[tokio::test]
async fn lookup_failure_returns_to_idle_with_message() {
    let mut backend = FakeBackend::with_event(sample_event());
    Arc::get_mut(&mut backend).unwrap().fetch_error = Some(500);
    let factory = ScriptedFactory::serving(vec![]);
    let mut h = harness(backend, factory, Arc::new(StaticAuth::signed_in("stu-1")));

    h.controller.open_event("evt-77").await.unwrap();

    let snapshot = wait_for(&mut h.rx, "idle with lookup message", |s| {
        s.phase.is_idle() && s.message.is_some()
    })
    .await;
    assert_eq!(
        snapshot.message.as_deref(),
        Some("Error fetching event details. Please try again.")
    );
}

/// Unauthenticated entry never reaches the scanner: it publishes a sign-in
/// redirect carrying the return target.
#[tokio::test]
async fn unauthenticated_deep_link_redirects_to_sign_in() {
    let backend = FakeBackend::with_event(sample_event());
    let factory = ScriptedFactory::serving(vec![]);
    let mut h = harness(backend, Arc::clone(&factory), Arc::new(StaticAuth::signed_out()));

    let err = h.controller.open_event("evt-9").await.unwrap_err();
    assert_eq!(err, CheckinError::NotAuthenticated);

    let snapshot = wait_for(&mut h.rx, "redirect", |s| s.redirect.is_some()).await;
    assert_eq!(
        snapshot.redirect.as_deref(),
        Some("/student/signin?redirect=/attend/evt-9")
    );
    assert!(snapshot.phase.is_idle());
    assert!(factory.opened().is_empty(), "no camera for redirects");
}

/// A resolution that completes after the user cancelled must not resurrect
/// the flow (stale-completion guard).
#[tokio::test]
async fn stale_resolution_after_cancel_is_discarded() {
    let mut backend = FakeBackend::with_event(sample_event());
    Arc::get_mut(&mut backend).unwrap().fetch_delay = Some(Duration::from_millis(100));
    let factory = ScriptedFactory::serving(vec![]);
    let h = harness(backend, factory, Arc::new(StaticAuth::signed_in("stu-1")));

    let controller = h.controller.clone();
    let deep_link = tokio::spawn(async move { controller.open_event("evt-77").await });

    // Cancel while the lookup is still in flight.
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.controller.cancel().await;
    deep_link.await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    let snapshot = h.controller.snapshot();
    assert!(
        snapshot.phase.is_idle(),
        "late lookup result must not re-enter Ready, got {:?}",
        snapshot.phase
    );
}
