use std::sync::Arc;

use log::{info, warn};
use tokio::sync::{oneshot, watch, Mutex};

use super::state::{CheckinPhase, CheckinSnapshot, TerminalOutcome};
use crate::attendance::AttendanceSubmitter;
use crate::auth::AuthContext;
use crate::capture::{
    CaptureDevice, CaptureDeviceFactory, CaptureOpenError, CaptureSession, FacingMode,
};
use crate::config::CheckinConfig;
use crate::error::CheckinError;
use crate::models::ConfirmOutcome;
use crate::scan::{interpret_payload, sampler::sampling_loop};

const MSG_SIGN_IN_TO_SCAN: &str = "You must be signed in to scan attendance QR codes.";
const MSG_SIGN_IN_TO_CONFIRM: &str = "You must be logged in to record attendance.";
const MSG_INVALID_QR: &str = "Invalid QR code format. Please try again.";
const MSG_LOOKUP_FAILED: &str = "Error fetching event details. Please try again.";
const MSG_CONFIRMED: &str = "Attendance successfully recorded!";
const MSG_ALREADY_ATTENDED: &str = "You have already recorded attendance for this event.";
const MSG_GENERIC_FAILURE: &str = "Failed to record attendance. Please try again.";

struct Inner {
    phase: CheckinPhase,
    message: Option<String>,
    redirect: Option<String>,
    /// Bumped on every scan start, deep-link entry, and cancel. Async work
    /// spawned under an older epoch discards its result instead of applying
    /// it to a session that has moved on.
    epoch: u64,
    capture: Option<CaptureSession>,
}

/// Orchestrates the check-in flow:
/// `Idle → Scanning → Decoded → Resolving → Ready → Confirming → Terminal`,
/// with `Idle` reachable from anywhere via [`cancel`](Self::cancel). The
/// hosting UI observes [`CheckinSnapshot`]s through a watch channel and
/// renders them; a single controller serves both the standalone scanner
/// route and the embedded dashboard tab.
#[derive(Clone)]
pub struct CheckinController {
    config: Arc<CheckinConfig>,
    auth: Arc<dyn AuthContext>,
    devices: Arc<dyn CaptureDeviceFactory>,
    submitter: Arc<AttendanceSubmitter>,
    inner: Arc<Mutex<Inner>>,
    snapshot_tx: Arc<watch::Sender<CheckinSnapshot>>,
}

impl CheckinController {
    pub fn new(
        config: CheckinConfig,
        auth: Arc<dyn AuthContext>,
        devices: Arc<dyn CaptureDeviceFactory>,
        submitter: Arc<AttendanceSubmitter>,
    ) -> Self {
        let initial = CheckinSnapshot {
            embedded: config.embedded,
            ..CheckinSnapshot::default()
        };
        let (snapshot_tx, _) = watch::channel(initial);

        Self {
            config: Arc::new(config),
            auth,
            devices,
            submitter,
            inner: Arc::new(Mutex::new(Inner {
                phase: CheckinPhase::Idle,
                message: None,
                redirect: None,
                epoch: 0,
                capture: None,
            })),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    /// Receiver for state snapshots. The hosting UI re-renders on change.
    pub fn subscribe(&self) -> watch::Receiver<CheckinSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> CheckinSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// `Idle → Scanning`: acquire the camera and begin the decode loop.
    /// Starting while a session is active releases the previous capture
    /// first, so at most one hardware lock is ever held.
    pub async fn start_scan(&self) -> Result<(), CheckinError> {
        if self.auth.current_student_id().is_none() {
            let scan_path = self.config.scan_path.clone();
            return Err(self.redirect_to_sign_in(&scan_path, MSG_SIGN_IN_TO_SCAN).await);
        }

        let facing = FacingMode::for_viewport(
            self.config.viewport_width,
            self.config.handheld_max_width,
        );

        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.epoch += 1;
            teardown_capture(&mut inner);
            inner.phase = CheckinPhase::Scanning;
            inner.message = None;
            inner.redirect = None;
            self.publish(&inner);
            inner.epoch
        };

        // Acquisition may block on a permission prompt; keep it off the
        // state lock.
        let devices = Arc::clone(&self.devices);
        let opened = tokio::task::spawn_blocking(move || devices.open(facing)).await;

        let device = match opened {
            Ok(Ok(device)) => device,
            Ok(Err(err)) => {
                return self.fail_scan_start(epoch, map_open_error(err)).await;
            }
            Err(join_err) => {
                return self
                    .fail_scan_start(epoch, CheckinError::CaptureError(join_err.to_string()))
                    .await;
            }
        };
        let device: Arc<dyn CaptureDevice> = Arc::from(device);

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch || !inner.phase.is_scanning() {
            // The flow was cancelled while the camera was being acquired.
            device.release();
            return Ok(());
        }

        let mut session = CaptureSession::new(Arc::clone(&device), facing);
        let (decoded_tx, decoded_rx) = oneshot::channel();
        let sampler = tokio::spawn(sampling_loop(
            session.id().to_string(),
            device,
            self.config.sample_period,
            self.config.sample_timeout,
            session.cancel_token(),
            decoded_tx,
        ));
        session.set_sampler(sampler);
        info!(
            "capture session {} started ({:?} facing)",
            session.id(),
            session.facing()
        );
        inner.capture = Some(session);
        drop(inner);

        let controller = self.clone();
        tokio::spawn(async move {
            // Sender dropped without a decode means the session ended first.
            if let Ok(payload) = decoded_rx.await {
                controller.handle_decoded(epoch, payload).await;
            }
        });

        Ok(())
    }

    /// Deep-link entry (`/attend/{id}`): behaves like a successful decode
    /// with no camera involved.
    pub async fn open_event(&self, event_id: &str) -> Result<(), CheckinError> {
        if self.auth.current_student_id().is_none() {
            let return_path = format!("/attend/{event_id}");
            return Err(self.redirect_to_sign_in(&return_path, MSG_SIGN_IN_TO_SCAN).await);
        }

        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.epoch += 1;
            teardown_capture(&mut inner);
            inner.phase = CheckinPhase::Decoded {
                event_id: event_id.to_string(),
            };
            inner.message = None;
            inner.redirect = None;
            self.publish(&inner);
            inner.epoch
        };

        self.resolve_event(epoch, event_id.to_string()).await;
        Ok(())
    }

    /// `Ready → Confirming → Terminal`: one submission attempt for the
    /// resolved event. Returns how the flow ended; a failed submission lands
    /// in `Terminal(Failed)` and the student must rescan to try again.
    pub async fn confirm(&self) -> Result<TerminalOutcome, CheckinError> {
        let Some(student_id) = self.auth.current_student_id() else {
            let scan_path = self.config.scan_path.clone();
            return Err(
                self.redirect_to_sign_in(&scan_path, MSG_SIGN_IN_TO_CONFIRM)
                    .await,
            );
        };

        let (epoch, event_id) = {
            let mut inner = self.inner.lock().await;
            let CheckinPhase::Ready { event } = &inner.phase else {
                return Err(CheckinError::SubmissionFailed(
                    "no event is ready to confirm".into(),
                ));
            };
            let event_id = event.id.clone();
            inner.phase = CheckinPhase::Confirming {
                event_id: event_id.clone(),
            };
            self.publish(&inner);
            (inner.epoch, event_id)
        };

        let result = self.submitter.confirm_attendance(&student_id, &event_id).await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch || !matches!(inner.phase, CheckinPhase::Confirming { .. }) {
            // Cancelled while the submission was in flight. The write may
            // have landed; report the outcome but leave the state alone.
            return result.map(terminal_of);
        }

        let (outcome, message) = match &result {
            Ok(ConfirmOutcome::Confirmed) => (TerminalOutcome::Confirmed, MSG_CONFIRMED.to_string()),
            Ok(ConfirmOutcome::AlreadyAttended) => {
                (TerminalOutcome::AlreadyAttended, MSG_ALREADY_ATTENDED.to_string())
            }
            Err(CheckinError::SubmissionFailed(msg)) => (TerminalOutcome::Failed, msg.clone()),
            Err(err) => {
                warn!("unexpected confirmation failure: {err}");
                (TerminalOutcome::Failed, MSG_GENERIC_FAILURE.to_string())
            }
        };

        inner.phase = CheckinPhase::Terminal { outcome };
        inner.message = Some(message);
        self.publish(&inner);
        drop(inner);

        if matches!(
            outcome,
            TerminalOutcome::Confirmed | TerminalOutcome::AlreadyAttended
        ) {
            // Brief terminal display, then back to idle so the student can
            // scan the next event.
            let controller = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(controller.config.auto_reset_delay).await;
                controller.auto_reset(epoch).await;
            });
        }

        Ok(outcome)
    }

    /// Explicit cancel from any state: releases the camera, clears any
    /// pending event reference, and returns to `Idle`.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        teardown_capture(&mut inner);
        inner.phase = CheckinPhase::Idle;
        inner.message = None;
        inner.redirect = None;
        self.publish(&inner);
    }

    async fn handle_decoded(&self, epoch: u64, payload: String) {
        let event_id = {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch || !inner.phase.is_scanning() {
                return;
            }
            // The camera is released before the flow leaves Scanning.
            teardown_capture(&mut inner);

            match interpret_payload(&payload) {
                Ok(event_id) => {
                    inner.phase = CheckinPhase::Decoded {
                        event_id: event_id.clone(),
                    };
                    self.publish(&inner);
                    event_id
                }
                Err(err) => {
                    warn!("discarding undecipherable payload: {err}");
                    inner.phase = CheckinPhase::Idle;
                    inner.message = Some(MSG_INVALID_QR.into());
                    self.publish(&inner);
                    return;
                }
            }
        };

        self.resolve_event(epoch, event_id).await;
    }

    async fn resolve_event(&self, epoch: u64, event_id: String) {
        {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch {
                return;
            }
            inner.phase = CheckinPhase::Resolving {
                event_id: event_id.clone(),
            };
            self.publish(&inner);
        }

        let result = self.submitter.fetch_event_summary(&event_id).await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch || !matches!(inner.phase, CheckinPhase::Resolving { .. }) {
            return;
        }

        match result {
            Ok(event) => {
                inner.phase = CheckinPhase::Ready { event };
                self.publish(&inner);
            }
            Err(err) => {
                warn!("event lookup for {event_id} failed: {err}");
                inner.phase = CheckinPhase::Idle;
                inner.message = Some(MSG_LOOKUP_FAILED.into());
                self.publish(&inner);
            }
        }
    }

    async fn auto_reset(&self, epoch: u64) {
        let mut inner = self.inner.lock().await;
        let resettable = matches!(
            inner.phase,
            CheckinPhase::Terminal {
                outcome: TerminalOutcome::Confirmed | TerminalOutcome::AlreadyAttended
            }
        );
        if inner.epoch != epoch || !resettable {
            return;
        }
        inner.phase = CheckinPhase::Idle;
        inner.message = None;
        self.publish(&inner);
    }

    async fn fail_scan_start(&self, epoch: u64, err: CheckinError) -> Result<(), CheckinError> {
        let mut inner = self.inner.lock().await;
        if inner.epoch == epoch {
            inner.phase = CheckinPhase::Idle;
            inner.message = Some(format!("Camera error: {err}"));
            self.publish(&inner);
        }
        Err(err)
    }

    /// Precondition failure: not signed in. Publishes a navigation request
    /// to the sign-in flow with a return target instead of entering the
    /// requested state.
    async fn redirect_to_sign_in(&self, return_path: &str, message: &str) -> CheckinError {
        let mut inner = self.inner.lock().await;
        inner.redirect = Some(format!(
            "{}?redirect={}",
            self.config.sign_in_path, return_path
        ));
        inner.message = Some(message.to_string());
        self.publish(&inner);
        CheckinError::NotAuthenticated
    }

    fn publish(&self, inner: &Inner) {
        let _ = self.snapshot_tx.send(CheckinSnapshot {
            phase: inner.phase.clone(),
            message: inner.message.clone(),
            redirect: inner.redirect.clone(),
            embedded: self.config.embedded,
        });
    }
}

fn teardown_capture(inner: &mut Inner) {
    if let Some(mut session) = inner.capture.take() {
        session.stop();
    }
}

fn map_open_error(err: CaptureOpenError) -> CheckinError {
    match err {
        CaptureOpenError::Unavailable => CheckinError::CaptureUnavailable,
        CaptureOpenError::Denied(reason) => CheckinError::CaptureDenied(reason),
        CaptureOpenError::Hardware(reason) => CheckinError::CaptureError(reason),
    }
}

fn terminal_of(outcome: ConfirmOutcome) -> TerminalOutcome {
    match outcome {
        ConfirmOutcome::Confirmed => TerminalOutcome::Confirmed,
        ConfirmOutcome::AlreadyAttended => TerminalOutcome::AlreadyAttended,
    }
}
