use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureDevice;
use crate::scan::decode_frame;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Periodic decode loop for one capture session. Polls the device each tick,
/// attempts one decode, and delivers the first decoded payload through
/// `decoded_tx` before exiting (single decode per session). Unready frames
/// are skipped silently; there is no give-up timeout while the session is
/// alive. Tearing down the camera is the controller's job, not ours.
pub(crate) async fn sampling_loop(
    session_id: String,
    device: Arc<dyn CaptureDevice>,
    period: Duration,
    sample_timeout: Duration,
    cancel_token: CancellationToken,
    decoded_tx: oneshot::Sender<String>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut decoded_tx = Some(decoded_tx);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = sample_once(&device);
                match tokio::time::timeout(sample_timeout, fut).await {
                    Ok(Ok(Some(payload))) => {
                        log_info!("decode succeeded for session {session_id}");
                        if let Some(tx) = decoded_tx.take() {
                            // Receiver gone means the session already ended.
                            let _ = tx.send(payload);
                        }
                        break;
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(err)) => {
                        log_warn!("sample failed for session {session_id}: {err:?}");
                    }
                    Err(_) => {
                        log_warn!(
                            "sample timeout (> {}s) for session {session_id}",
                            sample_timeout.as_secs()
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop for session {session_id} shutting down");
                break;
            }
        }
    }
}

/// One tick: pull the latest frame and attempt exactly one decode. `None`
/// covers both an unready device and a frame with no QR code in it.
async fn sample_once(device: &Arc<dyn CaptureDevice>) -> Result<Option<String>> {
    let frame = {
        let device = Arc::clone(device);
        tokio::task::spawn_blocking(move || device.poll_frame())
            .await
            .context("frame poll worker join failed")??
    };

    let Some(frame) = frame else {
        return Ok(None);
    };
    if !frame.has_pixels() {
        return Ok(None);
    }

    let payload = tokio::task::spawn_blocking(move || decode_frame(frame))
        .await
        .context("decode worker join failed")?;

    Ok(payload)
}
