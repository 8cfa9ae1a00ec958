use std::{fs, path::PathBuf, sync::RwLock};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Backend column limit for `device_id`.
const MAX_DEVICE_ID_LEN: usize = 200;

/// Stable browser/environment signals the fingerprint is derived from.
/// Order matters: the hash is intentionally order-dependent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSignals {
    pub user_agent: String,
    pub language: String,
    pub color_depth: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl DeviceSignals {
    fn canonical(&self) -> String {
        format!(
            "{}|{}|{}|{}x{}",
            self.user_agent, self.language, self.color_depth, self.screen_width, self.screen_height
        )
    }
}

/// Deterministic fingerprint over the canonical signal string (FNV-1a).
/// Same signals, same identifier; never longer than the backend's limit.
pub fn compute_fingerprint(signals: &DeviceSignals) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in signals.canonical().bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    truncate_device_id(format!("fp-{hash:016x}"))
}

fn truncate_device_id(id: String) -> String {
    if id.len() <= MAX_DEVICE_ID_LEN {
        id
    } else {
        id.chars().take(MAX_DEVICE_ID_LEN).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CachedFingerprint {
    device_id: Option<String>,
}

/// Create-once-then-cache store for the device fingerprint, persisted as a
/// small JSON file so the identifier survives across sessions.
pub struct FingerprintStore {
    path: PathBuf,
    data: RwLock<CachedFingerprint>,
}

impl FingerprintStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read fingerprint cache {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            CachedFingerprint::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// The cached identifier, computing and persisting it on first use when
    /// signals are available. Hosts without signals get `None` and the
    /// submission simply omits the field.
    pub fn device_id(&self, signals: Option<&DeviceSignals>) -> Option<String> {
        if let Some(cached) = self.data.read().ok()?.device_id.clone() {
            return Some(truncate_device_id(cached));
        }

        let signals = signals?;
        let computed = compute_fingerprint(signals);

        let mut guard = self.data.write().ok()?;
        // Another caller may have filled the cache while we computed.
        if guard.device_id.is_none() {
            guard.device_id = Some(computed.clone());
            if let Err(err) = self.persist(&guard) {
                warn!("failed to persist device fingerprint: {err:#}");
            }
        }

        guard.device_id.clone()
    }

    fn persist(&self, data: &CachedFingerprint) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed to write fingerprint cache {}", self.path.display()))
    }
}
