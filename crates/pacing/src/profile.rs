//! Synthetic client identities
//!
//! A fixed, ordered set of client fingerprints for the remote platform,
//! plus a shared cursor over it. Rotation is caller-driven: advance the
//! cursor when a session-blocking failure suggests the current fingerprint
//! is burned. Profiles carry no health state; they are interchangeable.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

/// One outbound client fingerprint: identity label, protocol version,
/// user agent, and the headers presented with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProfile {
    pub name: String,
    pub version: String,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

/// The client set shipped with the core: the desktop web client and the
/// two mobile app clients of the remote platform.
pub fn builtin_profiles() -> Vec<ClientProfile> {
    vec![
        ClientProfile {
            name: "web".into(),
            version: "2.20250111.00.00".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .into(),
            headers: vec![
                (
                    "Accept".into(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into(),
                ),
                ("Accept-Language".into(), "en-US,en;q=0.9".into()),
                ("Accept-Encoding".into(), "gzip, deflate, br".into()),
                ("DNT".into(), "1".into()),
                ("Connection".into(), "keep-alive".into()),
                ("Upgrade-Insecure-Requests".into(), "1".into()),
            ],
        },
        ClientProfile {
            name: "android".into(),
            version: "19.09.36".into(),
            user_agent: "com.google.android.youtube/19.09.36 (Linux; U; Android 13) gzip".into(),
            headers: vec![
                ("Accept".into(), "*/*".into()),
                ("Accept-Language".into(), "en-US,en;q=0.9".into()),
            ],
        },
        ClientProfile {
            name: "ios".into(),
            version: "19.09.3".into(),
            user_agent: "com.google.ios.youtube/19.09.3 (iPhone14,3; U; CPU iOS 15_6 like Mac OS X)"
                .into(),
            headers: vec![
                ("Accept".into(), "*/*".into()),
                ("Accept-Language".into(), "en-US,en;q=0.9".into()),
            ],
        },
    ]
}

/// Round-robin cursor over a fixed profile list.
///
/// The cursor is atomic so one rotator can be shared across tasks without
/// a lock; an `advance` from any caller is visible to all of them.
pub struct IdentityRotator {
    profiles: Vec<ClientProfile>,
    cursor: AtomicUsize,
}

impl Default for IdentityRotator {
    fn default() -> Self {
        Self::new(builtin_profiles())
    }
}

impl IdentityRotator {
    /// Panics if `profiles` is empty.
    pub fn new(profiles: Vec<ClientProfile>) -> Self {
        assert!(
            !profiles.is_empty(),
            "identity rotator needs at least one profile"
        );
        Self {
            profiles,
            cursor: AtomicUsize::new(0),
        }
    }

    /// The profile at the cursor.
    pub fn current(&self) -> ClientProfile {
        let idx = self.cursor.load(Ordering::Relaxed) % self.profiles.len();
        self.profiles[idx].clone()
    }

    /// Move to the next profile, wrapping at the end of the list.
    pub fn advance(&self) {
        let next = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        debug!(
            profile = %self.profiles[next % self.profiles.len()].name,
            "rotated client profile"
        );
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
