use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rule the OS applies to decide when a stored record may be decrypted.
///
/// The policy is enforced by the credential backend, not by this crate. It is
/// not part of key identity and cannot be changed in place on an existing
/// record: moving an entry to another policy requires delete-then-insert.
///
/// Callers pass policies as string tokens (`passcode`, `unlocked`,
/// `unlocked_this_device`, `first_unlock`, `first_unlock_this_device`).
/// Unknown tokens resolve to [`Accessibility::WhenUnlocked`], see
/// [`Accessibility::from_token`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumString,
    Display,
    Serialize,
    Deserialize,
    uniffi::Enum,
)]
pub enum Accessibility {
    /// Readable only while the device is unlocked and a passcode is set. Never
    /// leaves the device.
    #[strum(serialize = "passcode")]
    #[serde(rename = "passcode")]
    PasscodeSetThisDeviceOnly,
    /// Readable while the device is unlocked. This is the default policy.
    #[default]
    #[strum(serialize = "unlocked")]
    #[serde(rename = "unlocked")]
    WhenUnlocked,
    /// Readable while the device is unlocked. Never leaves the device.
    #[strum(serialize = "unlocked_this_device")]
    #[serde(rename = "unlocked_this_device")]
    WhenUnlockedThisDeviceOnly,
    /// Readable once the device has been unlocked after boot.
    #[strum(serialize = "first_unlock")]
    #[serde(rename = "first_unlock")]
    AfterFirstUnlock,
    /// Readable once the device has been unlocked after boot. Never leaves the
    /// device.
    #[strum(serialize = "first_unlock_this_device")]
    #[serde(rename = "first_unlock_this_device")]
    AfterFirstUnlockThisDeviceOnly,
}

impl Accessibility {
    /// Every policy, in token order.
    pub const ALL: [Self; 5] = [
        Self::PasscodeSetThisDeviceOnly,
        Self::WhenUnlocked,
        Self::WhenUnlockedThisDeviceOnly,
        Self::AfterFirstUnlock,
        Self::AfterFirstUnlockThisDeviceOnly,
    ];

    /// Deletes issued during a migration: one unconstrained delete, then one per
    /// policy.
    pub(crate) const MIGRATION_SWEEP: [Option<Self>; 6] = [
        None,
        Some(Self::PasscodeSetThisDeviceOnly),
        Some(Self::WhenUnlocked),
        Some(Self::WhenUnlockedThisDeviceOnly),
        Some(Self::AfterFirstUnlock),
        Some(Self::AfterFirstUnlockThisDeviceOnly),
    ];

    /// Parses a caller token, falling back to [`Accessibility::WhenUnlocked`]
    /// for anything unrecognized.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        token.parse().unwrap_or_else(|_| {
            log::debug!("unknown accessibility token {token:?}, using default");
            Self::default()
        })
    }

    /// Parses an optional caller token. `None` means the caller did not ask for
    /// a policy, which is different from asking for the default one.
    #[must_use]
    pub fn from_optional_token(token: Option<&str>) -> Option<Self> {
        token.map(Self::from_token)
    }

    /// Returns the caller-facing token for this policy.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::PasscodeSetThisDeviceOnly => "passcode",
            Self::WhenUnlocked => "unlocked",
            Self::WhenUnlockedThisDeviceOnly => "unlocked_this_device",
            Self::AfterFirstUnlock => "first_unlock",
            Self::AfterFirstUnlockThisDeviceOnly => "first_unlock_this_device",
        }
    }
}
