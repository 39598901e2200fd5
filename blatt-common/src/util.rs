use thiserror::Error;
use time::Duration;

/// A strictly positive duration, used for session lifetimes and cache expiry.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct Ttl(Duration);

impl Ttl {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn from_secs(secs: u64) -> Option<Self> {
        let secs = i64::try_from(secs).ok()?;
        Self::new(Duration::seconds(secs))
    }

    #[must_use]
    pub fn get(self) -> Duration {
        self.0
    }

    /// The equivalent `std` duration, for `Instant` arithmetic.
    #[must_use]
    pub fn as_std(self) -> std::time::Duration {
        self.0.unsigned_abs()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveTtlError(Duration);

impl TryFrom<Duration> for Ttl {
    type Error = NonPositiveTtlError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveTtlError(value))
    }
}
