use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn from_secs(seconds: u64) -> Option<Self> {
        i64::try_from(seconds)
            .ok()
            .and_then(|seconds| Self::new(Duration::seconds(seconds)))
    }

    #[must_use]
    pub fn from_millis(millis: u64) -> Option<Self> {
        i64::try_from(millis)
            .ok()
            .and_then(|millis| Self::new(Duration::milliseconds(millis)))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    /// The same span as a [`std::time::Duration`], for timers.
    #[must_use]
    pub fn to_std(self) -> std::time::Duration {
        self.0.unsigned_abs()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[cfg(test)]
mod tests {
    use crate::util::PositiveDuration;
    use time::Duration;

    #[test]
    fn zero_is_not_positive() {
        assert!(PositiveDuration::from_secs(0).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-1)).is_err());
        assert_eq!(
            PositiveDuration::from_secs(30).unwrap().to_std(),
            std::time::Duration::from_secs(30)
        );
        assert_eq!(
            PositiveDuration::from_millis(50).unwrap().to_std(),
            std::time::Duration::from_millis(50)
        );
    }
}
