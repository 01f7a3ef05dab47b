//! Runtime configuration.

/// Settings shared by every promise created under one [`Agent`](crate::Agent).
///
/// # Examples
///
/// ```
/// use async_runtime::RuntimeConfig;
///
/// let config = RuntimeConfig::default()
///     .with_rejection_tracking(false)
///     .with_microtask_limit(Some(10_000));
/// assert!(!config.track_rejections);
/// assert_eq!(config.microtask_limit, Some(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Whether unhandled rejections are tracked and reported after each checkpoint
    pub track_rejections: bool,
    /// Maximum number of jobs a single microtask checkpoint may run
    pub microtask_limit: Option<usize>,
}

impl RuntimeConfig {
    /// Enable or disable unhandled-rejection tracking.
    pub fn with_rejection_tracking(mut self, enabled: bool) -> Self {
        self.track_rejections = enabled;
        self
    }

    /// Bound the number of jobs one checkpoint may run (`None` = unbounded).
    pub fn with_microtask_limit(mut self, limit: Option<usize>) -> Self {
        self.microtask_limit = limit;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            track_rejections: true,
            microtask_limit: None,
        }
    }
}
