use std::time::Duration;

use common::Locale;

/// Cart store tuning.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Quiet period before a quantity edit is sent to the backend.
    pub debounce: Duration,

    /// Pause between sign-in and the login merge.
    pub merge_delay: Duration,

    /// Restore a cart persisted by an earlier visit without asking.
    pub auto_restore: bool,

    /// Locale used for names in cart events.
    pub locale: Locale,

    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            merge_delay: Duration::from_millis(500),
            auto_restore: true,
            locale: Locale::default(),
            event_capacity: 64,
        }
    }
}
