use async_trait::async_trait;

/// Callback surface for log and user-facing notification delivery. The
/// consumer decides how messages reach the user; callers may invoke these
/// from background tasks, so implementations must be thread safe and quick.
pub trait Notifications: Send + Sync {
    /// Emits a debug level log message, never shown to the user.
    fn log(&self, message: &str);

    /// Emits an error level log message, never shown to the user.
    fn log_error(&self, message: &str);

    /// Emits a warning level log message, never shown to the user.
    fn log_warning(&self, message: &str);

    /// Notifies the user of an event.
    fn notify(&self, message: &str);

    /// Notifies the user that an operation failed.
    fn notify_error(&self, message: &str);

    /// Notifies the user of a low-priority warning.
    fn notify_warning(&self, message: &str);
}

/// Routes every notification to the `log` facade. Suitable as a default
/// sink and for tests; real frontends supply their own implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifications;

impl Notifications for LogNotifications {
    fn log(&self, message: &str) {
        log::debug!("{message}");
    }

    fn log_error(&self, message: &str) {
        log::error!("{message}");
    }

    fn log_warning(&self, message: &str) {
        log::warn!("{message}");
    }

    fn notify(&self, message: &str) {
        log::info!("notify: {message}");
    }

    fn notify_error(&self, message: &str) {
        log::error!("notify: {message}");
    }

    fn notify_warning(&self, message: &str) {
        log::warn!("notify: {message}");
    }
}

/// Receives the signal that a batch of entity lookups has settled and
/// refreshed names may be re-read. Delivered on the lookup worker task;
/// marshaling to a UI thread is the implementor's responsibility.
#[async_trait]
pub trait EntityEventSink {
    type Error: Send + Sync + 'static;

    async fn names_updated(&self) -> Result<(), Self::Error>;
}
