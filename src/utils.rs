//! # Utility Functions Module
//!
//! Small helpers shared by the strategies, the reporting code and cancellation.

use std::ffi::OsString;
use std::path::Path;
use tokio::sync::broadcast;

/// Builds a subprocess argument list from mixed string-like items.
///
/// Paths go in as `OsString` so non-UTF-8 file names survive intact.
///
/// # Example
/// ```rust,ignore
/// let args = to_os_args([input.as_os_str(), OsStr::new("-q"), OsStr::new(&quality)]);
/// ```
pub fn to_os_args<T, I>(items: I) -> Vec<OsString>
where
    T: Into<OsString>,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(Into::into).collect()
}

/// File name of `path` for log lines and tables
pub fn file_label(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().to_string()
}

/// Shorten `name` to at most `max` characters (not bytes)
pub fn truncate_chars(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}

/// Whether a stop signal is pending on `receiver`
pub fn stop_requested(receiver: Option<&mut broadcast::Receiver<()>>) -> bool {
    match receiver {
        Some(receiver) => match receiver.try_recv() {
            Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => true,
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => false,
        },
        None => false,
    }
}

/// Drop stop signals already delivered to `receiver`
pub fn drain_stop_signals(receiver: &mut broadcast::Receiver<()>) {
    while stop_requested(Some(&mut *receiver)) {}
}
