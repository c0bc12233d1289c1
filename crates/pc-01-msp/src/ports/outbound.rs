//! # Outbound Ports

/// Wall clock used for certificate validity checks.
pub trait TimeSource: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> i64;
}
