//! Logging shim: every call site in this crate goes through here so the
//! `tracing` feature gate lives in one place instead of being repeated at
//! every call site that wants to log something.

#[cfg(feature = "tracing")]
pub fn warn(msg: &str) {
    tracing::warn!("{msg}");
}

#[cfg(not(feature = "tracing"))]
pub fn warn(_msg: &str) {}

#[cfg(feature = "tracing")]
pub fn error(msg: &str) {
    tracing::error!("{msg}");
}

#[cfg(not(feature = "tracing"))]
pub fn error(_msg: &str) {}

#[cfg(feature = "tracing")]
pub fn debug(msg: &str) {
    tracing::debug!("{msg}");
}

#[cfg(not(feature = "tracing"))]
pub fn debug(_msg: &str) {}

#[cfg(feature = "tracing")]
pub fn trace(msg: &str) {
    tracing::trace!("{msg}");
}

#[cfg(not(feature = "tracing"))]
pub fn trace(_msg: &str) {}
