//! Process-wide session for single-identity programs

use std::sync::OnceLock;

use crate::Session;

static GLOBAL: OnceLock<Session> = OnceLock::new();

/// The process-wide session, created with the default configuration on first
/// call. It still needs [`Session::initialize`] before use.
///
/// Programs holding more than one identity should construct [`Session`]s
/// directly instead.
pub fn global() -> &'static Session {
    GLOBAL.get_or_init(Session::default)
}
