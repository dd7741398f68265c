//! Process-level I/O: the single-instance lock and Unix signals.
pub mod lock;
pub mod signals;
