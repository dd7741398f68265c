//! Clock abstraction shared by the control loop, the logger and `tiltr simulate`.

pub mod source;
