pub mod gate;
pub mod headers;
pub mod throttle;
