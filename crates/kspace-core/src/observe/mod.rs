//! # Observability
//!
//! Pipeline stages emit `tracing` events:
//!
//! | Level   | Events                                                  |
//! |---------|---------------------------------------------------------|
//! | `debug` | tensor shapes, template permutations, fidelity scores   |
//! | `info`  | files written or read, templates filled, pipeline runs  |
//! | `warn`  | tolerated header oddities, partial files left on disk   |
//!
//! Nothing is printed until the host installs a subscriber, for example with
//! [`init_logging`].

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
