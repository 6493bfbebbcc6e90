//! logvane daemon library.
//!
//! Shared startup code for the `logvane-syslogd` and `logvane-tail`
//! binaries, exposed as a library for integration testing.

pub mod bootstrap;
pub mod cli;
pub mod logging;
pub mod metrics_server;
