// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging setup.
//!
//! Parley logs through `tracing`; this module installs the subscriber.
//!
//! ```rust,ignore
//! use parley::telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::default())?;
//! ```
//!
//! Levels in use: `trace` for skipped stream frames, `debug` for request
//! dispatch and truncation, `warn` for failures that do not stop an exchange.

mod init;

pub use init::{init_telemetry, TelemetryConfig};
