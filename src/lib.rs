//! hivelink — edge telemetry agent
//!
//! Polls heterogeneous sensors (Modbus-register and I2C-byte families) on a
//! fixed interval, validates and batches the readings, and publishes them to
//! an MQTT broker with at-least-once delivery. Designed for long-running
//! operation on unreliable links: bus errors cost one reading, broker
//! outages are ridden out with bounded exponential backoff, and nothing in
//! the pipeline is fatal to the process.
//!
//! ## Modules
//!
//! * `config` — TOML configuration: loading, env-var path override,
//!   validation via the `validator` crate, defaults.
//!
//! * `core` — the runtime:
//!   - `sensors`: binary decoders, bus trait seams, the per-family sensor
//!     implementations, and the built-in simulated buses
//!   - `telemetry`: validation and batching into delivery-ready messages
//!   - `executor`: the polling loop
//!
//! * `logger` — `tracing` subscriber setup (console formats, optional
//!   systemd journald).
//!
//! Broker connectivity lives in the workspace's `hivelink-mqtt` crate.

pub mod config;
pub mod core;
pub mod logger;
