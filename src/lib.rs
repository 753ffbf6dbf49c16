//! A client for the ZKTeco-style binary protocol spoken by networked
//! biometric attendance/access-control terminals: framing and checksums,
//! the connect/auth handshake, chunked bulk transfer, the live-capture event
//! stream, enrollment, and the user/template/attendance record codecs.
//!
//! ```no_run
//! use zkterm::{Device, DeviceConfig};
//!
//! # async fn run() -> zkterm::Result<()> {
//! let mut device = Device::connect(DeviceConfig::new("10.0.0.201")).await?;
//! let users = device.get_users().await?;
//! println!("{} users enrolled", users.len());
//! device.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod ops;
pub mod session;
pub mod transport;

pub use client::Device;
pub use config::{DeviceConfig, TransportKind};
pub use error::{Result, ZkError};
pub use model::{AttendanceRecord, Capacity, FingerprintTemplate, Privilege, RecordLayout, User};
