//! # BioShake Core Library
//!
//! Host-side driver for Q.instruments BioShake shakers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Request framing and line-oriented response parsing
//! - Rate-limited serial transport with bounded response waits
//! - Typed device operations, including the shake-on recovery for an unset
//!   target speed
//! - Optional port discovery
//!
//! ## Example
//!
//! ```rust,no_run
//! use bioshake_core::protocol::{Bioshake, ConnectionConfig};
//!
//! # fn main() -> Result<(), bioshake_core::protocol::ProtocolError> {
//! let config = ConnectionConfig::for_port("/dev/ttyUSB0");
//! Bioshake::scoped(config, |dev| {
//!     println!("{}", dev.get_version()?);
//!     dev.set_shake_target_speed(1500)?;
//!     dev.shake_on_with_runtime(30)?;
//!     println!("{}", dev.get_shake_state()?);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod protocol;
pub mod shake_state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::discovery::{find_device_port, DeviceIdentity};
    pub use crate::protocol::{Bioshake, ConnectionConfig, ProtocolError, Transport};
    pub use crate::shake_state::ShakeState;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
