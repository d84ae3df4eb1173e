//! Production host for the DMR / P25 transcoder.
//!
//! Glues the Sans-IO machines of [`crossmode_core`] to real sockets: two
//! FNE master links (source and destination), YAML configuration, and the
//! single-threaded tick loop that drains frames, dispatches them to the
//! machines and executes the returned actions.
//!
//! # Architecture
//!
//! One logical task owns everything. Sockets are polled non-blocking each
//! tick, machines never suspend, and the only yield is a millisecond sleep
//! when a tick finishes early. Endpoint write queues are therefore
//! single-writer by construction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod host;
pub mod network;

pub use config::Config;
pub use error::HostError;
pub use host::Host;
pub use network::{FneNetwork, NetworkConfig};
