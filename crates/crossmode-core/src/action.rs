//! Actions returned by the state machines.
//!
//! Machines never touch a socket: every outbound frame is returned as an
//! action for the driver to write to the destination endpoint. This keeps
//! the machines pure and the endpoint access single-threaded by
//! construction.

use crossmode_proto::dmr::DmrData;
use crossmode_proto::p25::LduBuffer;

use crate::context::CallContext;

/// One outbound frame for the destination endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeAction {
    /// Write a DMR frame.
    SendDmr(DmrData),

    /// Write a P25 LDU1 built from the call's context and voice buffer.
    SendP25Ldu1 {
        /// Call addressing and service attributes
        context: CallContext,
        /// The assembled 225-byte voice buffer
        ldu: Box<LduBuffer>,
    },

    /// Write a P25 LDU2.
    SendP25Ldu2 {
        /// Call addressing and service attributes
        context: CallContext,
        /// The assembled 225-byte voice buffer
        ldu: Box<LduBuffer>,
    },

    /// Write a P25 terminator, ending the call on the destination.
    SendP25Tdu {
        /// Call addressing and service attributes
        context: CallContext,
    },
}
