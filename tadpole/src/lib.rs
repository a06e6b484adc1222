//! `tadpole` is a draft-era CoAP protocol engine: the stateful
//! machinery between an application that thinks in requests and
//! responses and a datagram transport that moves opaque buffers.
//!
//! The engine owns all temporal protocol state:
//! - confirmable messages are retransmitted on an exponential
//!   back-off schedule until acknowledged ([`retrans`], [`retry`]),
//! - repeated receptions are suppressed by `(peer, message id)`
//!   ([`dedup`]),
//! - payloads too large for one datagram travel as numbered blocks
//!   and are reassembled on the far side ([`block`]).
//!
//! Message encoding and decoding live in the sibling
//! [`tadpole_msg`] crate; [`core::Core`] ties all of it to a
//! host-provided transport and clock.
//!
//! ## Hosting the engine
//! The engine never blocks, owns no socket, and reads no clock; the
//! host drives it from a single execution context:
//! - [`core::Core::send`] for every outbound message,
//! - [`core::Core::handle_rx`] for every received datagram,
//! - [`core::Core::tick`] on a timer cadence of its choosing.
//!
//! Timestamps are [`embedded_time::Instant`]s of whatever clock the
//! host has, so the engine runs the same on a workstation and on a
//! tickless microcontroller.

#![doc(html_root_url = "https://docs.rs/tadpole/0.2.0")]
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test),
            deny(missing_debug_implementations,
                 unreachable_pub,
                 unsafe_code,
                 missing_copy_implementations))]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

/// Runtime configuration
pub mod config;

/// Addressed data and the host-provided transport hook
pub mod net;

/// Non-blocking retransmission pacing
pub mod retry;

/// Clocks, durations & timestamped data
pub mod time;

/// Blockwise transfer: slicing oversized payloads & reassembling
/// inbound fragments
#[cfg(feature = "alloc")]
pub mod block;

/// The engine itself
#[cfg(feature = "alloc")]
pub mod core;

/// Suppression of repeated receptions
#[cfg(feature = "alloc")]
pub mod dedup;

/// In-flight confirmable tracking
#[cfg(feature = "alloc")]
pub mod retrans;

#[cfg(feature = "alloc")]
pub use crate::core::{Core, Event, Message};
pub use crate::net::{Addrd, Transmit};
