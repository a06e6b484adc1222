//! Low-level representation of draft-era CoAP messages.
//!
//! The most notable item in `tadpole_msg` is `Message`;
//! a CoAP message very close to the actual byte layout.
//!
//! ## Wire format
//! This crate speaks the *pre-standard* draft wire format, which
//! differs from the RFC that eventually shipped:
//! - the fourth header nibble counts options rather than sizing the
//!   token; the token is option 11,
//! - option deltas are a plain 4-bit value, with zero-length
//!   "Fencepost" options at multiples of 14 bridging larger gaps,
//! - option value lengths over 14 use a single extended length byte
//!   (cap 270),
//! - there is no payload marker; everything after the options is
//!   payload.
//!
//! ## Allocation
//! CoAP messages have some attributes whose size is dynamic:
//! - The message payload (in http terms: the request/response body)
//! - the number of options (in http terms: headers)
//! - the value of an option (in http terms: header value)
//!
//! `Message` does not require an allocator and has no opinions about
//! what kind of collection it uses internally to store these values.
//!
//! It solves this problem by being generic over the collections it
//! needs, using the `Array` and `Map` traits to capture its idea of
//! what makes a collection useful.
//!
//! This means that you may use a provided implementation (for `Vec`
//! and `BTreeMap`, or `tinyvec::ArrayVec` on heapless targets) or
//! provide your own collection.

#![doc(html_root_url = "https://docs.rs/tadpole-msg/0.4.1")]
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

#[doc(hidden)]
pub mod from_bytes;

/// Message structs
pub mod msg;

#[doc(hidden)]
pub mod to_bytes;

/// Message validity checking
pub mod valid;

#[doc(inline)]
pub use from_bytes::TryFromBytes;
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use to_bytes::TryIntoBytes;
#[doc(inline)]
pub use valid::{validate, InvalidMessage};

/// Type aliases for std or alloc platforms
#[cfg(feature = "alloc")]
pub mod alloc {
  use std_alloc::collections::BTreeMap;
  use std_alloc::vec::Vec;

  use crate::{OptNumber, OptValue};

  /// [`crate::Message`] that uses Vec and BTreeMap
  pub type Message = crate::Message<Vec<u8>, BTreeMap<OptNumber, Vec<OptValue<Vec<u8>>>>>;
}

#[cfg(test)]
pub(crate) fn test_msg() -> (alloc::Message, Vec<u8>) {
  use std_alloc::collections::BTreeMap;

  let header: [u8; 4] = [0x42, 0x45, 0x00, 0x01];
  let content_type: [u8; 2] = [0x11, 42];
  let token: [u8; 2] = [0xa1, 254];
  let payload: &[u8] = b"hello, world!";
  let bytes = [header.as_ref(),
               content_type.as_ref(),
               token.as_ref(),
               payload].concat();

  let msg = alloc::Message { id: Id(1),
                             ty: Type::Con,
                             ver: Version(1),
                             token: Token(tinyvec::array_vec!([u8; 8] => 254)),
                             opts: BTreeMap::from([(OptNumber(1),
                                                    vec![OptValue(vec![42])])]),
                             code: Code::CONTENT,
                             payload: Payload(b"hello, world!".to_vec()) };
  (msg, bytes)
}
