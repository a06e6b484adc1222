use tadpole_msg::to_bytes::MessageToBytesError;
use tadpole_msg::{InvalidMessage, MessageParseError, Token};

use crate::net::Addrd;

/// An error encounterable while sending a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError<E> {
  /// The message broke a structural rule
  /// (see [`tadpole_msg::validate`])
  Invalid(InvalidMessage),
  /// Serializing the message to bytes failed
  ToBytes(MessageToBytesError),
  /// The transport failed to move the datagram
  Transmit(E),
  /// Too many unacked confirmables are already in flight
  Full,
}

/// An error encounterable while handling inbound datagrams or
/// driving timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
  /// Parsing the datagram failed
  Parse(MessageParseError),
  /// The datagram parsed, but into a message the engine must not
  /// process (e.g. a foreign protocol version)
  Invalid(InvalidMessage),
  /// The transport failed to move an engine-generated datagram
  /// (a retransmission or a continuation block)
  Transmit(E),
  /// Serializing an engine-generated continuation block failed
  ToBytes(MessageToBytesError),
  /// The retransmission store had no slot for an engine-generated
  /// confirmable continuation block
  Full,
  /// A peer's blockwise transfer outgrew the reassembly cap and was
  /// abandoned
  BlockwiseTooLarge(Addrd<Token>),
}

impl<E> From<SendError<E>> for Error<E> {
  fn from(e: SendError<E>) -> Self {
    match e {
      // engine-generated messages have already been validated
      | SendError::Invalid(e) => Error::Invalid(e),
      | SendError::ToBytes(e) => Error::ToBytes(e),
      | SendError::Transmit(e) => Error::Transmit(e),
      | SendError::Full => Error::Full,
    }
  }
}
