#[allow(unused_imports)]
use crate::Token;
use toad_cursor::Cursor;

use super::MessageParseError;
use crate::from_bytes::TryConsumeBytes;

/// # Message ID
///
/// 16-bit unsigned integer in network byte order. Identifies a
/// single datagram exchange with a peer: Acknowledgement and Reset
/// messages address the Confirmable / Non-confirmable message with
/// the same ID, and a repeated `(peer, Id)` pair within the
/// duplicate-detection window marks a retransmission.
///
/// Peer-scoped; two peers may use the same ID concurrently without
/// any relation between the exchanges.
///
/// For the application-level correlator shared between a request and
/// its response, see [`Token`].
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Debug, Eq, Ord)]
pub struct Id(pub u16);

impl Id {
  /// Create an Id from a big-endian 2-byte unsigned int
  pub fn from_be_bytes(bs: [u8; 2]) -> Self {
    Self(u16::from_be_bytes(bs))
  }
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for Id {
  type Error = MessageParseError;

  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok(Id::from_be_bytes([a, b])),
      | _ => Err(MessageParseError::eof()),
    }
  }
}
