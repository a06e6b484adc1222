use tinyvec::ArrayVec;

/// # Token
///
/// 0 to 8 bytes of opaque application data correlating a request with
/// its response(s). The engine never interprets token bytes; it only
/// compares them.
///
/// A [`Message ID`](crate::Id) lives and dies with a single datagram
/// exchange, while the token survives across exchanges: a request
/// sent as a Confirmable gets its ID echoed back by the transport
/// acknowledgement, and its *token* echoed back by the eventual
/// response, which may arrive in a completely separate exchange.
///
/// On the wire the token is carried as option 11 and is absent when
/// empty.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Debug)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Is this the empty (absent) token?
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<const N: usize> From<[u8; N]> for Token {
  fn from(bytes: [u8; N]) -> Self {
    Token(bytes.iter().copied().take(8).collect())
  }
}
