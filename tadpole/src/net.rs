use no_std_net::SocketAddr;

/// Data that came from, or is destined for, a network peer
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addrd
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the socket and get the data in this Addrd
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addrd
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Mutably borrow the contents of the addressed item
  pub fn data_mut(&mut self) -> &mut T {
    &mut self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

impl<T> AsMut<T> for Addrd<T> {
  fn as_mut(&mut self) -> &mut T {
    &mut self.0
  }
}

/// The engine's one outbound hook: move a fully encoded datagram
/// towards a peer.
///
/// This mirrors the `send` half of a UDP socket trait, and nothing
/// else: the engine never binds, polls or receives. The host reads
/// datagrams off whatever transport it owns and feeds them to
/// [`Core::handle_rx`](crate::core::Core::handle_rx) itself.
///
/// Implementations must not block; a host that implements this with
/// a blocking call accepts the latency inside every engine entry
/// point that transmits.
pub trait Transmit {
  /// The error yielded by the underlying transport
  type Error: core::fmt::Debug;

  /// Send one datagram to the addressed peer
  fn transmit(&mut self, dgram: Addrd<&[u8]>) -> Result<(), Self::Error>;
}
