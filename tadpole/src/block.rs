use embedded_time::Instant;
use no_std_net::SocketAddr;
use std_alloc::vec::Vec;
use tadpole_msg::known::no_repeat::{BLOCK1, BLOCK2};
use tadpole_msg::{Block, CodeKind, Id, OptNumber, Payload, Token};

use crate::core::Message;
use crate::net::Addrd;
use crate::time::{age, Clock, Millis};

fn strip_block_options(m: &mut Message) {
  m.remove(BLOCK1);
  m.remove(BLOCK2);
}

struct Transfer<C: Clock> {
  template: Addrd<Message>,
  payload: Vec<u8>,
  block_size: u16,
  num_opt: OptNumber,
  last_touch: Instant<C>,
}

impl<C: Clock> Transfer<C> {
  fn block_count(&self) -> u32 {
    let bs = usize::from(self.block_size);
    ((self.payload.len() + bs - 1) / bs) as u32
  }

  /// Build the message carrying block `n`: the template's options
  /// and token, a Block option for `n`, the matching payload slice,
  /// and an id offset by `n` so every datagram keeps a distinct
  /// peer-scoped id.
  fn block_msg(&self, n: u32) -> Addrd<Message> {
    let bs = usize::from(self.block_size);
    let from = n as usize * bs;
    let to = (from + bs).min(self.payload.len());
    let more = to < self.payload.len();

    let mut m = self.template.data().clone();
    m.id = Id(self.template.data().id.0.wrapping_add(n as u16));
    m.payload = Payload(self.payload[from..to].to_vec());

    if self.num_opt == BLOCK1 {
      m.set_block1(self.block_size, n, more).ok();
    } else {
      m.set_block2(self.block_size, n, more).ok();
    }

    Addrd(m, self.template.addr())
  }
}

/// Outbound half of blockwise transfer: payloads too large for one
/// datagram are sliced up, block 0 goes out immediately, and the
/// rest is retained here to be served as the peer acknowledges.
///
/// Requests are sliced under Block1, responses under Block2.
pub struct Outbound<C: Clock> {
  transfers: Vec<Transfer<C>>,
}

impl<C: Clock> core::fmt::Debug for Outbound<C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Outbound")
     .field("transfers", &self.transfers.len())
     .finish()
  }
}

impl<C: Clock> Default for Outbound<C> {
  fn default() -> Self {
    Self { transfers: Vec::new() }
  }
}

impl<C: Clock> Outbound<C> {
  /// Begin a transfer: retain `msg`'s payload and options as the
  /// template, and get back the message carrying block 0.
  ///
  /// The caller guarantees `msg`'s payload is longer than
  /// `block_size`. A previous unfinished transfer to the same peer
  /// with the same token is replaced.
  pub fn start(&mut self, msg: Addrd<Message>, block_size: u16, now: Instant<C>) -> Addrd<Message> {
    let addr = msg.addr();
    let mut template = msg.unwrap();
    let payload = core::mem::take(&mut template.payload.0);

    let num_opt = match template.code.kind() {
      | CodeKind::Request => BLOCK1,
      | _ => BLOCK2,
    };

    self.transfers
        .retain(|t| !(t.template.addr() == addr && t.template.data().token == template.token));

    let transfer = Transfer { template: Addrd(template, addr),
                              payload,
                              block_size,
                              num_opt,
                              last_touch: now };
    let first = transfer.block_msg(0);
    self.transfers.push(transfer);

    first
  }

  /// A peer's acknowledgement asked for block `block.num()`; build
  /// the message carrying it, or `None` when no transfer matches
  /// (or the requested number is past the end, which drops the
  /// transfer).
  ///
  /// Acknowledgements carrying an empty token match the peer's only
  /// transfer by address.
  pub fn continue_for(&mut self,
                      from: SocketAddr,
                      token: Token,
                      block: Block,
                      now: Instant<C>)
                      -> Option<Addrd<Message>> {
    let ix = self.transfers
                 .iter()
                 .position(|t| {
                   t.template.addr() == from
                   && (token.is_empty() || t.template.data().token == token)
                 })?;

    let count = self.transfers[ix].block_count();
    let n = block.num();

    if n >= count {
      log::debug!("peer {} asked for block {} of {}, dropping transfer", from, n, count);
      self.transfers.remove(ix);
      return None;
    }

    self.transfers[ix].last_touch = now;
    let msg = self.transfers[ix].block_msg(n);

    if n + 1 == count {
      // final block; nothing left to serve
      self.transfers.remove(ix);
    }

    Some(msg)
  }

  /// Forget transfers the peer stopped driving
  pub fn prune(&mut self, now: Instant<C>, idle: Millis) {
    let before = self.transfers.len();
    self.transfers.retain(|t| age(now, t.last_touch) < idle);

    if self.transfers.len() < before {
      log::debug!("dropped {} idle outbound block transfers",
                  before - self.transfers.len());
    }
  }

  /// Number of unfinished transfers
  pub fn len(&self) -> usize {
    self.transfers.len()
  }

  /// Are there no unfinished transfers?
  pub fn is_empty(&self) -> bool {
    self.transfers.is_empty()
  }
}

struct Assembly<C: Clock> {
  from: SocketAddr,
  token: Token,
  buf: Vec<u8>,
  next: u32,
  last_touch: Instant<C>,
}

/// What [`Inbound::feed`] did with a fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Fed {
  /// The fragment was out of order or belonged to no known
  /// transfer; it was dropped and the peer is expected to
  /// retransmit.
  Ignored,
  /// The fragment was appended; the transfer is still incomplete.
  More,
  /// The final fragment arrived. The message is the last fragment's
  /// options wrapped around the whole reassembled payload.
  Done(Message),
  /// The reassembled payload outgrew the configured cap; the
  /// transfer was abandoned.
  Overflow(Token),
}

/// Inbound half of blockwise transfer: fragments are appended
/// strictly in order to an assembly keyed by `(peer, token)`, and
/// the completed payload is handed back as one logical message.
pub struct Inbound<C: Clock> {
  max_message_size: usize,
  assemblies: Vec<Assembly<C>>,
}

impl<C: Clock> core::fmt::Debug for Inbound<C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Inbound")
     .field("max_message_size", &self.max_message_size)
     .field("assemblies", &self.assemblies.len())
     .finish()
  }
}

impl<C: Clock> Inbound<C> {
  /// Create a store whose reassembled messages may not exceed
  /// `max_message_size` bytes
  pub fn new(max_message_size: usize) -> Self {
    Self { max_message_size,
           assemblies: Vec::new() }
  }

  /// Process one fragment carrying `block`
  pub fn feed(&mut self, msg: Addrd<Message>, block: Block, now: Instant<C>) -> Fed {
    let addr = msg.addr();
    let token = msg.data().token;

    let ix = self.assemblies
                 .iter()
                 .position(|a| a.from == addr && a.token == token);

    match ix {
      | None if block.num() > 0 => {
        log::debug!("mid-transfer block {} from {} with no assembly, dropping", block.num(), addr);
        Fed::Ignored
      },
      | None if !block.more() => {
        // sole block of a transfer; nothing to hold on to
        let mut m = msg.unwrap();
        strip_block_options(&mut m);
        Fed::Done(m)
      },
      | None => {
        let m = msg.unwrap();

        if m.payload.0.len() > self.max_message_size {
          return Fed::Overflow(token);
        }

        self.assemblies.push(Assembly { from: addr,
                                        token,
                                        buf: m.payload.0,
                                        next: 1,
                                        last_touch: now });
        Fed::More
      },
      | Some(ix) => {
        if block.num() != self.assemblies[ix].next {
          log::debug!("block {} from {} arrived expecting {}, dropping",
                      block.num(),
                      addr,
                      self.assemblies[ix].next);
          return Fed::Ignored;
        }

        let a = &mut self.assemblies[ix];
        let mut m = msg.unwrap();

        a.buf.extend(&m.payload.0);
        a.next += 1;
        a.last_touch = now;

        if a.buf.len() > self.max_message_size {
          self.assemblies.remove(ix);
          return Fed::Overflow(token);
        }

        if block.more() {
          Fed::More
        } else {
          let a = self.assemblies.remove(ix);
          m.payload = Payload(a.buf);
          strip_block_options(&mut m);
          Fed::Done(m)
        }
      },
    }
  }

  /// Forget assemblies the peer stopped feeding
  pub fn prune(&mut self, now: Instant<C>, idle: Millis) {
    let before = self.assemblies.len();
    self.assemblies.retain(|a| age(now, a.last_touch) < idle);

    if self.assemblies.len() < before {
      log::debug!("dropped {} idle blockwise assemblies",
                  before - self.assemblies.len());
    }
  }

  /// Number of partially received transfers
  pub fn len(&self) -> usize {
    self.assemblies.len()
  }

  /// Are there no partially received transfers?
  pub fn is_empty(&self) -> bool {
    self.assemblies.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use embedded_time::rate::Fraction;
  use no_std_net::{Ipv4Addr, SocketAddrV4};
  use tadpole_msg::{Code, Type};

  use super::*;

  struct FakeClock;
  impl embedded_time::Clock for FakeClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);

    fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
      Ok(Instant::new(0))
    }
  }

  fn at(ms: u64) -> Instant<FakeClock> {
    Instant::new(ms)
  }

  fn peer() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 5683))
  }

  fn put(token: Token, payload: &[u8]) -> Message {
    let mut m = Message::new(Type::Con, Code::PUT, Id(100), token);
    m.payload = Payload(payload.to_vec());
    m
  }

  #[test]
  fn upload_slices_into_ceil_len_over_size_blocks() {
    let payload = (0..50u8).collect::<Vec<_>>();
    let mut out = Outbound::default();

    let first = out.start(Addrd(put(Token::from([1]), &payload), peer()), 16, at(0));

    let b = first.data().block1().unwrap();
    assert_eq!((b.num(), b.more(), b.size()), (0, true, 16));
    assert_eq!(first.data().payload.as_bytes(), &payload[..16]);
    assert_eq!(first.data().id, Id(100));

    let mut reassembled = first.data().payload.as_bytes().to_vec();

    for n in 1..4u32 {
      let m = out.continue_for(peer(), Token::from([1]), Block::new(16, n, true), at(0))
                 .unwrap();
      let b = m.data().block1().unwrap();
      assert_eq!(b.num(), n);
      assert_eq!(b.more(), n < 3);
      assert_eq!(m.data().id, Id(100 + n as u16));
      reassembled.extend(m.data().payload.as_bytes());
    }

    // 50 bytes at block size 16: blocks of 16, 16, 16, 2
    assert_eq!(reassembled, payload);
    assert!(out.is_empty());
  }

  #[test]
  fn responses_are_sliced_under_block2() {
    let mut m = Message::new(Type::Non, Code::CONTENT, Id(3), Token::from([9]));
    m.payload = Payload(vec![0; 40]);

    let mut out = Outbound::default();
    let first = out.start(Addrd(m, peer()), 32, at(0));

    assert!(first.data().block1().is_none());
    assert_eq!(first.data().block2().map(|b| (b.num(), b.more())),
               Some((0, true)));
  }

  #[test]
  fn out_of_range_request_drops_transfer() {
    let mut out = Outbound::default();
    out.start(Addrd(put(Token::from([1]), &[0; 40]), peer()), 16, at(0));

    assert_eq!(out.continue_for(peer(), Token::from([1]), Block::new(16, 9, false), at(0)),
               None);
    assert!(out.is_empty());
  }

  #[test]
  fn empty_token_ack_matches_by_address() {
    let mut out = Outbound::default();
    out.start(Addrd(put(Token::from([1]), &[0; 40]), peer()), 16, at(0));

    let m = out.continue_for(peer(), Token(Default::default()), Block::new(16, 1, true), at(0));
    assert_eq!(m.unwrap().data().block1().map(|b| b.num()), Some(1));
  }

  #[test]
  fn outbound_prune_drops_idle_transfers() {
    let mut out = Outbound::default();
    out.start(Addrd(put(Token::from([1]), &[0; 40]), peer()), 16, at(0));

    out.prune(at(59_999), Millis::new(60_000));
    assert_eq!(out.len(), 1);

    out.prune(at(60_000), Millis::new(60_000));
    assert!(out.is_empty());
  }

  fn fragment(token: Token, size: u16, n: u32, more: bool, payload: &[u8]) -> Addrd<Message> {
    let mut m = put(token, payload);
    m.set_block1(size, n, more).unwrap();
    Addrd(m, peer())
  }

  #[test]
  fn in_order_fragments_reassemble() {
    let mut inb = Inbound::new(4096);
    let tok = Token::from([7]);

    assert_eq!(inb.feed(fragment(tok, 16, 0, true, &[1; 16]), Block::new(16, 0, true), at(0)),
               Fed::More);
    assert_eq!(inb.feed(fragment(tok, 16, 1, true, &[2; 16]), Block::new(16, 1, true), at(1)),
               Fed::More);

    let fed = inb.feed(fragment(tok, 16, 2, false, &[3; 4]),
                       Block::new(16, 2, false),
                       at(2));

    match fed {
      | Fed::Done(m) => {
        let mut expect = vec![1u8; 16];
        expect.extend([2; 16]);
        expect.extend([3; 4]);
        assert_eq!(m.payload.as_bytes(), &expect);
        // the block option is engine plumbing, not application data
        assert!(m.block1().is_none());
      },
      | other => panic!("expected Done, got {:?}", other),
    }

    assert!(inb.is_empty());
  }

  #[test]
  fn out_of_order_fragment_dropped_without_killing_assembly() {
    let mut inb = Inbound::new(4096);
    let tok = Token::from([7]);

    inb.feed(fragment(tok, 16, 0, true, &[1; 16]), Block::new(16, 0, true), at(0));

    // skip ahead: dropped
    assert_eq!(inb.feed(fragment(tok, 16, 3, true, &[9; 16]), Block::new(16, 3, true), at(1)),
               Fed::Ignored);
    // replay of block 0: dropped
    assert_eq!(inb.feed(fragment(tok, 16, 0, true, &[1; 16]), Block::new(16, 0, true), at(2)),
               Fed::Ignored);

    // the expected one still lands
    assert_eq!(inb.feed(fragment(tok, 16, 1, true, &[2; 16]), Block::new(16, 1, true), at(3)),
               Fed::More);
  }

  #[test]
  fn mid_transfer_fragment_with_no_assembly_dropped() {
    let mut inb = Inbound::<FakeClock>::new(4096);
    assert_eq!(inb.feed(fragment(Token::from([7]), 16, 2, true, &[1; 16]),
                        Block::new(16, 2, true),
                        at(0)),
               Fed::Ignored);
    assert!(inb.is_empty());
  }

  #[test]
  fn sole_block_passes_straight_through() {
    let mut inb = Inbound::<FakeClock>::new(4096);
    let fed = inb.feed(fragment(Token::from([7]), 16, 0, false, &[1; 4]),
                       Block::new(16, 0, false),
                       at(0));

    assert!(matches!(fed, Fed::Done(_)));
    assert!(inb.is_empty());
  }

  #[test]
  fn overflow_abandons_assembly() {
    let mut inb = Inbound::new(24);
    let tok = Token::from([7]);

    assert_eq!(inb.feed(fragment(tok, 16, 0, true, &[1; 16]), Block::new(16, 0, true), at(0)),
               Fed::More);
    assert_eq!(inb.feed(fragment(tok, 16, 1, true, &[2; 16]), Block::new(16, 1, true), at(1)),
               Fed::Overflow(tok));
    assert!(inb.is_empty());
  }

  #[test]
  fn inbound_prune_drops_idle_assemblies() {
    let mut inb = Inbound::new(4096);
    inb.feed(fragment(Token::from([7]), 16, 0, true, &[1; 16]),
             Block::new(16, 0, true),
             at(0));

    inb.prune(at(30_000), Millis::new(60_000));
    assert_eq!(inb.len(), 1);

    inb.prune(at(60_000), Millis::new(60_000));
    assert!(inb.is_empty());
  }
}
