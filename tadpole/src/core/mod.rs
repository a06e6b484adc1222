use embedded_time::Instant;
use std_alloc::vec::Vec;
use tadpole_msg::{valid, Code, CodeKind, Id, TryFromBytes, TryIntoBytes, Type};

use crate::block::{self, Fed};
use crate::config::Config;
use crate::dedup::{Freshness, Seen};
use crate::net::{Addrd, Transmit};
use crate::retrans::Retrans;
use crate::retry::RetryTimer;
use crate::time::Clock;

/// Core errors
pub mod error;
pub use error::*;

/// The logical message the engine works in terms of
pub type Message = tadpole_msg::alloc::Message;

/// Something the application should know about, produced by
/// [`Core::handle_rx`] or [`Core::tick`]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  /// A complete logical message arrived (blockwise transfers are
  /// withheld until whole)
  Msg(Addrd<Message>),
  /// A confirmable we sent was acknowledged by its exchange id
  Acked(Addrd<Id>),
  /// A peer reset the addressed exchange
  Reset(Addrd<Id>),
  /// A confirmable exhausted its retransmissions; the peer should
  /// be presumed unreachable
  TimedOut(Addrd<Id>),
}

/// The protocol engine: encodes and decodes datagrams, keeps
/// confirmables alive until acknowledged, suppresses repeated
/// receptions, and slices / reassembles oversized payloads.
///
/// Single-threaded and non-blocking by construction: it owns no
/// socket and no clock, and every entry point takes `now` from the
/// host. Drive it from one execution context by calling
/// [`Core::send`], [`Core::handle_rx`] for every inbound datagram,
/// and [`Core::tick`] on a timer cadence (a few hundred
/// milliseconds is plenty). Independent engine instances are fully
/// isolated from one another.
#[derive(Debug)]
pub struct Core<Clk: Clock, Tx: Transmit> {
  cfg: Config,
  tx: Tx,
  retrans: Retrans<Clk>,
  dedup: Seen<Clk>,
  blocks_in: block::Inbound<Clk>,
  blocks_out: block::Outbound<Clk>,
}

impl<Clk: Clock, Tx: Transmit> Core<Clk, Tx> {
  /// Create an engine sending through `tx`
  pub fn new(tx: Tx, cfg: Config) -> Self {
    Self { tx,
           retrans: Retrans::new(cfg.con.max_in_flight),
           dedup: Seen::new(cfg.dedup.window, cfg.dedup.capacity),
           blocks_in: block::Inbound::new(cfg.block.max_message_size),
           blocks_out: block::Outbound::default(),
           cfg }
  }

  /// The configuration this engine was created with
  pub fn config(&self) -> &Config {
    &self.cfg
  }

  /// Encode and transmit a message.
  ///
  /// Confirmables are registered for retransmission until the peer
  /// acknowledges (unless retransmission is configured off). A
  /// request or response whose payload exceeds the configured block
  /// size is sent as its first block only; the rest is retained and
  /// served as the peer acknowledges.
  ///
  /// On error, nothing is retained: the caller still owns the
  /// conversation and may retry.
  pub fn send(&mut self, msg: Addrd<Message>, now: Instant<Clk>) -> Result<(), SendError<Tx::Error>> {
    valid::validate(msg.data()).map_err(SendError::Invalid)?;

    let oversized = msg.data().payload.0.len() > usize::from(self.cfg.block.block_size);
    let sliceable = matches!(msg.data().code.kind(),
                             CodeKind::Request | CodeKind::Response);

    let msg = if oversized && sliceable {
      log::debug!("{} byte payload for {} exceeds block size {}, sending blockwise",
                  msg.data().payload.0.len(),
                  msg.addr(),
                  self.cfg.block.block_size);
      self.blocks_out.start(msg, self.cfg.block.block_size, now)
    } else {
      msg
    };

    self.transmit_msg(msg, now)
  }

  /// Process one inbound datagram, yielding at most one
  /// application event.
  ///
  /// `None` means the engine consumed the datagram itself: it was a
  /// repeat reception, or a fragment of a still-incomplete blockwise
  /// transfer.
  pub fn handle_rx(&mut self,
                   dgram: Addrd<&[u8]>,
                   now: Instant<Clk>)
                   -> Result<Option<Event>, Error<Tx::Error>> {
    let addr = dgram.addr();
    let msg = Message::try_from_bytes(dgram.data()).map_err(Error::Parse)?;

    if msg.ver.0 != 1 {
      return Err(Error::Invalid(tadpole_msg::InvalidMessage::BadVersion(msg.ver.0)));
    }

    if self.dedup.check_and_record(Addrd(msg.id, addr), now) == Freshness::Duplicate {
      log::debug!("suppressed duplicate {:?} from {}", msg.id, addr);
      return Ok(None);
    }

    match msg.ty {
      | Type::Ack | Type::Reset => self.handle_rx_ack(msg, addr, now),
      | Type::Con | Type::Non => self.handle_rx_msg(msg, addr, now),
    }
  }

  /// Drive time forward: fire due retransmissions, reap the
  /// duplicate window, age out idle blockwise state.
  ///
  /// Yields a [`Event::TimedOut`] for every confirmable whose
  /// attempts ran out.
  pub fn tick(&mut self, now: Instant<Clk>) -> Result<Vec<Event>, Error<Tx::Error>> {
    let Self { retrans, tx, .. } = self;

    let timed_out = retrans.tick(now, |dgram| tx.transmit(dgram))
                           .map_err(Error::Transmit)?;

    self.dedup.reap(now);
    self.blocks_in.prune(now, self.cfg.block.idle_timeout);
    self.blocks_out.prune(now, self.cfg.block.idle_timeout);

    Ok(timed_out.into_iter().map(Event::TimedOut).collect())
  }

  fn handle_rx_ack(&mut self,
                   msg: Message,
                   addr: no_std_net::SocketAddr,
                   now: Instant<Clk>)
                   -> Result<Option<Event>, Error<Tx::Error>> {
    let key = Addrd(msg.id, addr);

    if !self.retrans.ack(key) {
      log::trace!("{:?} from {} addressed nothing in flight", msg.ty, addr);
    }

    if msg.ty == Type::Ack {
      // a Block option on the acknowledgement asks us for the next
      // piece of an outbound blockwise transfer
      if let Some(block) = msg.block1().or_else(|| msg.block2()) {
        if let Some(next) = self.blocks_out.continue_for(addr, msg.token, block, now) {
          self.transmit_msg(next, now)?;
        }
      }
    }

    if msg.code == Code::EMPTY {
      Ok(Some(match msg.ty {
           | Type::Ack => Event::Acked(key),
           | _ => Event::Reset(key),
         }))
    } else {
      // a response piggybacked on the acknowledgement
      Ok(Some(Event::Msg(Addrd(msg, addr))))
    }
  }

  fn handle_rx_msg(&mut self,
                   msg: Message,
                   addr: no_std_net::SocketAddr,
                   now: Instant<Clk>)
                   -> Result<Option<Event>, Error<Tx::Error>> {
    match msg.block1().or_else(|| msg.block2()) {
      | Some(block) => match self.blocks_in.feed(Addrd(msg, addr), block, now) {
        | Fed::Done(whole) => Ok(Some(Event::Msg(Addrd(whole, addr)))),
        | Fed::More | Fed::Ignored => Ok(None),
        | Fed::Overflow(token) => Err(Error::BlockwiseTooLarge(Addrd(token, addr))),
      },
      | None => Ok(Some(Event::Msg(Addrd(msg, addr)))),
    }
  }

  /// Encode, transmit, and (for confirmables) register for
  /// retransmission.
  fn transmit_msg(&mut self,
                  msg: Addrd<Message>,
                  now: Instant<Clk>)
                  -> Result<(), SendError<Tx::Error>> {
    let addr = msg.addr();
    let (id, ty) = (msg.data().id, msg.data().ty);

    let bytes: Vec<u8> = msg.unwrap().try_into_bytes().map_err(SendError::ToBytes)?;

    self.tx
        .transmit(Addrd(bytes.as_slice(), addr))
        .map_err(SendError::Transmit)?;

    if ty == Type::Con && self.cfg.con.max_attempts.0 > 0 {
      let timer = RetryTimer::new(now, self.cfg.con.retry_strategy, self.cfg.con.max_attempts);
      self.retrans
          .register(Addrd(bytes, addr), id, timer)
          .map_err(|_| SendError::Full)?;
    }

    Ok(())
  }
}
