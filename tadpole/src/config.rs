use embedded_time::duration::Milliseconds;

use crate::retry::{Attempts, Strategy};
use crate::time::Millis;

/// Configuration options related to outbound CON messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Con {
  /// Retry strategy for CON messages that
  /// have not yet been ACKed.
  ///
  /// Defaults to an exponential strategy whose initial delay is
  /// drawn from 2 to 3 seconds (the protocol's ACK timeout times a
  /// randomization factor of up to 1.5):
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use tadpole::config::Con;
  /// use tadpole::retry::Strategy;
  ///
  /// assert_eq!(Con::default().retry_strategy,
  ///            Strategy::Exponential { init_min: Milliseconds(2_000),
  ///                                    init_max: Milliseconds(3_000) });
  /// ```
  pub retry_strategy: Strategy,

  /// Number of times we are allowed to resend a CON message
  /// before giving up and surfacing a timeout.
  ///
  /// [`Attempts`]`(0)` disables retransmission entirely: confirmables
  /// are sent once and never tracked.
  ///
  /// Defaults to 4 attempts.
  /// ```
  /// use tadpole::config::Con;
  /// use tadpole::retry::Attempts;
  ///
  /// assert_eq!(Con::default().max_attempts, Attempts(4));
  /// ```
  pub max_attempts: Attempts,

  /// Maximum number of unacked CON messages that may be in
  /// flight at a given moment; sends beyond this fail with `Full`.
  ///
  /// Defaults to 16.
  pub max_in_flight: usize,
}

/// Configuration options related to suppressing repeated receptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dedup {
  /// How long a `(peer, message id)` pair stays on record.
  /// A repeat reception inside this window is dropped.
  ///
  /// Defaults to 60 seconds.
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use tadpole::config::Dedup;
  ///
  /// assert_eq!(Dedup::default().window, Milliseconds(60_000u64));
  /// ```
  pub window: Millis,

  /// Bound on the number of records; a fresh reception into a full
  /// store evicts the oldest record.
  ///
  /// Defaults to 32.
  pub capacity: usize,
}

/// Configuration options related to blockwise transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block {
  /// Payloads longer than this are sent in blocks of this size.
  /// Must be a power of two from 16 to 1024.
  ///
  /// Defaults to 512.
  pub block_size: u16,

  /// Upper bound on the reassembled size of an inbound blockwise
  /// message; a transfer growing beyond it is abandoned and
  /// surfaced as an error.
  ///
  /// Defaults to 4096.
  pub max_message_size: usize,

  /// Idle time after which a partially received or partially sent
  /// blockwise transfer is forgotten.
  ///
  /// Defaults to 60 seconds.
  pub idle_timeout: Millis,
}

impl Default for Con {
  fn default() -> Self {
    Con { retry_strategy: Strategy::Exponential { init_min: Milliseconds(2_000),
                                                  init_max: Milliseconds(3_000) },
          max_attempts: Attempts(4),
          max_in_flight: 16 }
  }
}

impl Default for Dedup {
  fn default() -> Self {
    Dedup { window: Milliseconds(60_000),
            capacity: 32 }
  }
}

impl Default for Block {
  fn default() -> Self {
    Block { block_size: 512,
            max_message_size: 4096,
            idle_timeout: Milliseconds(60_000) }
  }
}

/// Runtime config
///
/// The compile-time knobs of classic embedded CoAP stacks
/// (ack timeout, retransmit count, block sizes, ...) are all plain
/// data here, owned by each engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Config {
  /// See [`Con`]
  pub con: Con,
  /// See [`Dedup`]
  pub dedup: Dedup,
  /// See [`Block`]
  pub block: Block,
}
