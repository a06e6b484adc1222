use embedded_time::Instant;
use std_alloc::vec::Vec;
use tadpole_msg::Id;

use crate::net::Addrd;
use crate::retry::{RetryTimer, Verdict};
use crate::time::Clock;

/// The retransmission store has no free slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Full;

struct Entry<C: Clock> {
  dgram: Addrd<Vec<u8>>,
  id: Id,
  timer: RetryTimer<C>,
}

/// In-flight confirmable messages, owned as encoded datagrams until
/// the peer acknowledges them or attempts run out.
///
/// Entries keep registration order; [`Retrans::tick`] walks the due
/// ones ordered by due instant, with registration order breaking
/// ties.
pub struct Retrans<C: Clock> {
  capacity: usize,
  entries: Vec<Entry<C>>,
}

impl<C: Clock> core::fmt::Debug for Retrans<C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Retrans")
     .field("capacity", &self.capacity)
     .field("in_flight",
            &self.entries
                 .iter()
                 .map(|e| (e.id, e.dgram.addr()))
                 .collect::<Vec<_>>())
     .finish()
  }
}

impl<C: Clock> Retrans<C> {
  /// Create a store tracking at most `capacity` confirmables
  pub fn new(capacity: usize) -> Self {
    Self { capacity,
           entries: Vec::with_capacity(capacity) }
  }

  /// Take ownership of an encoded confirmable that was just
  /// transmitted, to be re-emitted on the timer's schedule.
  pub fn register(&mut self,
                  dgram: Addrd<Vec<u8>>,
                  id: Id,
                  timer: RetryTimer<C>)
                  -> Result<(), Full> {
    if self.entries.len() >= self.capacity {
      return Err(Full);
    }

    self.entries.push(Entry { dgram, id, timer });
    Ok(())
  }

  /// An acknowledgement or reset arrived for `(peer, id)`; drop the
  /// matching entry. Yields whether anything matched.
  pub fn ack(&mut self, id: Addrd<Id>) -> bool {
    match self.entries
              .iter()
              .position(|e| e.id == *id.data() && e.dgram.addr() == id.addr())
    {
      | Some(ix) => {
        self.entries.remove(ix);
        true
      },
      | None => false,
    }
  }

  /// Number of in-flight confirmables
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Is nothing in flight?
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Re-emit every due entry through `send` and collect the
  /// `(peer, id)` pairs whose attempts ran out.
  ///
  /// A transport error aborts the sweep and leaves the remaining
  /// entries untouched; they will come up again next tick.
  pub fn tick<E>(&mut self,
                 now: Instant<C>,
                 mut send: impl FnMut(Addrd<&[u8]>) -> Result<(), E>)
                 -> Result<Vec<Addrd<Id>>, E> {
    let mut due: Vec<(Instant<C>, usize)> = self.entries
                                                .iter()
                                                .enumerate()
                                                .filter(|(_, e)| e.timer.next_attempt_at() <= now)
                                                .map(|(ix, e)| (e.timer.next_attempt_at(), ix))
                                                .collect();
    due.sort();

    let mut timed_out = Vec::new();
    let mut dead = Vec::new();

    for (_, ix) in due {
      let entry = &mut self.entries[ix];

      match entry.timer.poll(now) {
        | Ok(Verdict::Resend) => {
          log::debug!("retransmitting {:?} to {}", entry.id, entry.dgram.addr());
          send(entry.dgram.as_ref().map(|bytes| bytes.as_slice()))?;
        },
        | Ok(Verdict::GiveUp) => {
          log::warn!("{:?} to {} timed out", entry.id, entry.dgram.addr());
          timed_out.push(Addrd(entry.id, entry.dgram.addr()));
          dead.push(ix);
        },
        | Err(_would_block) => (),
      }
    }

    // remove back-to-front so indices stay valid
    dead.sort_unstable_by(|a, b| b.cmp(a));
    for ix in dead {
      self.entries.remove(ix);
    }

    Ok(timed_out)
  }
}
