use embedded_time::Instant;
use std_alloc::vec::Vec;
use tadpole_msg::Id;

use crate::net::Addrd;
use crate::time::{age, Clock, Millis, Stamped};

/// Result of [`Seen::check_and_record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Freshness {
  /// First sighting of this `(peer, message id)` pair within the
  /// window; it has been recorded.
  Fresh,
  /// The pair is already on record; this reception is a
  /// retransmission and should be dropped.
  Duplicate,
}

/// Short-term memory of recently received `(peer, message id)`
/// pairs.
///
/// The key is exactly that pair; message type and token deliberately
/// play no part, since a retransmission may be reordered against
/// other traffic but keeps its id.
///
/// Records age out after a fixed window. The store is bounded; a
/// fresh insertion into a full store evicts the record with the
/// oldest first-seen time.
#[derive(Debug)]
pub struct Seen<C: Clock> {
  window: Millis,
  capacity: usize,
  seen: Vec<Stamped<C, Addrd<Id>>>,
}

impl<C: Clock> Seen<C> {
  /// Create a store remembering at most `capacity` pairs for
  /// `window` milliseconds each
  pub fn new(window: Millis, capacity: usize) -> Self {
    Self { window,
           capacity,
           seen: Vec::with_capacity(capacity) }
  }

  /// If `key` is on record and inside the window, yield
  /// [`Freshness::Duplicate`]; otherwise record it as first seen
  /// at `now`.
  ///
  /// Duplicates do *not* refresh the record's timestamp, so a
  /// steady stream of retransmissions cannot keep a record alive
  /// past its window.
  pub fn check_and_record(&mut self, key: Addrd<Id>, now: Instant<C>) -> Freshness {
    match self.seen.iter().position(|rec| *rec.data() == key) {
      | Some(ix) if age(now, self.seen[ix].time()) < self.window => Freshness::Duplicate,
      | Some(ix) => {
        // window elapsed; the pair counts as brand new
        self.seen.remove(ix);
        self.record(key, now);
        Freshness::Fresh
      },
      | None => {
        self.record(key, now);
        Freshness::Fresh
      },
    }
  }

  /// Remove every record older than the window
  pub fn reap(&mut self, now: Instant<C>) {
    let window = self.window;
    self.seen.retain(|rec| age(now, rec.time()) < window);
  }

  /// Number of live records
  pub fn len(&self) -> usize {
    self.seen.len()
  }

  /// Is the store empty?
  pub fn is_empty(&self) -> bool {
    self.seen.is_empty()
  }

  fn record(&mut self, key: Addrd<Id>, now: Instant<C>) {
    if self.seen.len() >= self.capacity {
      // insertions happen in time order, so the front is the
      // oldest first-seen record
      let evicted = self.seen.remove(0);
      log::debug!("dedup store full, evicting {:?}", evicted.data());
    }

    self.seen.push(Stamped(key, now));
  }
}
