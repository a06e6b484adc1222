use embedded_time::Instant;

/// A duration, in milliseconds
pub type Millis = embedded_time::duration::Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Milliseconds elapsed between two instants, saturating to zero
/// when `then` is not actually in the past.
pub(crate) fn age<C: Clock>(now: Instant<C>, then: Instant<C>) -> Millis {
  now.checked_duration_since(&then)
     .and_then(|d| Millis::try_from(d).ok())
     .unwrap_or(Millis::new(0))
}

/// Data associated with a timestamp
pub struct Stamped<C: Clock, T>(pub T, pub Instant<C>);

impl<C: Clock, T: core::fmt::Debug> core::fmt::Debug for Stamped<C, T> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let ms = Millis::try_from(self.1.duration_since_epoch()).map(|ms| ms.0)
                                                            .unwrap_or(0);

    f.debug_tuple("Stamped").field(&self.0).field(&ms).finish()
  }
}

impl<C: Clock, T: PartialEq> PartialEq for Stamped<C, T> {
  fn eq(&self, other: &Self) -> bool {
    self.0 == other.0 && self.1 == other.1
  }
}

impl<C: Clock, T: Eq> Eq for Stamped<C, T> {}

impl<C: Clock, T: Clone> Clone for Stamped<C, T> {
  fn clone(&self) -> Self {
    Self(self.0.clone(), self.1)
  }
}

impl<C: Clock, T: Copy> Copy for Stamped<C, T> {}

impl<C: Clock, T> Stamped<C, T> {
  /// Borrow the data
  pub fn data(&self) -> &T {
    &self.0
  }

  /// When the data was stamped
  pub fn time(&self) -> Instant<C> {
    self.1
  }

  /// Discard the timestamp
  pub fn discard_timestamp(self) -> T {
    self.0
  }
}
