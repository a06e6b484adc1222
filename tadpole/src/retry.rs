use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use embedded_time::Instant;
use rand::{Rng, SeedableRng};

use crate::time::{age, Clock, Millis};

/// A non-blocking timer pacing the retransmission of one in-flight
/// message.
///
/// It does not _contain_ the work to be done (the packet bytes live
/// next to it in the retransmission store); it only answers "is a
/// resend due, and is there any hope left?"
///
/// ```
/// use embedded_time::duration::Milliseconds;
/// use embedded_time::{Clock, Instant};
/// use tadpole::retry::{Attempts, RetryTimer, Strategy, Verdict};
///
/// # struct Tick;
/// # impl Clock for Tick {
/// #   type T = u64;
/// #   const SCALING_FACTOR: embedded_time::rate::Fraction =
/// #     embedded_time::rate::Fraction::new(1, 1000);
/// #   fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
/// #     Ok(Instant::new(0))
/// #   }
/// # }
/// let strategy = Strategy::Exponential { init_min: Milliseconds(1_000),
///                                        init_max: Milliseconds(1_000) };
/// let mut timer = RetryTimer::<Tick>::new(Instant::new(0), strategy, Attempts(2));
///
/// // nothing due yet
/// assert_eq!(timer.poll(Instant::new(999)), Err(nb::Error::WouldBlock));
/// // first resend after the initial delay
/// assert_eq!(timer.poll(Instant::new(1_000)), Ok(Verdict::Resend));
/// // second resend after double that
/// assert_eq!(timer.poll(Instant::new(2_000)), Ok(Verdict::Resend));
/// // out of attempts once the final wait elapses too
/// assert_eq!(timer.poll(Instant::new(4_000)), Ok(Verdict::GiveUp));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer<C: Clock> {
  start: Instant<C>,
  init: Millis,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

/// A number of retransmissions
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// What the owner of a [`RetryTimer`] should do with the message
/// the timer paces.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Verdict {
  /// A retransmission is due
  Resend,
  /// Attempts have been exhausted and the silence outlasted the
  /// final wait; the peer should be considered unresponsive.
  GiveUp,
}

impl<C: Clock> RetryTimer<C> {
  /// Create a new retry timer, drawing the initial delay from the
  /// strategy's range.
  ///
  /// The draw is seeded from `start`, so two timers created at
  /// different instants back off on different schedules.
  pub fn new(start: Instant<C>, strategy: Strategy, max_attempts: Attempts) -> Self {
    let init = if strategy.has_jitter() {
      let ms = Millis::try_from(start.duration_since_epoch()).map(|Milliseconds(ms)| ms)
                                                             .unwrap_or(0);
      let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(ms);
      Milliseconds(rand.gen_range(strategy.range()))
    } else {
      Milliseconds(*strategy.range().start())
    };

    Self { start,
           strategy,
           init,
           max_attempts,
           attempts: Attempts(0) }
  }

  /// Ask the timer what is due at `now`.
  ///
  /// Yields `nb::Error::WouldBlock` until the next scheduled
  /// instant, [`Verdict::Resend`] for each of the `max_attempts`
  /// retransmissions, and [`Verdict::GiveUp`] once the wait
  /// following the last retransmission has also passed.
  pub fn poll(&mut self, now: Instant<C>) -> nb::Result<Verdict, core::convert::Infallible> {
    if age(now, self.start) < self.delay_before_next() {
      return Err(nb::Error::WouldBlock);
    }

    if self.attempts >= self.max_attempts {
      return Ok(Verdict::GiveUp);
    }

    self.attempts.0 += 1;
    Ok(Verdict::Resend)
  }

  /// The instant the next [`Verdict`] becomes available
  pub fn next_attempt_at(&self) -> Instant<C> {
    self.start + self.delay_before_next()
  }

  /// Time between the start instant and the next scheduled event:
  /// after n retransmissions the next one falls due `init * 2^n`
  /// (exponential) or `init * (n + 1)` (fixed delay) past the start.
  fn delay_before_next(&self) -> Millis {
    let n = u32::from(self.attempts.0);

    match self.strategy {
      | Strategy::Exponential { .. } => Milliseconds(self.init.0 << n.min(31)),
      | Strategy::Delay { .. } => Milliseconds(self.init.0 * u64::from(n + 1)),
    }
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
  /// Draw an initial delay between `init_min` and `init_max`, then
  /// double the delay after every retransmission.
  Exponential {
    /// Minimum (inclusive) delay before the first retransmission
    init_min: Millis,
    /// Maximum (inclusive) delay before the first retransmission
    init_max: Millis,
  },
  /// Draw a delay between `min` and `max`, and wait that long
  /// between every pair of retransmissions.
  Delay {
    /// Minimum (inclusive) delay between retransmissions
    min: Millis,
    /// Maximum (inclusive) delay between retransmissions
    max: Millis,
  },
}

impl Strategy {
  /// Are min & max delays the same? if so, we should skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    match self {
      | &Self::Delay { min: Milliseconds(min),
                       max: Milliseconds(max), } => min..=max,

      | &Self::Exponential { init_min: Milliseconds(min),
                             init_max: Milliseconds(max), } => min..=max,
    }
  }
}
