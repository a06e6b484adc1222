use core::hash::Hash;
use core::iter::FromIterator;
use core::ops::{Add, Sub};

#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;
use tinyvec::ArrayVec;
use toad_array::{AppendCopy, Array};
use toad_cursor::Cursor;
use toad_len::Len;
use toad_map::Map;

use crate::from_bytes::TryConsumeBytes;

/// Option parsing error
pub mod parse_error;
pub use parse_error::*;

/// Well-known options
pub mod known;
pub use known::*;

/// Generalization of `BTreeMap<OptNumber, Vec<OptValue<Vec<u8>>>>`
///
/// Implementations must iterate in ascending [`OptNumber`] order;
/// the wire format requires it, and the serializer inserts Fencepost
/// options based on the gaps it sees while walking the map. The
/// provided `BTreeMap` implementation satisfies this for free; the
/// `ArrayVec` implementation relies on insertion happening in
/// ascending-number order.
pub trait OptionMap
  where Self: Map<OptNumber, Self::OptValues>
{
  /// Byte array for option values
  type OptValue: Array<Item = u8> + AppendCopy<u8>;

  /// One or more values for a given number.
  ///
  /// Note that not all options are repeatable.
  type OptValues: Array<Item = OptValue<Self::OptValue>>;
}

#[cfg(feature = "alloc")]
impl OptionMap for std_alloc::collections::BTreeMap<OptNumber, Vec<OptValue<Vec<u8>>>> {
  type OptValue = Vec<u8>;
  type OptValues = Vec<OptValue<Vec<u8>>>;
}

type ArrayVecMap<const N: usize, K, V> = ArrayVec<[(K, V); N]>;

impl<const MAX_OPTS: usize, const MAX_INSTANCES: usize, const MAX_BYTES_PER_INSTANCE: usize>
  OptionMap
  for ArrayVecMap<MAX_OPTS,
                  OptNumber,
                  ArrayVec<[OptValue<ArrayVec<[u8; MAX_BYTES_PER_INSTANCE]>>; MAX_INSTANCES]>>
{
  type OptValue = ArrayVec<[u8; MAX_BYTES_PER_INSTANCE]>;
  type OptValues = ArrayVec<[OptValue<Self::OptValue>; MAX_INSTANCES]>;
}

/// # `Opt` struct
/// Low-level representation of a single option as it sits in a
/// datagram: a delta against the previous option's number, and a
/// value.
///
/// Notably, this doesn't include the absolute Number (key, e.g.
/// "Content-Type" or "Uri-Path"). To refer to numbers we use
/// implementors of the [`OptionMap`] trait.
#[derive(Clone, Debug, Default)]
pub struct Opt<C> {
  /// See [`OptDelta`]
  pub delta: OptDelta,
  /// See [`OptValue`]
  pub value: OptValue<C>,
}

impl<C> PartialOrd for Opt<C> where C: Array<Item = u8>
{
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl<C> PartialEq for Opt<C> where C: Array<Item = u8>
{
  fn eq(&self, other: &Self) -> bool {
    self.delta.eq(&other.delta) && self.value.eq(&other.value)
  }
}

impl<C> Ord for Opt<C> where C: Array<Item = u8>
{
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    self.delta
        .cmp(&other.delta)
        .then_with(|| self.value.cmp(&other.value))
  }
}

impl<C> Eq for Opt<C> where C: Array<Item = u8> {}

impl<C: Array<Item = u8>> Opt<C> {
  /// Given a collection to [`Extend`] and an Opt, add that Opt's bytes to the collection.
  pub fn extend_bytes(self, bytes: &mut impl Extend<u8>) {
    crate::to_bytes::extend_opt_bytes(self.delta, &self.value.0, bytes);
  }
}

/// The "Option Delta" is the difference between this Option's Number
/// and the previous Option's number.
///
/// Kept in the upper nibble of the option header byte, so it can
/// never exceed 14 on the wire; gaps wider than that are bridged with
/// [Fencepost](known::FENCEPOST) options.
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug, Default)]
pub struct OptDelta(pub u16);

/// The Option Number identifies which option is being set
/// (e.g. Uri-Path has a Number of 9).
///
/// See [`known`] for the numbers this draft of the protocol assigns.
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug, Default)]
pub struct OptNumber(pub u32);

impl Add for OptNumber {
  type Output = OptNumber;

  fn add(self, rhs: Self) -> Self::Output {
    Self(self.0 + rhs.0)
  }
}

impl Sub for OptNumber {
  type Output = OptNumber;

  fn sub(self, rhs: Self) -> Self::Output {
    Self(self.0 - rhs.0)
  }
}

/// The value of an option, opaque bytes
#[derive(Default, Clone, Debug)]
pub struct OptValue<C>(pub C);

impl<C> PartialOrd for OptValue<C> where C: Array<Item = u8>
{
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    self.0.iter().partial_cmp(other.0.iter())
  }
}

impl<C> PartialEq for OptValue<C> where C: Array<Item = u8>
{
  fn eq(&self, other: &Self) -> bool {
    self.0.iter().eq(other.0.iter())
  }
}

impl<C> Ord for OptValue<C> where C: Array<Item = u8>
{
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    self.0.iter().cmp(other.0.iter())
  }
}

impl<C> Eq for OptValue<C> where C: Array<Item = u8> {}

impl<C> Hash for OptValue<C> where C: Array<Item = u8>
{
  fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
    state.write(&self.0)
  }
}

impl<C> OptValue<C> where C: Array<Item = u8>
{
  /// Convert a reference to a OptValue to a byte slice
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

impl<C> FromIterator<u8> for OptValue<C> where C: FromIterator<u8>
{
  fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
    Self(iter.into_iter().collect::<C>())
  }
}

impl<Bytes: AsRef<[u8]>, V: Array<Item = u8> + AppendCopy<u8>> TryConsumeBytes<Bytes> for Opt<V> {
  type Error = OptParseError;

  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    let byte1 = bytes.next().ok_or_else(OptParseError::eof)?;

    let delta = OptDelta(u16::from(byte1 >> 4));

    // a length nibble of 15 means "15 plus the next byte"
    let len = match byte1 & 0b1111 {
      | 15 => 15 + usize::from(bytes.next().ok_or_else(OptParseError::eof)?),
      | n => usize::from(n),
    };

    let mut value = V::reserve(len);
    value.append_copy(bytes.take(len));

    if value.len() < len {
      return Err(OptParseError::eof());
    }

    Ok(Opt { delta,
             value: OptValue(value) })
  }
}
