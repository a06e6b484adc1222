use toad_array::Array;
use toad_len::Len;

use crate::*;

/// Trait allowing fallible conversion into bytes
pub trait TryIntoBytes {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to convert into a collection of bytes
  ///
  /// ```
  /// use tadpole_msg::{Code, Id, Token, TryIntoBytes, Type};
  ///
  /// let msg = tadpole_msg::alloc::Message::new(Type::Non,
  ///                                            Code::GET,
  ///                                            Id(77),
  ///                                            Token(Default::default()));
  ///
  /// let bytes: Vec<u8> = msg.try_into_bytes().unwrap();
  /// ```
  fn try_into_bytes<C: Array<Item = u8>>(self) -> Result<C, Self::Error>;
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageToBytesError {
  /// Reserved capacity was not enough for size of message
  TooLong {
    /// Capacity of the fixed-size output collection
    capacity: usize,
    /// Actual encoded size of the message
    size: usize,
  },

  /// The header's option-count nibble can only count to 15,
  /// Fenceposts included
  TooManyOptions(usize),

  /// An option value was longer than 270, which one extended
  /// length byte cannot express
  OptionValueTooLong(usize),

  /// Reset messages carry no token, no options and no payload
  InvalidHeader,
}

/// Walk the options of a message in wire order: ascending number,
/// the token woven in as option 11, and Fencepost options bridging
/// every gap wider than a 4-bit delta.
///
/// `f` is called once per option that would be emitted (Fenceposts
/// included, with an empty value), with the delta against the
/// previously emitted number.
pub(crate) fn for_each_wire_opt<O, F>(opts: &O, token: &Token, mut f: F)
  where O: OptionMap,
        F: FnMut(OptDelta, &[u8])
{
  let mut prev = 0u32;

  let mut emit = |num: u32, value: &[u8], f: &mut F| {
    debug_assert!(num >= prev);

    while num.saturating_sub(prev) > 14 {
      // the next Fencepost is the next multiple of 14, at most prev + 14
      let post = prev + (14 - prev % 14);
      f(OptDelta((post - prev) as u16), &[]);
      prev = post;
    }

    f(OptDelta(num.saturating_sub(prev) as u16), value);
    prev = num;
  };

  let mut wove_token = false;

  for (num, values) in opts.iter() {
    let OptNumber(n) = *num;

    // the token field is authoritative; stray map entries at its
    // number are not emitted
    if n == no_repeat::TOKEN.0 {
      continue;
    }

    if !wove_token && n > no_repeat::TOKEN.0 && !token.is_empty() {
      emit(no_repeat::TOKEN.0, &token.0, &mut f);
      wove_token = true;
    }

    for v in values.iter() {
      emit(n, &v.0, &mut f);
    }
  }

  if !wove_token && !token.is_empty() {
    emit(no_repeat::TOKEN.0, &token.0, &mut f);
  }
}

/// Append one encoded option (header byte, optional extended length
/// byte, value) to `bytes`.
pub(crate) fn extend_opt_bytes(delta: OptDelta, value: &[u8], bytes: &mut impl Extend<u8>) {
  let (len, len_ext) = opt_len_nibble(value.len() as u16);

  bytes.extend(Some((delta.0 as u8) << 4 | len));

  if let Some(ext) = len_ext {
    bytes.extend(Some(ext));
  }

  bytes.extend(value.iter().copied());
}

pub(crate) fn opt_len_nibble(len: u16) -> (u8, Option<u8>) {
  match len {
    | n if n >= 15 => (15, Some((n - 15) as u8)),
    | n => (n as u8, None),
  }
}

impl<PayloadBytes: Array<Item = u8>, Options: OptionMap> TryIntoBytes
  for Message<PayloadBytes, Options>
{
  type Error = MessageToBytesError;

  fn try_into_bytes<C: Array<Item = u8>>(self) -> Result<C, Self::Error> {
    if self.ty == Type::Reset
       && (self.opts.len() > 0 || self.payload.0.len() > 0 || !self.token.is_empty())
    {
      return Err(Self::Error::InvalidHeader);
    }

    // one walk sizes everything: option count for the header
    // nibble, the longest value, and the encoded option bytes
    let mut count = 0usize;
    let mut longest = 0usize;
    let mut opts_size = 0usize;
    for_each_wire_opt(&self.opts, &self.token, |_, value| {
      let len_ext_size = if value.len() >= 15 { 1 } else { 0 };
      count += 1;
      longest = longest.max(value.len());
      opts_size += 1 + len_ext_size + value.len();
    });

    if longest > 270 {
      return Err(Self::Error::OptionValueTooLong(longest));
    }

    if count > 15 {
      return Err(Self::Error::TooManyOptions(count));
    }

    let size: usize = 4 + opts_size + self.payload.0.len();
    let mut bytes = C::reserve(size);

    if let Some(capacity) = C::CAPACITY {
      if capacity < size {
        return Err(Self::Error::TooLong { capacity, size });
      }
    }

    let byte1: u8 = Byte1 { ver: self.ver,
                            ty: self.ty,
                            opt_count: count as u8 }.into();

    bytes.extend(Some(byte1));
    bytes.extend(Some(self.code.0));
    bytes.extend(self.id.0.to_be_bytes());

    for_each_wire_opt(&self.opts, &self.token, |delta, value| {
      extend_opt_bytes(delta, value, &mut bytes);
    });

    bytes.extend(self.payload.0);

    Ok(bytes)
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let count = b.opt_count & 0b1111;

    ver | ty | count
  }
}
