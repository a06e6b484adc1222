use core::iter::FromIterator;
use core::str::{from_utf8, Utf8Error};

use tinyvec::ArrayVec;
use toad_array::{AppendCopy, Array};
use toad_cursor::Cursor;
use toad_len::Len;
use toad_map::Map;

#[allow(unused_imports)]
use crate::TryIntoBytes;

/// Message Code
pub mod code;

/// Message parsing errors
pub mod parse_error;

/// Message ID
pub mod id;

/// Message Options
pub mod opt;

/// Message Type
pub mod ty;

/// Message Token
pub mod token;

/// Message Version
pub mod ver;

pub use code::*;
pub use id::*;
pub use opt::*;
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

use crate::from_bytes::TryConsumeBytes;
use crate::TryFromBytes;

/// Message payload; opaque bytes at the tail of the datagram.
///
/// Everything following the last option belongs to the payload;
/// this draft of the protocol has no payload marker byte.
#[derive(Default, Clone, Debug)]
pub struct Payload<C>(pub C);

impl<C> PartialEq for Payload<C> where C: Array<Item = u8>
{
  fn eq(&self, other: &Self) -> bool {
    self.0.iter().eq(other.0.iter())
  }
}

impl<C> Eq for Payload<C> where C: Array<Item = u8> {}

impl<C> Payload<C> where C: Array<Item = u8>
{
  /// Convert a reference to a Payload to a byte slice
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (CON, NON, ACK, RST)
/// |  |
/// |  |  Number of options in the message (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) opt_count: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let opt_count = b & 0b1111u8; // last 4 bits

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               opt_count })
  }
}

impl<PayloadBytes: Array<Item = u8>, Options: OptionMap> Len for Message<PayloadBytes, Options> {
  const CAPACITY: Option<usize> = None;

  fn len(&self) -> usize {
    let header_size = 4;
    let payload_size = self.payload.0.len();

    let mut opts_size = 0usize;
    crate::to_bytes::for_each_wire_opt(&self.opts, &self.token, |_, value| {
      let len_ext_size = if value.len() >= 15 { 1 } else { 0 };
      opts_size += 1 + len_ext_size + value.len();
    });

    header_size + opts_size + payload_size
  }

  fn is_full(&self) -> bool {
    false
  }
}

/// # CoAP Messages
/// This struct provides a high-level API for manipulating requests &
/// responses, while still being cheaply serializable to & from the
/// byte layout of draft-era CoAP messages on the wire.
///
/// ## Options
/// Options (the CoAP equivalent to HTTP headers) live in an ordered
/// map from [`OptNumber`] to one or more values, and can be
/// manipulated either with the raw [`Message::add`] / [`Message::set`]
/// surface or with typed helpers like [`Message::set_path`] (which
/// splits a `/`-delimited string into repeated Uri-Path options).
///
/// ## Token
/// The wire format carries the token as option 11, but since it is
/// a header-grade field in practice it gets its own slot here. The
/// serializer weaves it back into the option sequence.
///
/// ## Allocation
/// `Message` has no opinion about what kind of collection it uses
/// internally; it is generic over the payload byte buffer and the
/// option map, so the host chooses the allocation strategy. See
/// [`crate::alloc::Message`] for the `Vec`/`BTreeMap` pin.
#[derive(Clone, Debug)]
pub struct Message<PayloadBytes, Options> {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`opt::Opt`] for details
  pub opts: Options,
  /// see [`Payload`]
  pub payload: Payload<PayloadBytes>,
}

impl<C, O> PartialEq for Message<C, O>
  where O: OptionMap + PartialEq,
        C: Array<Item = u8>
{
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
    && self.ty == other.ty
    && self.ver == other.ver
    && self.code == other.code
    && self.token == other.token
    && self.payload == other.payload
    && self.opts == other.opts
  }
}

impl<C, O> Eq for Message<C, O>
  where O: OptionMap + PartialEq,
        C: Array<Item = u8>
{
}

/// An error occurred during a call to [`Message::add`] or [`Message::set`]
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetOptionError<OV, OVs> {
  RepeatedTooManyTimes(OV),
  TooManyOptions(OptNumber, OVs),
}

impl<PayloadBytes: Array<Item = u8> + AppendCopy<u8>, Options: OptionMap>
  Message<PayloadBytes, Options>
{
  /// Create a new message
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Self {
    Self { id,
           token,
           ty,
           code,
           ver: Version::default(),
           payload: Payload(PayloadBytes::default()),
           opts: Options::default() }
  }

  /// Create a new message that ACKs this one.
  ///
  /// The acknowledgement addresses the original exchange, so it
  /// reuses this message's [`Id`]; everything else is empty.
  pub fn ack(&self) -> Self {
    Self { id: self.id,
           token: Token(Default::default()),
           ver: Default::default(),
           ty: Type::Ack,
           code: Code::EMPTY,
           payload: Payload(Default::default()),
           opts: Default::default() }
  }

  /// Get the payload
  pub fn payload(&self) -> &Payload<PayloadBytes> {
    &self.payload
  }

  /// Set the payload, returning the old payload if there was one
  pub fn set_payload(&mut self, p: Payload<PayloadBytes>) -> Option<Payload<PayloadBytes>> {
    let mut old: Payload<_> = p;
    core::mem::swap(&mut old, &mut self.payload);
    Some(old).filter(|old| old.0.len() > 0)
  }

  /// Insert a new value for a given option, alongside any existing values.
  ///
  /// Errors when there cannot be any more options, or the option
  /// cannot be repeated any more (only applies to fixed-capacity maps)
  pub fn add(&mut self,
             n: OptNumber,
             v: OptValue<Options::OptValue>)
             -> Result<(), SetOptionError<OptValue<Options::OptValue>, Options::OptValues>> {
    match (self.remove(n).unwrap_or_default(), &mut self.opts) {
      | (vals, _) if vals.is_full() => Err(SetOptionError::RepeatedTooManyTimes(v)),
      | (vals, opts) if opts.is_full() => Err(SetOptionError::TooManyOptions(n, vals)),
      | (mut vals, opts) => {
        vals.push(v);
        opts.insert(n, vals).ok();
        Ok(())
      },
    }
  }

  /// Replace any / all existing values with a new one,
  /// yielding the previous value(s)
  pub fn set(
    &mut self,
    n: OptNumber,
    v: OptValue<Options::OptValue>)
    -> Result<Option<Options::OptValues>,
              SetOptionError<OptValue<Options::OptValue>, Options::OptValues>> {
    let old = self.remove(n);
    self.add(n, v).map(|_| old)
  }

  /// Get the number of values for a given option
  pub fn count(&self, n: OptNumber) -> usize {
    self.get(n).map(|a| a.len()).unwrap_or(0)
  }

  /// Get the value(s) of an option by number
  pub fn get(&self, n: OptNumber) -> Option<&Options::OptValues> {
    self.opts.get(&n)
  }

  /// Get the value of an option, taking the first if there are multiple.
  pub fn get_first(&self, n: OptNumber) -> Option<&OptValue<Options::OptValue>> {
    self.get(n).and_then(|vs| vs.get(0))
  }

  /// Get the value of an option, and interpret it
  /// as a UTF-8 string
  pub fn get_str(&self, n: OptNumber) -> Result<Option<&str>, Utf8Error> {
    match self.get_first(n) {
      | Some(v) => from_utf8(&v.0).map(Some),
      | _ => Ok(None),
    }
  }

  /// Get all values for an option, and interpret them as UTF-8 strings
  pub fn get_strs<'a, F>(&'a self, n: OptNumber) -> Result<F, Utf8Error>
    where F: FromIterator<&'a str>
  {
    match self.get(n) {
      | Some(vs) if vs.len() >= 1 => vs.iter().map(|s| from_utf8(&s.0)).collect(),
      | _ => Ok(core::iter::empty().collect()),
    }
  }

  /// Get the value of an option, and interpret its 0-4 bytes as a
  /// big-endian unsigned integer
  pub fn get_uint(&self, n: OptNumber) -> Option<u32> {
    self.get_first(n)
        .filter(|v| v.0.len() <= 4)
        .map(|v| v.0.iter().fold(0u32, |acc, b| acc << 8 | u32::from(*b)))
  }

  /// Remove all values for the option from this message,
  /// returning them if there were any.
  pub fn remove(&mut self, n: OptNumber) -> Option<Options::OptValues> {
    self.opts.remove(&n)
  }

  /// Update the value for the Uri-Host option,
  /// discarding any existing values.
  pub fn set_host<S>(&mut self, host: S) -> Result<(), SetError<Self>>
    where S: AsRef<str>
  {
    self.set(opt::known::no_repeat::HOST,
             host.as_ref().as_bytes().iter().copied().collect())
        .map(|_| ())
  }

  /// Get the value for the Uri-Host option
  pub fn host(&self) -> Result<Option<&str>, Utf8Error> {
    self.get_str(opt::known::no_repeat::HOST)
  }

  /// Update the value for the Uri-Port option,
  /// discarding any existing values.
  pub fn set_port(&mut self, port: u16) -> Result<(), SetError<Self>> {
    self.set(opt::known::no_repeat::PORT,
             uint_bytes(u32::from(port)).into_iter().collect())
        .map(|_| ())
  }

  /// Get the value for the Uri-Port option
  pub fn port(&self) -> Option<u16> {
    self.get_uint(opt::known::no_repeat::PORT).map(|n| n as u16)
  }

  /// Update the value for the Uri-Path option, discarding any
  /// existing values.
  ///
  /// The path is split at `/`; empty segments (including one
  /// produced by a leading `/`) are skipped.
  ///
  /// ```
  /// use tadpole_msg::alloc::Message;
  /// use tadpole_msg::{Code, Id, Token, Type};
  ///
  /// let mut msg = Message::new(Type::Con, Code::GET, Id(1), Token(Default::default()));
  ///
  /// msg.set_path("/sensors//temp").unwrap();
  /// assert_eq!(msg.path::<Vec<_>>(), Ok(vec!["sensors", "temp"]));
  /// ```
  pub fn set_path<S>(&mut self, path: S) -> Result<(), SetError<Self>>
    where S: AsRef<str>
  {
    self.remove(opt::known::repeat::PATH);
    path.as_ref()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .try_for_each(|segment| {
          self.add(opt::known::repeat::PATH,
                   segment.as_bytes().iter().copied().collect())
        })
  }

  /// Get an iterator over the Uri-Path segments
  pub fn path<'a, F>(&'a self) -> Result<F, Utf8Error>
    where F: FromIterator<&'a str>
  {
    self.get_strs(opt::known::repeat::PATH)
  }

  /// Get the fully built path, joining segments with '/'.
  #[cfg(feature = "std")]
  pub fn path_string(&self) -> Result<std::string::String, Utf8Error> {
    self.path::<Vec<_>>().map(|segs| segs.join("/"))
  }

  /// Update the values for the Uri-Query option from a single
  /// `&`-delimited string, discarding any existing values.
  ///
  /// Empty parameters (including one produced by a leading `&`)
  /// are skipped.
  pub fn set_query<S>(&mut self, query: S) -> Result<(), SetError<Self>>
    where S: AsRef<str>
  {
    self.remove(opt::known::repeat::QUERY);
    query.as_ref()
         .split('&')
         .filter(|param| !param.is_empty())
         .try_for_each(|param| self.add_query(param))
  }

  /// Insert a new value for the Uri-Query option,
  /// alongside any existing values.
  pub fn add_query<S>(&mut self, query: S) -> Result<(), SetError<Self>>
    where S: AsRef<str>
  {
    self.add(opt::known::repeat::QUERY,
             query.as_ref().as_bytes().iter().copied().collect())
  }

  /// Get all query parameters for this request
  pub fn query<'a, F>(&'a self) -> Result<F, Utf8Error>
    where F: FromIterator<&'a str>
  {
    self.get_strs(opt::known::repeat::QUERY)
  }

  /// Update the values for the Location-Path option from a single
  /// `/`-delimited string, discarding any existing values.
  pub fn set_location_path<S>(&mut self, path: S) -> Result<(), SetError<Self>>
    where S: AsRef<str>
  {
    self.remove(opt::known::repeat::LOCATION_PATH);
    path.as_ref()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .try_for_each(|segment| {
          self.add(opt::known::repeat::LOCATION_PATH,
                   segment.as_bytes().iter().copied().collect())
        })
  }

  /// Get all values for the Location-Path option
  pub fn location_path<'a, F>(&'a self) -> Result<F, Utf8Error>
    where F: FromIterator<&'a str>
  {
    self.get_strs(opt::known::repeat::LOCATION_PATH)
  }

  /// Update the value for the Location-Query option,
  /// discarding any existing values.
  pub fn set_location_query<S>(&mut self, query: S) -> Result<(), SetError<Self>>
    where S: AsRef<str>
  {
    self.set(opt::known::no_repeat::LOCATION_QUERY,
             query.as_ref().as_bytes().iter().copied().collect())
        .map(|_| ())
  }

  /// Update the value for the Content-Type option,
  /// discarding any existing values.
  pub fn set_content_type(&mut self, media_type: u16) -> Result<(), SetError<Self>> {
    self.set(opt::known::no_repeat::CONTENT_TYPE,
             uint_bytes(u32::from(media_type)).into_iter().collect())
        .map(|_| ())
  }

  /// Get the value for the Content-Type option
  pub fn content_type(&self) -> Option<u16> {
    self.get_uint(opt::known::no_repeat::CONTENT_TYPE)
        .map(|n| n as u16)
  }

  /// Update the value for the Max-Age option (in seconds),
  /// discarding any existing values.
  pub fn set_max_age(&mut self, seconds: u32) -> Result<(), SetError<Self>> {
    self.set(opt::known::no_repeat::MAX_AGE,
             uint_bytes(seconds).into_iter().collect())
        .map(|_| ())
  }

  /// Get the value for the Max-Age option, in seconds
  pub fn max_age_seconds(&self) -> Option<u32> {
    self.get_uint(opt::known::no_repeat::MAX_AGE)
  }

  /// Update the value for the Observe option,
  /// discarding any existing values.
  pub fn set_observe(&mut self, n: u16) -> Result<(), SetError<Self>> {
    self.set(opt::known::no_repeat::OBSERVE,
             uint_bytes(u32::from(n)).into_iter().collect())
        .map(|_| ())
  }

  /// Get the value for the Observe option
  pub fn observe(&self) -> Option<u16> {
    self.get_uint(opt::known::no_repeat::OBSERVE)
        .map(|n| n as u16)
  }

  /// Update the value for the Proxy-Uri option,
  /// discarding any existing values.
  pub fn set_proxy_uri<S>(&mut self, uri: S) -> Result<(), SetError<Self>>
    where S: AsRef<str>
  {
    self.set(opt::known::no_repeat::PROXY_URI,
             uri.as_ref().as_bytes().iter().copied().collect())
        .map(|_| ())
  }

  /// Get the value for the Proxy-Uri option
  pub fn proxy_uri(&self) -> Result<Option<&str>, Utf8Error> {
    self.get_str(opt::known::no_repeat::PROXY_URI)
  }

  /// Insert a new value for the ETag option,
  /// alongside any existing values.
  pub fn add_etag<B>(&mut self, tag: B) -> Result<(), SetError<Self>>
    where B: AsRef<[u8]>
  {
    self.add(opt::known::repeat::ETAG,
             tag.as_ref().iter().copied().collect())
  }

  /// Get all values for the ETag option
  pub fn etags(&self) -> Option<&Options::OptValues> {
    self.get(opt::known::repeat::ETAG)
  }

  /// Update the value for the Block1 option,
  /// discarding any existing values.
  pub fn set_block1(&mut self, size: u16, num: u32, more: bool) -> Result<(), SetError<Self>> {
    self.set(opt::known::no_repeat::BLOCK1,
             Block::new(size, num, more).bytes().into_iter().collect())
        .map(|_| ())
  }

  /// Get the value for the Block1 option
  pub fn block1(&self) -> Option<Block> {
    self.get_first(opt::known::no_repeat::BLOCK1)
        .and_then(|v| Block::from_bytes(&v.0))
  }

  /// Update the value for the Block2 option,
  /// discarding any existing values.
  pub fn set_block2(&mut self, size: u16, num: u32, more: bool) -> Result<(), SetError<Self>> {
    self.set(opt::known::no_repeat::BLOCK2,
             Block::new(size, num, more).bytes().into_iter().collect())
        .map(|_| ())
  }

  /// Get the value for the Block2 option
  pub fn block2(&self) -> Option<Block> {
    self.get_first(opt::known::no_repeat::BLOCK2)
        .and_then(|v| Block::from_bytes(&v.0))
  }
}

/// Shorthand for the [`SetOptionError`] of a given message type
pub type SetError<M> =
  SetOptionError<OptValue<<<M as HasOptions>::Options as OptionMap>::OptValue>,
                 <<M as HasOptions>::Options as OptionMap>::OptValues>;

/// Type-level helper tying a message to its option map
pub trait HasOptions {
  #[allow(missing_docs)]
  type Options: OptionMap;
}

impl<PayloadBytes, Options: OptionMap> HasOptions for Message<PayloadBytes, Options> {
  type Options = Options;
}

/// The smallest big-endian byte string holding `n`; empty when
/// `n == 0` (a zero-length option value reads back as zero).
pub(crate) fn uint_bytes(n: u32) -> ArrayVec<[u8; 4]> {
  let mut out = ArrayVec::new();
  let mut started = false;

  for shift in [24, 16, 8, 0] {
    let b = (n >> shift) as u8;
    if b != 0 || started {
      out.push(b);
      started = true;
    }
  }

  out
}

impl<Bytes: AsRef<[u8]>, PayloadBytes: Array<Item = u8> + AppendCopy<u8>, Options: OptionMap>
  TryFromBytes<Bytes> for Message<PayloadBytes, Options>
{
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let Byte1 { ver, ty, opt_count } = bytes.next()
                                            .ok_or_else(MessageParseError::eof)?
                                            .try_into()?;

    let code = Code(bytes.next().ok_or_else(MessageParseError::eof)?);
    let id: Id = Id::try_consume_bytes(&mut bytes)?;

    let mut opts = Options::default();
    let mut token = Token(Default::default());
    let mut prev = OptNumber(0);

    for ix in 0..opt_count {
      let opt = Opt::<Options::OptValue>::try_consume_bytes(&mut bytes)
                  .map_err(Self::Error::OptParseError)?;

      let OptDelta(delta) = opt.delta;
      let num = prev + OptNumber(u32::from(delta));

      if delta == 0 && ix > 0 && !num.is_repeatable() {
        return Err(Self::Error::OptParseError(OptParseError::OptionOutOfOrder(num)));
      }

      prev = num;

      if num.is_fencepost() {
        continue;
      }

      if num == opt::known::no_repeat::TOKEN {
        if opt.value.0.len() > 8 {
          return Err(Self::Error::InvalidTokenLength(opt.value.0.len() as u8));
        }
        token = Token(opt.value.0.iter().copied().collect());
        continue;
      }

      match opts.get_mut(&num) {
        | Some(values) => values.push(opt.value),
        | None => {
          if opts.is_full() {
            return Err(Self::Error::OptParseError(OptParseError::TooManyOptions(opts.len())));
          }

          let mut values = Options::OptValues::default();
          values.push(opt.value);
          opts.insert(num, values).ok();
        },
      }
    }

    let mut payload = PayloadBytes::reserve(bytes.remaining());
    payload.append_copy(bytes.take_until_end());
    let payload = Payload(payload);

    Ok(Message { id,
                 ty,
                 ver,
                 code,
                 token,
                 opts,
                 payload })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alloc;

  #[test]
  fn parse_msg() {
    let (expect, msg) = crate::test_msg();
    assert_eq!(alloc::Message::try_from_bytes(&msg).unwrap(), expect)
  }

  #[test]
  fn parse_byte1() {
    let byte = 0b_01_10_0011u8;
    let byte = Byte1::try_from(byte).unwrap();
    assert_eq!(byte,
               Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       opt_count: 3 })
  }

  #[test]
  fn parse_bare_confirmable_get() {
    let bytes = [0x41u8, 0x01, 0x12, 0x34, 0x94, b't', b'e', b'm', b'p'];
    let msg = alloc::Message::try_from_bytes(bytes).unwrap();

    assert_eq!(msg.ty, Type::Con);
    assert_eq!(msg.code, Code::GET);
    assert_eq!(msg.id, Id(0x1234));
    assert!(msg.token.is_empty());
    assert_eq!(msg.path::<Vec<_>>(), Ok(vec!["temp"]));
    assert!(msg.payload.0.is_empty());
  }

  #[test]
  fn roundtrip() {
    let mut msg = alloc::Message::new(Type::Con,
                                      Code::POST,
                                      Id(0xbeef),
                                      Token::from([1, 2, 3]));
    msg.set_path("sensors/temp/history").unwrap();
    msg.set_query("since=yesterday&units=c").unwrap();
    msg.set_content_type(42).unwrap();
    msg.set_observe(1).unwrap();
    msg.set_block2(64, 3, true).unwrap();
    msg.payload = Payload(b"hello".to_vec());

    let bytes: Vec<u8> = msg.clone().try_into_bytes().unwrap();
    let parsed = alloc::Message::try_from_bytes(&bytes).unwrap();

    assert_eq!(parsed, msg);
  }

  #[test]
  fn repeated_path_segments_parse_with_zero_deltas() {
    let mut msg = alloc::Message::new(Type::Non,
                                      Code::GET,
                                      Id(1),
                                      Token(Default::default()));
    msg.set_path("a/b/c").unwrap();

    let bytes: Vec<u8> = msg.try_into_bytes().unwrap();
    // Uri-Path (9): delta 9, then two zero deltas
    assert_eq!(&bytes[4..], &[0x91, b'a', 0x01, b'b', 0x01, b'c']);

    let parsed = alloc::Message::try_from_bytes(&bytes).unwrap();
    assert_eq!(parsed.path::<Vec<_>>(), Ok(vec!["a", "b", "c"]));
  }

  #[test]
  fn zero_delta_on_non_repeatable_option_rejected() {
    // two Content-Type options: delta 1, then delta 0
    let bytes = [0x42u8, 0x01, 0x00, 0x01, 0x11, 42, 0x01, 41];
    assert_eq!(alloc::Message::try_from_bytes(bytes),
               Err(MessageParseError::OptParseError(OptParseError::OptionOutOfOrder(OptNumber(1)))));
  }

  #[test]
  fn fencepost_erased_by_decode() {
    let bytes = [0x43u8, 0x02, 0x00, 0x01, 0x11, 42, 0xd0, 0x51, 0x00];
    let msg = alloc::Message::try_from_bytes(bytes).unwrap();

    assert_eq!(msg.content_type(), Some(42));
    assert!(msg.block1().is_some());
    assert_eq!(msg.opts.len(), 2);
    assert!(msg.get(OptNumber(14)).is_none());
  }

  #[test]
  fn token_option_lifted_out() {
    let bytes = [0x41u8, 0x01, 0x00, 0x07, 0xb2, 0xca, 0xfe];
    let msg = alloc::Message::try_from_bytes(bytes).unwrap();

    assert_eq!(msg.token, Token::from([0xca, 0xfe]));
    assert_eq!(msg.opts.len(), 0);
  }

  #[test]
  fn token_longer_than_8_rejected() {
    let mut bytes = vec![0x41u8, 0x01, 0x00, 0x07, 0xb9];
    bytes.extend(core::iter::repeat(0u8).take(9));

    assert_eq!(alloc::Message::try_from_bytes(bytes),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn short_packets_rejected() {
    // header cut short
    assert_eq!(alloc::Message::try_from_bytes([0x41u8, 0x01]),
               Err(MessageParseError::UnexpectedEndOfStream));

    // option count promises more options than there are bytes
    assert_eq!(alloc::Message::try_from_bytes([0x42u8, 0x01, 0x00, 0x01, 0x91, b'a']),
               Err(MessageParseError::OptParseError(OptParseError::UnexpectedEndOfStream)));
  }

  #[test]
  fn trailing_bytes_are_payload() {
    let bytes = [0x50u8, 0x45, 0x00, 0x09, 1, 2, 3];
    let msg = alloc::Message::try_from_bytes(bytes).unwrap();
    assert_eq!(msg.payload.as_bytes(), &[1, 2, 3]);
  }

  #[test]
  fn uint_bytes_shortest_form() {
    assert_eq!(uint_bytes(0).as_ref(), &[] as &[u8]);
    assert_eq!(uint_bytes(42).as_ref(), &[42]);
    assert_eq!(uint_bytes(0x1234).as_ref(), &[0x12, 0x34]);
    assert_eq!(uint_bytes(0x0100_0000).as_ref(), &[1, 0, 0, 0]);
  }
}
