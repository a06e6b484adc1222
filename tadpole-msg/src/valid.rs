//! Structural validity rules that go beyond what the wire format can
//! express.
//!
//! Parsing is deliberately lenient (a peer's stray bytes should not
//! take the engine down), while outbound messages are held to the
//! rules below before they are serialized.

use toad_array::{AppendCopy, Array};
use toad_len::Len;
use toad_map::Map;

use crate::{known, CodeKind, Message, OptNumber, OptionMap, Type};

/// A specific reason a [`Message`] is not a well-formed protocol
/// message
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum InvalidMessage {
  /// The version field must be 1
  BadVersion(u8),

  /// The code is not in the defined set (see [`Code::is_defined`])
  BadCode(u8),

  /// An option value exceeds the length cap for its number
  OptionTooLong {
    /// The offending option
    num: OptNumber,
    /// Its value length
    len: usize,
  },

  /// Reset and Acknowledgement messages carry no options (the token
  /// included)
  UnexpectedOptions(Type),

  /// Reset and Acknowledgement messages carry no payload
  UnexpectedPayload(Type),

  /// A response-only option (Location-Path, Location-Query, Max-Age)
  /// appeared on a request
  ResponseOptionInRequest(OptNumber),
}

fn value_len_max(num: OptNumber) -> usize {
  match num {
    | n if n == known::no_repeat::CONTENT_TYPE => 2,
    | n if n == known::no_repeat::PORT => 2,
    | n if n == known::no_repeat::OBSERVE => 2,
    | n if n == known::no_repeat::MAX_AGE => 4,
    | n if n == known::no_repeat::BLOCK1 => 3,
    | n if n == known::no_repeat::BLOCK2 => 3,
    // everything else is capped by what one extended length byte
    // can express
    | _ => 270,
  }
}

fn response_only(num: OptNumber) -> bool {
  [known::repeat::LOCATION_PATH,
   known::no_repeat::LOCATION_QUERY,
   known::no_repeat::MAX_AGE].contains(&num)
}

/// Check every rule; the token length cap (8 bytes) is enforced by
/// [`Token`](crate::Token)'s type and needs no rule here.
pub fn validate<P, O>(msg: &Message<P, O>) -> Result<(), InvalidMessage>
  where P: Array<Item = u8> + AppendCopy<u8>,
        O: OptionMap
{
  if msg.ver.0 != 1 {
    return Err(InvalidMessage::BadVersion(msg.ver.0));
  }

  if !msg.code.is_defined() {
    return Err(InvalidMessage::BadCode(msg.code.0));
  }

  if matches!(msg.ty, Type::Ack | Type::Reset) {
    if msg.opts.len() > 0 || !msg.token.is_empty() {
      return Err(InvalidMessage::UnexpectedOptions(msg.ty));
    }

    if msg.payload.0.len() > 0 {
      return Err(InvalidMessage::UnexpectedPayload(msg.ty));
    }
  }

  for (num, values) in msg.opts.iter() {
    if msg.code.kind() == CodeKind::Request && response_only(*num) {
      return Err(InvalidMessage::ResponseOptionInRequest(*num));
    }

    for v in values.iter() {
      if v.0.len() > value_len_max(*num) {
        return Err(InvalidMessage::OptionTooLong { num: *num,
                                                   len: v.0.len() });
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{alloc, Code, Id, OptValue, Payload, Token};

  fn msg(ty: Type, code: Code) -> alloc::Message {
    alloc::Message::new(ty, code, Id(1), Token(Default::default()))
  }

  #[test]
  fn ok_message() {
    let mut m = msg(Type::Con, Code::GET);
    m.set_path("a/b").unwrap();
    assert_eq!(validate(&m), Ok(()));
  }

  #[test]
  fn bad_version() {
    let mut m = msg(Type::Con, Code::GET);
    m.ver = crate::Version(2);
    assert_eq!(validate(&m), Err(InvalidMessage::BadVersion(2)));
  }

  #[test]
  fn bad_code() {
    let m = msg(Type::Con, Code(33));
    assert_eq!(validate(&m), Err(InvalidMessage::BadCode(33)));
  }

  #[test]
  fn ack_and_reset_must_be_bare() {
    let mut m = msg(Type::Ack, Code::EMPTY);
    m.set_max_age(9).ok();
    assert_eq!(validate(&m),
               Err(InvalidMessage::UnexpectedOptions(Type::Ack)));

    let mut m = msg(Type::Reset, Code::EMPTY);
    m.payload = Payload(vec![1]);
    assert_eq!(validate(&m),
               Err(InvalidMessage::UnexpectedPayload(Type::Reset)));

    let mut m = msg(Type::Ack, Code::EMPTY);
    m.token = Token::from([1]);
    assert_eq!(validate(&m),
               Err(InvalidMessage::UnexpectedOptions(Type::Ack)));

    assert_eq!(validate(&msg(Type::Ack, Code::EMPTY)), Ok(()));
  }

  #[test]
  fn option_length_caps() {
    let mut m = msg(Type::Con, Code::PUT);
    m.set(crate::known::no_repeat::CONTENT_TYPE,
          OptValue(vec![1, 2, 3]))
     .unwrap();
    assert_eq!(validate(&m),
               Err(InvalidMessage::OptionTooLong { num: crate::known::no_repeat::CONTENT_TYPE,
                                                   len: 3 }));
  }

  #[test]
  fn response_options_rejected_on_requests() {
    let mut m = msg(Type::Con, Code::GET);
    m.set_max_age(30).unwrap();
    assert_eq!(validate(&m),
               Err(InvalidMessage::ResponseOptionInRequest(crate::known::no_repeat::MAX_AGE)));

    let mut m = msg(Type::Non, Code::CONTENT);
    m.set_max_age(30).unwrap();
    assert_eq!(validate(&m), Ok(()));
  }
}
