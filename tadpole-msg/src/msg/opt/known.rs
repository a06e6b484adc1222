use tinyvec::ArrayVec;

use super::OptNumber;

/// Options that appear at most once per message
pub mod no_repeat {
  use super::OptNumber;

  #[allow(missing_docs)]
  pub const CONTENT_TYPE: OptNumber = OptNumber(1);
  #[allow(missing_docs)]
  pub const MAX_AGE: OptNumber = OptNumber(2);
  #[allow(missing_docs)]
  pub const PROXY_URI: OptNumber = OptNumber(3);
  #[allow(missing_docs)]
  pub const HOST: OptNumber = OptNumber(5);
  #[allow(missing_docs)]
  pub const LOCATION_QUERY: OptNumber = OptNumber(8);
  #[allow(missing_docs)]
  pub const PORT: OptNumber = OptNumber(7);
  #[allow(missing_docs)]
  pub const OBSERVE: OptNumber = OptNumber(10);

  /// The message token travels as an ordinary option in this draft
  /// of the protocol. [`Message`](crate::Message) lifts it out into
  /// its own field; the codec weaves it back in on encode.
  pub const TOKEN: OptNumber = OptNumber(11);

  #[allow(missing_docs)]
  pub const BLOCK2: OptNumber = OptNumber(17);
  #[allow(missing_docs)]
  pub const BLOCK1: OptNumber = OptNumber(19);
}

/// Options that may appear any number of times per message
pub mod repeat {
  use super::OptNumber;

  #[allow(missing_docs)]
  pub const ETAG: OptNumber = OptNumber(4);
  #[allow(missing_docs)]
  pub const LOCATION_PATH: OptNumber = OptNumber(6);
  #[allow(missing_docs)]
  pub const PATH: OptNumber = OptNumber(9);
  #[allow(missing_docs)]
  pub const QUERY: OptNumber = OptNumber(15);
}

/// The first Fencepost number.
///
/// Fenceposts are zero-length placeholder options at multiples of 14,
/// inserted on the wire wherever the gap between two real option
/// numbers cannot be expressed in a 4-bit delta. They carry no
/// information and decoding discards them.
pub const FENCEPOST: OptNumber = OptNumber(14);

impl OptNumber {
  /// Is this one of the Fencepost placeholder numbers (a nonzero
  /// multiple of 14)?
  pub fn is_fencepost(&self) -> bool {
    self.0 != 0 && self.0 % 14 == 0
  }

  /// May this option legally occur more than once in one message?
  pub fn is_repeatable(&self) -> bool {
    [repeat::ETAG,
     repeat::LOCATION_PATH,
     repeat::PATH,
     repeat::QUERY].contains(self)
  }
}

/// Three items of information are packed into a Block (Block1 or Block2)
/// option value:
/// * the size of the block ([`Block::size`])
/// * whether more blocks are following ([`Block::more`])
/// * the relative number of the block ([`Block::num`]) within a sequence
///   of blocks with the given size.
///
/// Layout is `num << 4 | more << 3 | szx` where block size is
/// `2^(szx + 4)`, serialized big-endian in the fewest bytes that hold
/// it (1 to 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block(u32);

impl Block {
  #[allow(missing_docs)]
  pub fn new(size: u16, num: u32, more: bool) -> Self {
    let size = u32::from(size.max(16).min(1024));
    let szx = (31 - size.leading_zeros()) - 4;
    Self(num << 4 | u32::from(more) << 3 | szx)
  }

  #[allow(missing_docs)]
  pub fn size(&self) -> u16 {
    let szx = (self.0 & 0b111).min(6);
    2u16.pow(szx + 4)
  }

  #[allow(missing_docs)]
  pub fn szx(&self) -> u8 {
    (self.0 & 0b111) as u8
  }

  #[allow(missing_docs)]
  pub fn more(&self) -> bool {
    (self.0 & 0b1000) >> 3 == 1
  }

  #[allow(missing_docs)]
  pub fn num(&self) -> u32 {
    self.0 >> 4
  }

  /// Read a Block from an option value of up to 3 big-endian bytes.
  ///
  /// Longer values are not a Block option and yield `None`.
  pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
    match bytes.len() {
      | 0..=3 => Some(Self(bytes.iter().fold(0u32, |n, b| n << 8 | u32::from(*b)))),
      | _ => None,
    }
  }

  /// The option value bytes for this Block: big-endian,
  /// shortest form, never empty.
  pub fn bytes(&self) -> ArrayVec<[u8; 3]> {
    let mut out = ArrayVec::new();
    if self.0 > 0xff_ff {
      out.push((self.0 >> 16) as u8);
    }
    if self.0 > 0xff {
      out.push((self.0 >> 8) as u8);
    }
    out.push(self.0 as u8);
    out
  }
}

impl From<Block> for u32 {
  fn from(b: Block) -> Self {
    b.0
  }
}

impl From<u32> for Block {
  fn from(n: u32) -> Self {
    Block(n)
  }
}
