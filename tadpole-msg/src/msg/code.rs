/// # Message Code
///
/// A flat 8-bit value indicating if the message is empty (0),
/// a request (1-31) or a response (64 and up). Everything in between
/// is reserved.
///
/// ```
/// use tadpole_msg::{Code, CodeKind};
///
/// assert_eq!(Code::GET.kind(), CodeKind::Request);
/// assert_eq!(Code::CONTENT.kind(), CodeKind::Response);
/// assert_eq!(Code(0).kind(), CodeKind::Empty);
/// ```
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug)]
pub struct Code(pub u8);

/// Classification of a [`Code`] based on its numeric range.
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug)]
pub enum CodeKind {
  /// Code 0; carries no request or response semantics.
  /// Used by transport-level messages (bare acknowledgements,
  /// resets, pings).
  Empty,
  /// Codes 1-31; methods GET, POST, PUT, DELETE.
  Request,
  /// Codes 64-191; success and error responses.
  Response,
  /// Codes 32-63 and 192-255; not assigned by the protocol.
  Reserved,
}

#[allow(missing_docs)]
impl Code {
  pub const EMPTY: Code = Code(0);

  // Methods
  pub const GET: Code = Code(1);
  pub const POST: Code = Code(2);
  pub const PUT: Code = Code(3);
  pub const DELETE: Code = Code(4);

  // Success responses
  pub const CREATED: Code = Code(65);
  pub const DELETED: Code = Code(66);
  pub const VALID: Code = Code(67);
  pub const CHANGED: Code = Code(68);
  pub const CONTENT: Code = Code(69);

  // Client error responses
  pub const BAD_REQUEST: Code = Code(128);
  pub const UNAUTHORIZED: Code = Code(129);
  pub const BAD_OPTION: Code = Code(130);
  pub const FORBIDDEN: Code = Code(131);
  pub const NOT_FOUND: Code = Code(132);
  pub const METHOD_NOT_ALLOWED: Code = Code(133);
  pub const NOT_ACCEPTABLE: Code = Code(134);
  pub const PRECONDITION_FAILED: Code = Code(140);
  pub const REQUEST_ENTITY_TOO_LARGE: Code = Code(141);
  pub const UNSUPPORTED_MEDIA_TYPE: Code = Code(143);

  // Server error responses
  pub const INTERNAL_SERVER_ERROR: Code = Code(160);
  pub const NOT_IMPLEMENTED: Code = Code(161);
  pub const BAD_GATEWAY: Code = Code(162);
  pub const SERVICE_UNAVAILABLE: Code = Code(163);
  pub const GATEWAY_TIMEOUT: Code = Code(164);
  pub const PROXYING_NOT_SUPPORTED: Code = Code(165);
}

impl Code {
  /// Whether this code signifies an empty message, request or response
  pub fn kind(&self) -> CodeKind {
    match self.0 {
      | 0 => CodeKind::Empty,
      | 1..=31 => CodeKind::Request,
      | 64..=191 => CodeKind::Response,
      | _ => CodeKind::Reserved,
    }
  }

  /// Is this one of the codes the protocol assigns a meaning to?
  pub fn is_defined(&self) -> bool {
    matches!(self.0,
             0 | 1..=4 | 65..=69 | 128..=134 | 140 | 141 | 143 | 160..=165)
  }
}
