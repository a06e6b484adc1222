/// Version of the CoAP protocol that the message adheres to.
///
/// Occupies the top 2 bits of the first header byte and is always 1;
/// the validity checker rejects anything else.
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug)]
pub struct Version(pub u8);

impl Default for Version {
  fn default() -> Self {
    Version(1)
  }
}
