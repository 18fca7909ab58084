use crate::block::{Addr, Block};

/// Ordering and placement policy of a free list.
///
/// Chosen once per allocator; a heap never mixes the two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Policy {
  /// Free blocks sorted by non-decreasing size; best fit by size.
  #[default]
  SizeOrdered,
  /// Free blocks sorted by start address; neighbours are found through the links.
  AddressOrdered,
}

impl Policy {
  /// Sort key of the block at `addr` under this policy.
  pub fn key(
    self,
    addr: Addr,
    block: &Block,
  ) -> usize {
    match self {
      Policy::SizeOrdered => block.size,
      Policy::AddressOrdered => addr.get(),
    }
  }

  /// Whether a list node keyed `first` may directly precede one keyed `second`.
  pub fn in_order(
    self,
    first: usize,
    second: usize,
  ) -> bool {
    match self {
      Policy::SizeOrdered => first <= second,
      Policy::AddressOrdered => first < second,
    }
  }
}
