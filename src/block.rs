use std::{fmt, mem, num::NonZeroUsize};

/// Start address of a block header inside the heap.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr(NonZeroUsize);

impl Addr {
  pub fn new(addr: usize) -> Option<Self> {
    NonZeroUsize::new(addr).map(Self)
  }

  pub fn get(self) -> usize {
    self.0.get()
  }

  /// Address `bytes` past this one.
  pub fn offset(
    self,
    bytes: usize,
  ) -> Self {
    Self(self.0.saturating_add(bytes))
  }
}

impl fmt::Debug for Addr {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:#x}", self.get())
  }
}

/// Metadata stored in front of every block, free or in use.
///
/// `size` counts the header itself. The links are only meaningful while the
/// block sits on the free list; an in-use block has both set to `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Block {
  pub size: usize,
  pub in_use: bool,
  pub next: Option<Addr>,
  pub prev: Option<Addr>,
}

pub const HEADER_SIZE: usize = mem::size_of::<Block>();

impl Block {
  pub fn new(
    size: usize,
    in_use: bool,
  ) -> Self {
    Self {
      size,
      in_use,
      next: None,
      prev: None,
    }
  }

  pub fn free(size: usize) -> Self {
    Self::new(size, false)
  }

  /// One past the last byte of the block starting at `addr`.
  pub fn end(
    &self,
    addr: Addr,
  ) -> Addr {
    addr.offset(self.size)
  }

  /// Bytes available to the caller.
  pub fn payload(&self) -> usize {
    self.size - HEADER_SIZE
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_is_word_aligned() {
    assert_eq!(HEADER_SIZE % mem::align_of::<usize>(), 0);
    assert_eq!(mem::size_of::<Option<Addr>>(), mem::size_of::<usize>());
  }

  #[test]
  fn block_end_and_payload() {
    let addr = Addr::new(0x1000).unwrap();
    let block = Block::free(HEADER_SIZE + 64);

    assert_eq!(block.end(addr).get(), 0x1000 + HEADER_SIZE + 64);
    assert_eq!(block.payload(), 64);
    assert!(block.next.is_none() && block.prev.is_none());
  }

  #[test]
  fn null_is_not_an_address() {
    assert!(Addr::new(0).is_none());
  }
}
