//! Bounds-checked view over the chunks acquired so far.
//!
//! Block headers live inside the chunks themselves. Every header access goes
//! through [`Region`], which first locates the address in a known span, so a
//! stray [`Addr`] panics like an out-of-range index instead of touching
//! foreign memory.

use std::ptr::NonNull;

use crate::block::{Addr, Block, HEADER_SIZE};

/// Contiguous run of acquired memory. Chunks that the source returns back to
/// back are folded into one span so blocks may merge across them.
struct Span {
  base: NonNull<u8>,
  len: usize,
}

impl Span {
  fn start(&self) -> usize {
    self.base.addr().get()
  }

  fn end(&self) -> usize {
    self.start() + self.len
  }
}

#[derive(Default)]
pub struct Region {
  spans: Vec<Span>,
  chunks: usize,
}

impl Region {
  /// Records a freshly acquired chunk and returns its start address.
  pub fn add_chunk(
    &mut self,
    base: NonNull<u8>,
    len: usize,
  ) -> Addr {
    let start = base.addr().get();
    let idx = self.spans.partition_point(|span| span.start() < start);
    self.chunks += 1;

    let joins_prev = idx > 0 && self.spans[idx - 1].end() == start;
    let joins_next = idx < self.spans.len() && self.spans[idx].start() == start + len;

    match (joins_prev, joins_next) {
      (true, true) => {
        let next = self.spans.remove(idx);
        self.spans[idx - 1].len += len + next.len;
      }
      (true, false) => self.spans[idx - 1].len += len,
      (false, true) => {
        let next = &mut self.spans[idx];
        next.base = base;
        next.len += len;
      }
      (false, false) => self.spans.insert(idx, Span { base, len }),
    }

    Addr::new(start).unwrap_or_else(|| unreachable!("NonNull address is never zero"))
  }

  /// Number of chunks acquired, regardless of how they were folded into spans.
  pub fn chunks(&self) -> usize {
    self.chunks
  }

  pub fn bytes(&self) -> usize {
    self.spans.iter().map(|span| span.len).sum()
  }

  /// Start address and length of every span, in address order.
  pub fn spans(&self) -> impl Iterator<Item = (Addr, usize)> + '_ {
    self
      .spans
      .iter()
      .filter_map(|span| Addr::new(span.start()).map(|addr| (addr, span.len)))
  }

  /// Pointer to `len` bytes at `addr`, if they lie entirely inside one span.
  fn locate(
    &self,
    addr: Addr,
    len: usize,
  ) -> Option<NonNull<u8>> {
    let addr = addr.get();
    let idx = self.spans.partition_point(|span| span.start() <= addr);
    let span = self.spans.get(idx.checked_sub(1)?)?;
    let offset = addr - span.start();

    if offset.checked_add(len)? > span.len {
      return None;
    }

    Some(unsafe { span.base.add(offset) })
  }

  /// Whether `[addr, addr + size)` lies inside one span.
  pub fn covers(
    &self,
    addr: Addr,
    size: usize,
  ) -> bool {
    self.locate(addr, size).is_some()
  }

  pub fn try_block(
    &self,
    addr: Addr,
  ) -> Option<Block> {
    let header = self.locate(addr, HEADER_SIZE)?;
    Some(unsafe { header.cast::<Block>().read_unaligned() })
  }

  /// Reads the header at `addr`.
  ///
  /// Panics if `addr` is not inside the heap.
  pub fn block(
    &self,
    addr: Addr,
  ) -> Block {
    self
      .try_block(addr)
      .unwrap_or_else(|| panic!("block header {addr:?} lies outside the heap"))
  }

  pub fn store(
    &mut self,
    addr: Addr,
    block: Block,
  ) {
    let header = self
      .locate(addr, HEADER_SIZE)
      .unwrap_or_else(|| panic!("block header {addr:?} lies outside the heap"));

    unsafe { header.cast::<Block>().write_unaligned(block) };
  }

  pub fn update(
    &mut self,
    addr: Addr,
    f: impl FnOnce(&mut Block),
  ) {
    let mut block = self.block(addr);
    f(&mut block);
    self.store(addr, block);
  }

  /// Pointer handed to the caller for the block at `addr`.
  pub fn payload(
    &self,
    addr: Addr,
  ) -> NonNull<u8> {
    let header = self
      .locate(addr, HEADER_SIZE)
      .unwrap_or_else(|| panic!("block header {addr:?} lies outside the heap"));

    unsafe { header.add(HEADER_SIZE) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::{Arena, MemorySource};

  #[test]
  fn contiguous_chunks_fold_into_one_span() {
    let mut arena = Arena::new(512);
    let mut region = Region::default();

    let first = region.add_chunk(arena.extend(256).unwrap(), 256);
    let second = region.add_chunk(arena.extend(256).unwrap(), 256);

    assert_eq!(second, first.offset(256));
    assert_eq!(region.chunks(), 2);
    assert_eq!(region.spans().collect::<Vec<_>>(), vec![(first, 512)]);
    assert!(region.covers(first, 512));
  }

  #[test]
  fn gaps_split_spans_until_filled() {
    let mut arena = Arena::new(768);
    let mut region = Region::default();

    let a = arena.extend(256).unwrap();
    let gap = arena.extend(256).unwrap();
    let c = arena.extend(256).unwrap();

    let third = region.add_chunk(c, 256);
    let first = region.add_chunk(a, 256);

    assert_eq!(region.spans().collect::<Vec<_>>(), vec![(first, 256), (third, 256)]);
    assert!(!region.covers(first, 512));

    region.add_chunk(gap, 256);

    assert_eq!(region.spans().collect::<Vec<_>>(), vec![(first, 768)]);
    assert_eq!(region.bytes(), 768);
    assert_eq!(region.chunks(), 3);
  }

  #[test]
  fn chunk_below_a_span_extends_it_downwards() {
    let mut arena = Arena::new(512);
    let mut region = Region::default();

    let low = arena.extend(256).unwrap();
    let high = arena.extend(256).unwrap();

    region.add_chunk(high, 256);
    let start = region.add_chunk(low, 256);

    assert_eq!(region.spans().collect::<Vec<_>>(), vec![(start, 512)]);
  }

  #[test]
  fn headers_round_trip_through_memory() {
    let mut arena = Arena::new(256);
    let mut region = Region::default();
    let addr = region.add_chunk(arena.extend(256).unwrap(), 256);

    assert_eq!(region.block(addr), Block::free(0));

    region.store(addr, Block::free(256));
    region.update(addr, |block| block.in_use = true);

    assert_eq!(region.block(addr), Block::new(256, true));
    assert_eq!(
      region.payload(addr).addr().get(),
      addr.get() + HEADER_SIZE
    );
  }

  #[test]
  fn addresses_outside_the_heap_are_rejected() {
    let mut arena = Arena::new(256);
    let mut region = Region::default();
    let addr = region.add_chunk(arena.extend(256).unwrap(), 256);

    assert!(region.try_block(addr.offset(256 - HEADER_SIZE)).is_some());
    assert!(region.try_block(addr.offset(256 - HEADER_SIZE + 1)).is_none());
    assert!(!region.covers(addr, 257));
    assert!(region.try_block(addr.offset(256)).is_none());
    assert!(region.try_block(Addr::new(1).unwrap()).is_none());
  }
}
