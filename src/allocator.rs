use std::{fmt, ptr, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
  align,
  align::MIN_ALIGN,
  block::{Addr, Block, HEADER_SIZE},
  error::{AllocError, Status},
  free_list::FreeList,
  policy::Policy,
  region::Region,
  source::{Arena, MemorySource},
};

/// Bytes requested from the memory source each time the heap grows.
pub const CHUNK_SIZE: usize = 2048;

/// Largest request that fits in one chunk next to its header.
pub const MAX_REQUEST: usize = CHUNK_SIZE - HEADER_SIZE;

const _: () = assert!(MAX_REQUEST % MIN_ALIGN == 0);

/// Free-list heap allocator over fixed-size extensions.
///
/// ```text
///   One chunk after allocate(100), allocate(40):
///
///   ┌────────┬──────────┬────────┬────────┬────────┬──────────────────────┐
///   │ header │ 104 B    │ header │ 40 B   │ header │ free remainder       │
///   │ in use │ payload  │ in use │payload │ free   │ (on the free list)   │
///   └────────┴──────────┴────────┴────────┴────────┴──────────────────────┘
///   ◀──────────────────────────── CHUNK_SIZE ──────────────────────────────▶
/// ```
///
/// Not thread-safe; callers serialize access.
pub struct Allocator<S: MemorySource> {
  pub(crate) source: S,
  pub(crate) region: Region,
  pub(crate) free: FreeList,
  pub(crate) policy: Policy,
  status: Status,
}

impl<S: MemorySource> Allocator<S> {
  pub fn new(
    policy: Policy,
    source: S,
  ) -> Self {
    Self {
      source,
      region: Region::default(),
      free: FreeList::default(),
      policy,
      status: Status::NoError,
    }
  }

  pub fn policy(&self) -> Policy {
    self.policy
  }

  /// Status left by the last `allocate`, `try_allocate` or `release`.
  pub fn status(&self) -> Status {
    self.status
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  /// Allocates `size` bytes, returning null on failure.
  ///
  /// The reason for a failure is available through [`Allocator::status`].
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    self
      .try_allocate(size)
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    match self.allocate_block(size) {
      Ok(block) => {
        self.status = Status::NoError;
        let payload = self.region.payload(block);
        debug!("allocate({size}) -> {payload:?}");
        Ok(payload)
      }
      Err(err) => {
        if let Some(status) = err.status() {
          self.status = status;
        }
        debug!("allocate({size}) failed: {err}");
        Err(err)
      }
    }
  }

  fn allocate_block(
    &mut self,
    size: usize,
  ) -> Result<Addr, AllocError> {
    if size == 0 {
      return Err(AllocError::InvalidRequest);
    }
    if size > MAX_REQUEST {
      return Err(AllocError::RequestTooLarge {
        requested: size,
        limit: MAX_REQUEST,
      });
    }

    let space = align!(size) + HEADER_SIZE;

    let found = match self.free.find(&self.region, space, self.policy) {
      Some(found) => found,
      None => {
        let chunk = self.acquire()?;
        self.free.insert(&mut self.region, chunk, self.policy);
        self
          .free
          .find(&self.region, space, self.policy)
          .ok_or(AllocError::OutOfMemory)?
      }
    };

    Ok(self.split(found, space))
  }

  /// Grows the heap by one chunk, recorded as a single unlinked free block.
  fn acquire(&mut self) -> Result<Addr, AllocError> {
    let base = self
      .source
      .extend(CHUNK_SIZE)
      .ok_or(AllocError::OutOfMemory)?;

    let chunk = self.region.add_chunk(base, CHUNK_SIZE);
    self.region.store(chunk, Block::free(CHUNK_SIZE));

    debug!(
      "acquired chunk {chunk:?}, heap is now {} chunks",
      self.region.chunks()
    );
    Ok(chunk)
  }

  /// Takes the free block at `addr` off the list and hands out its first
  /// `space` bytes, returning what is left to the free list.
  ///
  /// The remainder is only carved off when it can hold a header plus at
  /// least one byte; otherwise the whole block is handed out.
  fn split(
    &mut self,
    addr: Addr,
    space: usize,
  ) -> Addr {
    self.free.remove(&mut self.region, addr);
    let size = self.region.block(addr).size;

    if size > space + HEADER_SIZE {
      let rest = addr.offset(space);
      self.region.store(rest, Block::free(size - space));
      self.free.insert(&mut self.region, rest, self.policy);
      self.region.store(addr, Block::new(space, true));
      trace!("split {addr:?}: {space} in use, {} free at {rest:?}", size - space);
    } else {
      self.region.store(addr, Block::new(size, true));
    }

    addr
  }

  /// Returns the block behind `ptr` to the heap, merging it with free neighbours.
  ///
  /// A null pointer is ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer returned by this allocator that has not
  /// been released since.
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    if ptr.is_null() {
      return;
    }

    let Some(addr) = ptr.addr().checked_sub(HEADER_SIZE).and_then(Addr::new) else {
      warn!("release({ptr:?}) ignored: not a block of this heap");
      return;
    };

    match self.region.try_block(addr) {
      Some(block) if block.in_use && self.region.covers(addr, block.size) => {}
      _ => {
        warn!("release({ptr:?}) ignored: not a live block of this heap");
        return;
      }
    }

    self.region.update(addr, |block| block.in_use = false);
    self.free.insert(&mut self.region, addr, self.policy);

    let merged = match self.policy {
      Policy::SizeOrdered => self.coalesce_by_scan(addr),
      Policy::AddressOrdered => self.coalesce_by_links(addr),
    };

    debug!(
      "release({ptr:?}): free block {merged:?} of {} bytes",
      self.region.block(merged).size
    );
    self.status = Status::NoError;
  }

  /// Size-ordered lists carry no address information, so both neighbours
  /// are looked up by scanning the whole list. Both merges happen before the
  /// survivor is reinserted once.
  fn coalesce_by_scan(
    &mut self,
    addr: Addr,
  ) -> Addr {
    let block = self.region.block(addr);
    let end = block.end(addr);

    let left = self
      .free
      .iter(&self.region)
      .find(|(candidate, other)| !other.in_use && other.end(*candidate) == addr);
    let right = self
      .free
      .iter(&self.region)
      .find(|(candidate, other)| !other.in_use && *candidate == end);

    if left.is_none() && right.is_none() {
      return addr;
    }

    self.free.remove(&mut self.region, addr);
    let mut survivor = addr;
    let mut size = block.size;

    if let Some((left, left_block)) = left {
      self.free.remove(&mut self.region, left);
      trace!("merge {left:?} <- {addr:?}");
      survivor = left;
      size += left_block.size;
    }
    if let Some((right, right_block)) = right {
      self.free.remove(&mut self.region, right);
      trace!("merge {survivor:?} <- {right:?}");
      size += right_block.size;
    }

    self.region.update(survivor, |block| block.size = size);
    self.free.insert(&mut self.region, survivor, self.policy);
    survivor
  }

  /// Address-ordered lists keep physical neighbours adjacent, so `prev` and
  /// `next` are the only candidates. The survivor keeps its list position.
  fn coalesce_by_links(
    &mut self,
    addr: Addr,
  ) -> Addr {
    let block = self.region.block(addr);

    let left = block.prev.filter(|&prev| {
      let prev_block = self.region.block(prev);
      !prev_block.in_use && prev_block.end(prev) == addr
    });
    let right = block
      .next
      .filter(|&next| !self.region.block(next).in_use && block.end(addr) == next);

    let mut survivor = addr;
    let mut size = block.size;

    if let Some(left) = left {
      self.free.remove(&mut self.region, addr);
      trace!("merge {left:?} <- {addr:?}");
      survivor = left;
      size += self.region.block(left).size;
    }
    if let Some(right) = right {
      size += self.region.block(right).size;
      self.free.remove(&mut self.region, right);
      trace!("merge {survivor:?} <- {right:?}");
    }

    self.region.update(survivor, |block| block.size = size);
    survivor
  }

  /// Bytes the caller may use behind `ptr`, or `None` if it is not a live block.
  ///
  /// # Safety
  ///
  /// Same contract as [`Allocator::release`].
  pub unsafe fn usable_size(
    &self,
    ptr: *const u8,
  ) -> Option<usize> {
    let addr = Addr::new(ptr.addr().checked_sub(HEADER_SIZE)?)?;
    let block = self.region.try_block(addr)?;

    block.in_use.then(|| block.payload())
  }
}

impl Allocator<Arena> {
  /// Allocator backed by a private arena of `chunks` extensions.
  pub fn arena(
    policy: Policy,
    chunks: usize,
  ) -> Self {
    let capacity = chunks.checked_mul(CHUNK_SIZE).unwrap_or(0);
    Self::new(policy, Arena::new(capacity))
  }
}

#[cfg(unix)]
impl Allocator<crate::source::Sbrk> {
  /// Allocator growing the process heap with `sbrk(2)`.
  pub fn sbrk(policy: Policy) -> Self {
    Self::new(policy, crate::source::Sbrk)
  }
}

impl<S: MemorySource> fmt::Debug for Allocator<S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Allocator")
      .field("policy", &self.policy)
      .field("status", &self.status)
      .field("chunks", &self.region.chunks())
      .field("free_blocks", &self.free.len())
      .finish()
  }
}
