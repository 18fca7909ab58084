use std::{alloc, ptr::NonNull};

/// Coarse-grained memory extension primitive.
///
/// Each successful call hands back `bytes` of zero-initialized memory that no
/// one else uses. The memory is never returned.
pub trait MemorySource {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>>;
}

impl<S: MemorySource + ?Sized> MemorySource for &mut S {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    (**self).extend(bytes)
  }
}

/// Grows the program break with `sbrk(2)`.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct Sbrk;

#[cfg(unix)]
impl MemorySource for Sbrk {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let increment = libc::intptr_t::try_from(bytes).ok()?;
    let address = unsafe { libc::sbrk(increment) };

    if address == usize::MAX as *mut libc::c_void {
      return None;
    }

    NonNull::new(address.cast())
  }
}

/// Fixed-capacity, zeroed backing store handed out front to back.
pub struct Arena {
  base: Option<NonNull<u8>>,
  layout: alloc::Layout,
  used: usize,
}

impl Arena {
  const ALIGN: usize = 16;

  pub fn new(capacity: usize) -> Self {
    let layout = alloc::Layout::from_size_align(capacity, Self::ALIGN)
      .unwrap_or_else(|_| alloc::Layout::new::<()>());
    let base = if layout.size() == 0 {
      None
    } else {
      NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
    };

    Self {
      base,
      layout,
      used: 0,
    }
  }

  pub fn capacity(&self) -> usize {
    self.base.map_or(0, |_| self.layout.size())
  }

  pub fn remaining(&self) -> usize {
    self.capacity() - self.used
  }
}

impl MemorySource for Arena {
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let base = self.base?;

    if bytes == 0 || bytes > self.remaining() {
      return None;
    }

    let chunk = unsafe { base.add(self.used) };
    self.used += bytes;
    Some(chunk)
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    if let Some(base) = self.base {
      unsafe { alloc::dealloc(base.as_ptr(), self.layout) };
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn arena_hands_out_contiguous_zeroed_chunks() {
    let mut arena = Arena::new(256);

    let first = arena.extend(128).unwrap();
    let second = arena.extend(128).unwrap();

    assert_eq!(second.addr().get(), first.addr().get() + 128);
    assert!(arena.extend(1).is_none());

    let bytes = unsafe { std::slice::from_raw_parts(first.as_ptr(), 256) };
    assert!(bytes.iter().all(|&b| b == 0));
  }

  #[test]
  fn empty_arena_never_extends() {
    let mut arena = Arena::new(0);
    assert_eq!(arena.capacity(), 0);
    assert!(arena.extend(16).is_none());
  }

  #[test]
  fn sources_can_be_borrowed() {
    fn grow<S: MemorySource>(mut source: S) -> Option<NonNull<u8>> {
      source.extend(64)
    }

    let mut arena = Arena::new(64);

    assert!(grow(&mut arena).is_some());
    assert_eq!(arena.remaining(), 0);
  }
}
