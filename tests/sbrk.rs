//! Runs in its own process: `sbrk(2)` is not synchronized with the system
//! allocator, so it must not share a test binary with allocating threads.

#![cfg(unix)]

use rfreelist::{Allocator, CHUNK_SIZE, Policy};

#[test]
fn sbrk_backed_heap_serves_requests() {
  let mut allocator = Allocator::sbrk(Policy::AddressOrdered);

  let p = allocator.allocate(256);
  assert!(!p.is_null());
  unsafe {
    p.write_bytes(0x5A, 256);
    allocator.release(p);
  }

  assert_eq!(allocator.stats().free_bytes, CHUNK_SIZE);
  allocator.validate().unwrap();
}
