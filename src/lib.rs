//! # rfreelist - A Free-List Heap Allocator
//!
//! This crate implements a user-space heap allocator that grows its heap in
//! fixed 2 KiB extensions obtained from an `sbrk`-like primitive, keeps the
//! unused blocks on an explicit free list, splits blocks on allocation and
//! coalesces neighbours on release.
//!
//! ## Overview
//!
//! Every block, free or in use, starts with a header:
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size (total)    │  │  ┌──────────────────────────┐  │
//!   │  │ in_use          │  │  │                          │  │
//!   │  │ next: free list │  │  │   size - header bytes    │  │
//!   │  │ prev: free list │  │  │                          │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! Free blocks are linked through their headers. The list is ordered by one
//! of two policies, picked per allocator:
//!
//! ```text
//!   Policy::SizeOrdered      root ─▶ [ 48 ] ─▶ [ 136 ] ─▶ [ 1640 ]
//!                            best fit, neighbours found by scanning
//!
//!   Policy::AddressOrdered   root ─▶ [0x100] ─▶ [0x400] ─▶ [0x900]
//!                            neighbours are the list links
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rfreelist
//!   ├── align      - Word alignment of request sizes (align!)
//!   ├── allocator  - Allocator: allocate, release, split, coalesce
//!   ├── block      - Block header and addresses
//!   ├── error      - AllocError, Status, Corruption
//!   ├── free_list  - Ordered doubly linked free list and placement search
//!   ├── inspect    - Block walks, statistics, validation
//!   ├── policy     - Size- or address-ordered policy
//!   ├── region     - Bounds-checked view over acquired chunks (internal)
//!   └── source     - MemorySource trait, Sbrk and Arena sources
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rfreelist::{Allocator, Policy, Status};
//!
//! let mut allocator = Allocator::arena(Policy::AddressOrdered, 4);
//!
//! let ptr = allocator.allocate(100);
//! assert!(!ptr.is_null());
//!
//! unsafe {
//!     ptr.write_bytes(0xAB, 100);
//!     allocator.release(ptr);
//! }
//!
//! // Too large for a single extension.
//! assert!(allocator.allocate(4096).is_null());
//! assert_eq!(allocator.status(), Status::SingleRequestTooLarge);
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **No shrinking**: Extensions are never returned to the system
//! - **Bounded requests**: A request plus its header must fit in one extension

pub mod align;
mod allocator;
mod block;
mod error;
mod free_list;
mod inspect;
mod policy;
mod region;
mod source;

pub use allocator::{Allocator, CHUNK_SIZE, MAX_REQUEST};
pub use block::{Addr, HEADER_SIZE};
pub use error::{AllocError, Corruption, Status};
pub use inspect::{BlockInfo, Blocks, Stats};
pub use policy::Policy;
#[cfg(unix)]
pub use source::Sbrk;
pub use source::{Arena, MemorySource};
