use std::{error, fmt};

use crate::block::Addr;

/// Out-of-band status left behind by the last `allocate`/`release` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
  #[default]
  NoError,
  OutOfMemory,
  SingleRequestTooLarge,
}

/// Why an allocation request failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
  /// Zero-byte request.
  InvalidRequest,
  /// The request plus its header can never fit in one chunk.
  RequestTooLarge { requested: usize, limit: usize },
  /// The memory source refused to hand out another chunk.
  OutOfMemory,
}

impl AllocError {
  /// Status code recorded for this failure. `InvalidRequest` leaves the
  /// previous status untouched.
  pub fn status(&self) -> Option<Status> {
    match self {
      AllocError::InvalidRequest => None,
      AllocError::RequestTooLarge { .. } => Some(Status::SingleRequestTooLarge),
      AllocError::OutOfMemory => Some(Status::OutOfMemory),
    }
  }
}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      AllocError::InvalidRequest => write!(f, "allocation size must be greater than zero"),
      AllocError::RequestTooLarge { requested, limit } => {
        write!(f, "request of {requested} bytes exceeds the {limit} bytes one chunk can hold")
      }
      AllocError::OutOfMemory => write!(f, "memory source is exhausted"),
    }
  }
}

impl error::Error for AllocError {}

/// Inconsistency found by `Allocator::validate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corruption {
  /// A free-list node lies outside every chunk.
  OutOfBounds { addr: Addr },
  /// `next.prev` does not point back at the node.
  BrokenLink { addr: Addr },
  /// A block on the free list is flagged in use.
  InUseOnFreeList { addr: Addr },
  /// Two consecutive free-list nodes violate the policy order.
  OutOfOrder { first: Addr, second: Addr },
  /// A block is smaller than its header or runs past its chunk.
  BadSize { addr: Addr, size: usize },
  /// A free block found by walking the chunks is missing from the list.
  Unlisted { addr: Addr },
  /// The free list and the chunk walk disagree on the number of free blocks.
  CountMismatch { listed: usize, walked: usize },
}

impl fmt::Display for Corruption {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Corruption::OutOfBounds { addr } => write!(f, "free-list node {addr:?} is outside the heap"),
      Corruption::BrokenLink { addr } => write!(f, "free-list links around {addr:?} disagree"),
      Corruption::InUseOnFreeList { addr } => {
        write!(f, "block {addr:?} is in use but on the free list")
      }
      Corruption::OutOfOrder { first, second } => {
        write!(f, "free-list nodes {first:?} and {second:?} are out of order")
      }
      Corruption::BadSize { addr, size } => write!(f, "block {addr:?} has invalid size {size}"),
      Corruption::Unlisted { addr } => write!(f, "free block {addr:?} is not on the free list"),
      Corruption::CountMismatch { listed, walked } => {
        write!(f, "free list holds {listed} blocks but the heap walk found {walked}")
      }
    }
  }
}

impl error::Error for Corruption {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_request_keeps_status() {
    assert_eq!(AllocError::InvalidRequest.status(), None);
    assert_eq!(AllocError::OutOfMemory.status(), Some(Status::OutOfMemory));
    assert_eq!(
      AllocError::RequestTooLarge { requested: 4096, limit: 2016 }.status(),
      Some(Status::SingleRequestTooLarge)
    );
  }

  #[test]
  fn messages_name_the_numbers() {
    let err = AllocError::RequestTooLarge { requested: 4096, limit: 2016 };
    assert_eq!(err.to_string(), "request of 4096 bytes exceeds the 2016 bytes one chunk can hold");
  }
}
