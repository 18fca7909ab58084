//! Read-only views of the heap: block walks, statistics and consistency checks.

use std::collections::HashSet;

use crate::{
  allocator::Allocator,
  block::{Addr, HEADER_SIZE},
  error::Corruption,
  region::Region,
  source::MemorySource,
};

/// Snapshot of one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the block header.
  pub addr: usize,
  /// Total size, header included.
  pub size: usize,
  pub in_use: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
  pub chunks: usize,
  pub heap_bytes: usize,
  pub free_bytes: usize,
  pub free_blocks: usize,
  pub used_blocks: usize,
}

/// Walks every block of every span in address order by following sizes.
///
/// Stops a span early when a header is unreadable or smaller than itself.
pub struct Blocks<'a> {
  region: &'a Region,
  spans: std::vec::IntoIter<(Addr, usize)>,
  cursor: Option<(Addr, Addr)>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    loop {
      let (at, end) = match self.cursor {
        Some(cursor) => cursor,
        None => {
          let (start, len) = self.spans.next()?;
          self.cursor = Some((start, start.offset(len)));
          continue;
        }
      };

      if at >= end {
        self.cursor = None;
        continue;
      }

      let Some(block) = self.region.try_block(at) else {
        self.cursor = None;
        continue;
      };

      self.cursor = if block.size < HEADER_SIZE {
        None
      } else {
        Some((at.offset(block.size), end))
      };

      return Some(BlockInfo {
        addr: at.get(),
        size: block.size,
        in_use: block.in_use,
      });
    }
  }
}

impl<S: MemorySource> Allocator<S> {
  /// Free blocks in list order.
  pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.free.iter(&self.region).map(|(addr, block)| BlockInfo {
      addr: addr.get(),
      size: block.size,
      in_use: block.in_use,
    })
  }

  /// Every block of the heap, free or in use, in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      region: &self.region,
      spans: self.region.spans().collect::<Vec<_>>().into_iter(),
      cursor: None,
    }
  }

  pub fn stats(&self) -> Stats {
    let mut stats = Stats {
      chunks: self.region.chunks(),
      heap_bytes: self.region.bytes(),
      ..Stats::default()
    };

    for block in self.blocks() {
      if block.in_use {
        stats.used_blocks += 1;
      } else {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
      }
    }

    stats
  }

  /// Checks the free list against the policy and the blocks against the chunks.
  pub fn validate(&self) -> Result<(), Corruption> {
    let listed = self.validate_free_list()?;
    let mut walked = 0;

    for (start, len) in self.region.spans() {
      let end = start.offset(len);
      let mut at = start;

      while at < end {
        let addr = at;
        let block = self
          .region
          .try_block(addr)
          .ok_or(Corruption::BadSize { addr, size: 0 })?;

        if block.size < HEADER_SIZE || at.offset(block.size) > end {
          return Err(Corruption::BadSize { addr, size: block.size });
        }
        if !block.in_use {
          if !listed.contains(&addr) {
            return Err(Corruption::Unlisted { addr });
          }
          walked += 1;
        }

        at = at.offset(block.size);
      }
    }

    if walked != listed.len() {
      return Err(Corruption::CountMismatch {
        listed: listed.len(),
        walked,
      });
    }

    Ok(())
  }

  fn validate_free_list(&self) -> Result<HashSet<Addr>, Corruption> {
    let limit = self.region.bytes() / HEADER_SIZE;
    let mut listed = HashSet::new();
    let mut prev: Option<(Addr, usize)> = None;
    let mut next = self.free.root();

    while let Some(addr) = next {
      let block = self
        .region
        .try_block(addr)
        .ok_or(Corruption::OutOfBounds { addr })?;

      if block.prev != prev.map(|(prev, _)| prev) || !listed.insert(addr) || listed.len() > limit {
        return Err(Corruption::BrokenLink { addr });
      }
      if block.in_use {
        return Err(Corruption::InUseOnFreeList { addr });
      }

      let key = self.policy.key(addr, &block);
      if let Some((first, prev_key)) = prev {
        if !self.policy.in_order(prev_key, key) {
          return Err(Corruption::OutOfOrder { first, second: addr });
        }
      }

      prev = Some((addr, key));
      next = block.next;
    }

    if listed.len() != self.free.len() {
      return Err(Corruption::CountMismatch {
        listed: self.free.len(),
        walked: listed.len(),
      });
    }

    Ok(listed)
  }
}
