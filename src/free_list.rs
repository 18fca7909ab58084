//! Doubly linked list of free blocks, threaded through the block headers.
//!
//! ```text
//!   root
//!    │
//!    ▼
//!   ┌────────┐ next ┌────────┐ next ┌────────┐
//!   │ block  │─────▶│ block  │─────▶│ block  │──▶ None
//!   │        │◀─────│        │◀─────│        │
//!   └────────┘ prev └────────┘ prev └────────┘
//! ```
//!
//! The list only stores the root. Order is decided by a [`Policy`], which
//! yields the sort key used by the single ordered insertion below.

use log::trace;

use crate::{
  block::{Addr, Block},
  policy::Policy,
  region::Region,
};

#[derive(Debug, Default)]
pub struct FreeList {
  root: Option<Addr>,
  len: usize,
}

/// Walks the list from the root, yielding each node with its header.
pub struct Iter<'a> {
  region: &'a Region,
  next: Option<Addr>,
}

impl Iterator for Iter<'_> {
  type Item = (Addr, Block);

  fn next(&mut self) -> Option<Self::Item> {
    let addr = self.next?;
    let block = self.region.block(addr);
    self.next = block.next;
    Some((addr, block))
  }
}

impl FreeList {
  pub fn root(&self) -> Option<Addr> {
    self.root
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn iter<'a>(
    &self,
    region: &'a Region,
  ) -> Iter<'a> {
    Iter {
      region,
      next: self.root,
    }
  }

  /// Inserts the free block at `node`, keeping the list ordered by `policy`.
  ///
  /// Equal sizes are placed after the blocks already present.
  pub fn insert(
    &mut self,
    region: &mut Region,
    node: Addr,
    policy: Policy,
  ) {
    region.update(node, |block| {
      block.next = None;
      block.prev = None;
    });
    self.len += 1;

    let Some(root) = self.root else {
      trace!("free list: {node:?} becomes the sole node");
      self.root = Some(node);
      return;
    };

    let key = policy.key(node, &region.block(node));

    match self.anchor(region, root, key, policy) {
      Some(anchor) => self.link_after(region, anchor, node),
      None => self.link_before(region, root, node),
    }
  }

  /// Last node that may precede a node keyed `key`, or `None` when the new
  /// node belongs in front of the root.
  fn anchor(
    &self,
    region: &Region,
    root: Addr,
    key: usize,
    policy: Policy,
  ) -> Option<Addr> {
    let root_block = region.block(root);
    if !policy.in_order(policy.key(root, &root_block), key) {
      return None;
    }

    let mut anchor = root;
    let mut next = root_block.next;

    while let Some(candidate) = next {
      let block = region.block(candidate);
      if !policy.in_order(policy.key(candidate, &block), key) {
        break;
      }
      anchor = candidate;
      next = block.next;
    }

    Some(anchor)
  }

  fn link_after(
    &mut self,
    region: &mut Region,
    anchor: Addr,
    node: Addr,
  ) {
    let successor = region.block(anchor).next;
    trace!("free list: {node:?} after {anchor:?}");

    region.update(node, |block| {
      block.prev = Some(anchor);
      block.next = successor;
    });
    if let Some(successor) = successor {
      region.update(successor, |block| block.prev = Some(node));
    }
    region.update(anchor, |block| block.next = Some(node));
  }

  fn link_before(
    &mut self,
    region: &mut Region,
    anchor: Addr,
    node: Addr,
  ) {
    let predecessor = region.block(anchor).prev;
    trace!("free list: {node:?} before {anchor:?}");

    region.update(node, |block| {
      block.prev = predecessor;
      block.next = Some(anchor);
    });
    match predecessor {
      Some(predecessor) => region.update(predecessor, |block| block.next = Some(node)),
      None => self.root = Some(node),
    }
    region.update(anchor, |block| block.prev = Some(node));
  }

  /// Unlinks `node` and clears its links.
  pub fn remove(
    &mut self,
    region: &mut Region,
    node: Addr,
  ) {
    let block = region.block(node);
    debug_assert!(
      block.prev.is_some() || self.root == Some(node),
      "{node:?} is not on the free list"
    );

    match block.prev {
      Some(prev) => region.update(prev, |b| b.next = block.next),
      None => self.root = block.next,
    }
    if let Some(next) = block.next {
      region.update(next, |b| b.prev = block.prev);
    }
    region.update(node, |b| {
      b.next = None;
      b.prev = None;
    });
    self.len -= 1;
  }

  /// Size-ordered lookup: the node where sizes stop being below `target`.
  ///
  /// Returns the first node already at least `target` bytes, the last node
  /// followed by a larger one, or the tail. The result may still be too small.
  pub fn find_node_size(
    &self,
    region: &Region,
    target: usize,
  ) -> Option<Addr> {
    let mut current = self.root?;

    loop {
      let block = region.block(current);
      if block.size >= target {
        return Some(current);
      }
      match block.next {
        Some(next) if region.block(next).size <= target => current = next,
        _ => return Some(current),
      }
    }
  }

  /// Smallest node of at least `space` bytes on a size-ordered list.
  pub fn find_smallest_fitting(
    &self,
    region: &Region,
    space: usize,
  ) -> Option<Addr> {
    let candidate = self.find_node_size(region, space)?;
    let block = region.block(candidate);

    if block.size >= space {
      Some(candidate)
    } else {
      block.next
    }
  }

  /// Address-ordered lookup.
  ///
  /// A sole node is returned whatever its size. Otherwise the first node of
  /// exactly `space` bytes wins, then the smallest node above `space`; ties
  /// go to the lowest address.
  pub fn find_node_address(
    &self,
    region: &Region,
    space: usize,
  ) -> Option<Addr> {
    let root = self.root?;
    if region.block(root).next.is_none() {
      return Some(root);
    }

    let mut best: Option<(Addr, usize)> = None;
    for (addr, block) in self.iter(region) {
      if block.size == space {
        return Some(addr);
      }
      if block.size > space && best.is_none_or(|(_, size)| block.size < size) {
        best = Some((addr, block.size));
      }
    }

    best.map(|(addr, _)| addr)
  }

  /// Placement search under `policy`. Only returns nodes that actually fit.
  pub fn find(
    &self,
    region: &Region,
    space: usize,
    policy: Policy,
  ) -> Option<Addr> {
    let found = match policy {
      Policy::SizeOrdered => self.find_smallest_fitting(region, space),
      Policy::AddressOrdered => self.find_node_address(region, space),
    }?;

    (region.block(found).size >= space).then_some(found)
  }
}
