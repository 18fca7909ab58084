use std::mem;

/// Alignment every payload handed out by the allocator is rounded to.
pub const MIN_ALIGN: usize = mem::align_of::<usize>();

/// Rounds `value` up to the next multiple of `align`, which must be a power of two.
pub const fn align_up(
  value: usize,
  align: usize,
) -> usize {
  (value + align - 1) & !(align - 1)
}

/// Rounds a request size up to the machine word alignment.
///
/// # Examples
///
/// ```rust
/// use rfreelist::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align::align_up($value, $crate::align::MIN_ALIGN)
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let word = mem::size_of::<usize>();

    for i in 0..10 {
      let expected = word * (i + 1);

      for size in (word * i + 1)..=(word * (i + 1)) {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_align_up_keeps_multiples() {
    assert_eq!(align_up(0, 16), 0);
    assert_eq!(align_up(2048, 16), 2048);
    assert_eq!(align_up(2049, 16), 2064);
  }
}
