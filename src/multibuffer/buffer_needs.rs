//! Chunk sizing for operators that read several blocks at once.
//!
//! Two buffers are always held back for the other side of the operator
//! and its output, so at most `available - 2` blocks are handed out.

/// best_factor returns the largest `ceil(size / i)` that fits in the
/// available buffers, or 1 when there is no room.
pub fn best_factor(available: usize, size: u64) -> u64 {
    let avail = available.saturating_sub(2) as u64;
    if avail <= 1 {
        return 1;
    }
    let mut k = size;
    let mut i = 1;
    while k > avail {
        i += 1;
        k = size.div_ceil(i);
    }
    k.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_pick_largest_factor_that_fits() {
        assert_eq!(best_factor(10, 4), 4);
        assert_eq!(best_factor(10, 16), 8);
        assert_eq!(best_factor(6, 10), 4);
        assert_eq!(best_factor(3, 100), 1);
        assert_eq!(best_factor(0, 100), 1);
        assert_eq!(best_factor(10, 0), 1);
    }
}
