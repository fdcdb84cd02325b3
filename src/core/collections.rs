//! Collection aliases tuned for the diagram's hot paths.
//!
//! Internal maps and sets key on slotmap handles or site indices — trusted,
//! non-adversarial data — so the fast `FxHasher` is used throughout. Small
//! per-vertex and per-face buffers stay on the stack via `SmallVec`.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Fast non-cryptographic hash map for internal keys.
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Fast non-cryptographic hash set for internal keys.
pub type FastHashSet<K> = FxHashSet<K>;

/// Stack-allocated buffer that spills to the heap past `N` elements.
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// Inline capacity for per-vertex adjacency lists; Voronoi vertices have
/// degree 3 away from degeneracies.
pub const VERTEX_DEGREE_BUFFER_SIZE: usize = 8;

/// Inline capacity for face-cycle walks; most faces stay small, long cycles
/// spill.
pub const FACE_CYCLE_BUFFER_SIZE: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_usable() {
        let mut map: FastHashMap<u64, usize> = FastHashMap::default();
        map.insert(7, 42);
        assert_eq!(map.get(&7), Some(&42));

        let mut set: FastHashSet<u64> = FastHashSet::default();
        assert!(set.insert(3));
        assert!(!set.insert(3));

        let mut buf: SmallBuffer<u32, VERTEX_DEGREE_BUFFER_SIZE> = SmallBuffer::new();
        buf.extend([1, 2, 3]);
        assert!(!buf.spilled());
    }
}
