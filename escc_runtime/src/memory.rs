//! `es_malloc`/`es_free` and the heap model backing the reference EBC
//! interpreter.
//!
//! A native `.eo` binary calls straight through to the platform allocator
//! (see `ArkLink/runtime/es_memory.c` in the original sources: `es_malloc`
//! is a thin `malloc` wrapper with no length header). The interpreter in
//! this crate has no process heap to lean on, so it models one: blocks are
//! slabs of 8-byte slots (every E# field/array element is 8 bytes per
//! `spec.md §3`'s class-layout rule), addressed by an opaque handle rather
//! than a raw pointer so the Rust borrow checker stays happy across `Vec`
//! growth.
//!
//! `array_size`/`array_get` (`spec.md §6`) need an element count that the
//! original's bare `malloc` cannot supply portably; this interpreter tracks
//! it as the allocation's slot count. See `DESIGN.md` for this call.

/// Opaque heap pointer. `Ptr::NULL` is the null pointer; `es_malloc` never
/// returns it on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ptr(pub u32);

impl Ptr {
    /// The null pointer, returned by `es_malloc` on failure and accepted by
    /// `es_free` as a no-op per the ABI contract in `spec.md §6`.
    pub const NULL: Ptr = Ptr(0);

    /// Whether this pointer is null.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

struct Block {
    slots: Vec<f64>,
    live: bool,
}

/// A simple slot-addressed heap standing in for the process heap a native
/// binary would use.
#[derive(Debug, Default)]
pub struct Heap {
    blocks: Vec<Block>,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// `es_malloc(size) -> ptr`. Returns a zero-initialized block sized in
    /// bytes, rounded up to whole 8-byte slots, or `Ptr::NULL` for a
    /// non-positive size.
    pub fn es_malloc(&mut self, size_bytes: i64) -> Ptr {
        if size_bytes <= 0 {
            return Ptr::NULL;
        }
        let slot_count = size_bytes.div_ceil(8) as usize;
        self.blocks.push(Block {
            slots: vec![0.0; slot_count],
            live: true,
        });
        Ptr(self.blocks.len() as u32) // 1-based: 0 stays NULL
    }

    /// `es_free(ptr) -> void`. Safe on null; double-free is a no-op rather
    /// than a crash, matching the forgiving discipline `spec.md §7`
    /// prescribes for the rest of the compiler.
    pub fn es_free(&mut self, ptr: Ptr) {
        if ptr.is_null() {
            return;
        }
        if let Some(block) = self.blocks.get_mut(ptr.0 as usize - 1) {
            block.live = false;
            block.slots.clear();
        }
    }

    fn block(&self, ptr: Ptr) -> Option<&Block> {
        if ptr.is_null() {
            return None;
        }
        self.blocks.get(ptr.0 as usize - 1).filter(|b| b.live)
    }

    fn block_mut(&mut self, ptr: Ptr) -> Option<&mut Block> {
        if ptr.is_null() {
            return None;
        }
        self.blocks.get_mut(ptr.0 as usize - 1).filter(|b| b.live)
    }

    /// Load the 8-byte slot at `offset_bytes` from `ptr` (`LOADPTR`).
    pub fn load(&self, ptr: Ptr, offset_bytes: i64) -> f64 {
        let idx = (offset_bytes / 8) as usize;
        self.block(ptr).and_then(|b| b.slots.get(idx)).copied().unwrap_or(0.0)
    }

    /// Store an 8-byte slot at `offset_bytes` from `ptr` (`STOREPTR`).
    pub fn store(&mut self, ptr: Ptr, offset_bytes: i64, value: f64) {
        let idx = (offset_bytes / 8) as usize;
        if let Some(block) = self.block_mut(ptr) {
            if idx >= block.slots.len() {
                block.slots.resize(idx + 1, 0.0);
            }
            block.slots[idx] = value;
        }
    }

    /// `array_size(arr)`: element count of the allocation backing `ptr`.
    pub fn array_size(&self, ptr: Ptr) -> i64 {
        self.block(ptr).map_or(0, |b| b.slots.len() as i64)
    }

    /// `array_get(arr, i)`: element at index `i`, or `0.0` out of bounds
    /// (bounds checking for user-visible errors happens in the interpreter,
    /// which has line information; this is the raw ABI-level accessor).
    pub fn array_get(&self, ptr: Ptr, index: i64) -> f64 {
        if index < 0 {
            return 0.0;
        }
        self.block(ptr)
            .and_then(|b| b.slots.get(index as usize))
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malloc_zero_initializes_and_free_is_null_safe() {
        let mut heap = Heap::new();
        let p = heap.es_malloc(64);
        assert!(!p.is_null());
        assert_eq!(heap.load(p, 0), 0.0);
        heap.es_free(Ptr::NULL);
        heap.es_free(p);
        heap.es_free(p); // double free is a no-op
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut heap = Heap::new();
        let p = heap.es_malloc(64);
        heap.store(p, 8, 42.0);
        assert_eq!(heap.load(p, 8), 42.0);
    }

    #[test]
    fn array_size_tracks_allocation_length() {
        let mut heap = Heap::new();
        let p = heap.es_malloc(3 * 8);
        heap.store(p, 0, 10.0);
        heap.store(p, 8, 20.0);
        heap.store(p, 16, 30.0);
        assert_eq!(heap.array_size(p), 3);
        assert_eq!(heap.array_get(p, 1), 20.0);
    }
}
