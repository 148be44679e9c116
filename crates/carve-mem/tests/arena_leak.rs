// Arena teardown and leak reporting tests
//
// Dropping a FixedArena releases its buffer no matter how many blocks are
// still outstanding. These tests exercise the leak report path (logged at
// warn/debug through carve-log) and the resource-level lifetime rules.

#[cfg(test)]
mod leak_reporting_tests {
    use std::alloc::Layout;
    use std::rc::Rc;

    use carve_log::Level;
    use carve_mem::{FixedArena, MemoryResource};

    /// Dropping with live blocks reports them instead of failing
    #[test]
    fn test_drop_with_outstanding_blocks() {
        carve_log::set_level(Level::Debug);

        let arena = FixedArena::new(4096).unwrap();
        let _a = arena.allocate(16, 8).unwrap();
        let _b = arena.allocate(200, 64).unwrap();
        let _c = arena.allocate(1, 0).unwrap();
        assert_eq!(arena.stats().live_blocks, 3);

        // Arena drops here and logs three leaked blocks
    }

    /// A fully returned arena drops silently
    #[test]
    fn test_drop_after_full_release() {
        let arena = FixedArena::new(4096).unwrap();
        let blocks: Vec<_> =
            (1..=8).map(|i| (arena.allocate(i * 8, 8).unwrap(), i * 8)).collect();
        for (ptr, size) in blocks {
            unsafe { arena.deallocate(ptr.as_ptr(), size) };
        }
        assert_eq!(arena.stats().live_blocks, 0);
    }

    /// Shared ownership keeps the arena alive for as long as any user holds it
    #[test]
    fn test_rc_resource_outlives_first_handle() {
        let arena = Rc::new(FixedArena::new(1024).unwrap());
        let user: Rc<FixedArena> = Rc::clone(&arena);
        drop(arena);

        let layout = Layout::new::<[u64; 8]>();
        let block = user.alloc(layout).unwrap();
        assert_eq!(user.stats().live_bytes, 64);
        unsafe { user.dealloc(block, layout) };
        assert_eq!(user.stats().live_bytes, 0);
    }

    /// A reused address is released with the size of its current block
    #[test]
    fn test_reused_address_releases_current_size() {
        let arena = FixedArena::new(256).unwrap();
        let a = arena.allocate(64, 0).unwrap();
        unsafe { arena.deallocate(a.as_ptr(), 64) };

        // Same address, smaller block; the caller's stale size is ignored.
        let b = arena.allocate(32, 0).unwrap();
        assert_eq!(a, b);
        unsafe { arena.deallocate(b.as_ptr(), 64) };
        arena.check_invariants().unwrap();
    }
}
