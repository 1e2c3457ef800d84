/// Opaque handle issued by a map engine for one live marker.
///
/// Handles are never reused within one engine instance, so two handles compare
/// equal exactly when they refer to the same engine-side marker object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
    pub fn new(raw: u64) -> Self {
        Handle(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Monotonic handle allocator.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Handle {
        self.next += 1;
        Handle(self.next)
    }
}
