//! Redraw batching for `startAtomic` / `endAtomic`.

/// Nesting counter that folds redraw requests inside a batch into one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AtomicBatch {
    depth: u32,
    pending: bool,
}

impl AtomicBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Close one nesting level.
    ///
    /// # Returns
    /// `true` exactly once, when the outermost batch closes with an update
    /// pending. Closing with no open batch does nothing.
    pub fn end(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        if self.depth == 0 && self.pending {
            self.pending = false;
            return true;
        }
        false
    }

    /// Ask for an update.
    ///
    /// # Returns
    /// `true` when the caller should update now; inside a batch the request
    /// is remembered instead.
    pub fn request_update(&mut self) -> bool {
        if self.depth == 0 {
            return true;
        }
        self.pending = true;
        false
    }

    pub fn in_batch(&self) -> bool {
        self.depth > 0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_outside_a_batch_run_immediately() {
        let mut batch = AtomicBatch::new();
        assert!(batch.request_update());
        assert!(!batch.end());
        assert!(!batch.in_batch());
    }

    #[test]
    fn requests_inside_a_batch_fold_into_one() {
        let mut batch = AtomicBatch::new();
        batch.begin();
        for _ in 0..5 {
            assert!(!batch.request_update());
        }
        assert!(batch.end());
        assert!(!batch.end());
    }

    #[test]
    fn empty_batch_produces_no_update() {
        let mut batch = AtomicBatch::new();
        batch.begin();
        assert!(!batch.end());
    }

    #[test]
    fn nested_batches_update_only_at_the_outermost_end() {
        let mut batch = AtomicBatch::new();
        batch.begin();
        batch.begin();
        assert!(!batch.request_update());
        assert!(!batch.end());
        assert!(batch.in_batch());
        assert!(batch.end());
    }
}
