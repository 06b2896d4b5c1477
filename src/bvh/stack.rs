/// Inline capacity of a [`TraversalStack`] unless stated otherwise.
pub const TRAVERSAL_STACK_SIZE: usize = 16;

/// LIFO stack of pending nodes used by every traversal.
///
/// The first `N` entries live inline, so a traversal of a tree of the expected depth never
/// allocates. Deeper trees (degenerate geometry, or a custom builder with huge leaves or
/// unbalanced splits) keep working: further entries spill to the heap, and
/// [`TraversalStack::spilled`] reports that this happened.
#[derive(Debug, Clone)]
pub struct TraversalStack<T: Copy + Default, const N: usize = TRAVERSAL_STACK_SIZE> {
    data: [T; N],
    index: usize,
    spill: Vec<T>,
    spilled: bool,
}

impl<T: Copy + Default, const N: usize> Default for TraversalStack<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default, const N: usize> TraversalStack<T, N> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        TraversalStack {
            data: [T::default(); N],
            index: 0,
            spill: Vec::new(),
            spilled: false,
        }
    }

    #[inline(always)]
    pub fn push(&mut self, v: T) {
        if self.index < N {
            self.data[self.index] = v;
            self.index += 1;
        } else {
            self.spill.push(v);
            self.spilled = true;
        }
    }

    // Entries only go to `spill` while the inline part is full, so popping the spill
    // first keeps the LIFO order.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        if let Some(v) = self.spill.pop() {
            return Some(v);
        }
        if self.index > 0 {
            self.index -= 1;
            Some(self.data[self.index])
        } else {
            None
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.index + self.spill.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the inline capacity was ever exceeded.
    pub fn spilled(&self) -> bool {
        self.spilled
    }
}
