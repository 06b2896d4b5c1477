use std::cell::RefCell;

use crate::aabb::Aabb;

/// A bin of the binned split search. Counts the primitives whose centroid falls into it
/// and bounds their boxes.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Bucket {
    /// The number of primitives in this [`Bucket`].
    pub size: u32,

    /// The joint [`Aabb`] of the primitives in this [`Bucket`].
    pub aabb: Aabb,
}

impl Bucket {
    /// Returns an empty bucket.
    pub fn empty() -> Bucket {
        Bucket {
            size: 0,
            aabb: Aabb::empty(),
        }
    }

    /// Extend this [`Bucket`] by a primitive with the given [`Aabb`].
    pub fn add_aabb(&mut self, aabb: &Aabb) {
        self.size += 1;
        self.aabb.join_mut(aabb);
    }

    /// Join the contents of two [`Bucket`]s.
    pub fn join_bucket(a: Bucket, b: &Bucket) -> Bucket {
        Bucket {
            size: a.size + b.size,
            aabb: a.aabb.join(&b.aabb),
        }
    }
}

thread_local! {
    /// Thread local for the buckets used while building to reduce allocations during build
    static BUCKETS: RefCell<Vec<Bucket>> = const { RefCell::new(Vec::new()) };
}

/// Runs `closure` with `count` empty buckets taken from the thread local pool.
pub(crate) fn with_buckets<R>(count: usize, closure: impl FnOnce(&mut [Bucket]) -> R) -> R {
    BUCKETS.with(move |buckets| {
        let mut buckets = buckets.borrow_mut();
        buckets.clear();
        buckets.resize(count, Bucket::empty());
        closure(&mut buckets)
    })
}
