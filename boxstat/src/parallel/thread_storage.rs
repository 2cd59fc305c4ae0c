//! Per-worker scratch copies of a dense result buffer
//!
//! Every worker of a parallel pass owns exactly one partition for the duration of
//! the pass (see [`super::WorkerPool::for_each_partition`]), so scattering needs
//! neither locks nor atomics. After the pass (which acts as the join barrier) a
//! single writer sums all partitions into the shared result.

use std::ops::AddAssign;

use crossbeam::utils::CachePadded;
use num::Zero;

/// Dense buffers of `len` elements, one per worker, allocated on first write
pub struct ThreadStorage<T> {
    len: usize,
    slots: Vec<CachePadded<Option<Vec<T>>>>,
}

/// Mutable handle on one partition, handed to a single worker
pub struct LocalPartition<'a, T> {
    len: usize,
    slot: &'a mut Option<Vec<T>>,
}

impl<'a, T> LocalPartition<'a, T>
    where T: Copy + Zero
{
    /// Buffer of this partition (zero-initialized on first use)
    pub fn buffer(&mut self) -> &mut [T] {
        let len = self.len;
        self.slot.get_or_insert_with(|| vec![T::zero(); len])
    }
}

impl<T> ThreadStorage<T>
    where T: Copy + Zero + AddAssign + Send
{
    pub fn new(len: usize, num_partitions: usize) -> Self {
        let slots = (0..num_partitions)
            .map(|_| CachePadded::new(None))
            .collect::<Vec<_>>();
        Self { len, slots }
    }

    /// Number of elements in every partition
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_partitions(&self) -> usize {
        self.slots.len()
    }

    /// Disjoint handles on all partitions, in slot order
    pub fn partitions_mut(&mut self) -> impl Iterator<Item = LocalPartition<'_, T>> {
        let len = self.len;
        self.slots.iter_mut()
            .map(move |slot| LocalPartition { len, slot: &mut **slot })
    }

    /// Number of partitions that have been written to
    pub fn num_allocated(&self) -> usize {
        self.slots.iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    /// Replace the contents of `out` with the element-wise sum of all partitions.
    /// Partitions are summed in slot order; the partitions themselves are kept.
    pub fn reduce_into(&self, out: &mut [T]) {
        assert_eq!(out.len(), self.len, "Reduction target has the wrong length");
        out.iter_mut().for_each(|x| *x = T::zero());
        for slot in &self.slots {
            if let Some(buffer) = &**slot {
                for (o, v) in out.iter_mut().zip(buffer.iter()) {
                    *o += *v;
                }
            }
        }
    }

    /// Discard all partitions
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            **slot = None;
        }
    }
}
