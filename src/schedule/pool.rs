//! Reusable object slab
//!
//! Items are allocated up front (or when the pool grows) and never freed.
//! The backing array is split in two: reusable items first, live items after.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::ScheduleError;

/// Size used when a pool is created with an initial size of zero
pub const DEFAULT_INITIAL_SIZE: usize = 10;

type Validate<T> = Box<dyn Fn(&T) -> bool>;
type Allocate<T> = Box<dyn FnMut() -> T>;
type Hook<T> = Box<dyn FnMut(&mut T)>;

/// A pool of reusable `T`.
///
/// Logical index `i` in `[0, valid_count)` is a live item. Indices are not
/// stable across [`Pool::clean_up`].
pub struct Pool<T> {
    items: Vec<T>,
    invalid_count: usize,
    growth: usize,
    validate: Validate<T>,
    allocate: Allocate<T>,
    on_initialize: Option<Hook<T>>,
    on_deinitialize: Option<Hook<T>>,
}

impl<T> Pool<T> {
    /// Pool whose items come from `allocate`.
    ///
    /// `validate` decides during [`Pool::clean_up`] whether a live item stays live.
    pub fn new(
        initial_size: usize,
        growth: usize,
        validate: impl Fn(&T) -> bool + 'static,
        mut allocate: impl FnMut() -> T + 'static,
    ) -> Result<Self, ScheduleError> {
        if growth == 0 {
            return Err(ScheduleError::ZeroGrowth);
        }
        let initial_size = if initial_size == 0 {
            DEFAULT_INITIAL_SIZE
        } else {
            initial_size
        };
        let items: Vec<T> = (0..initial_size).map(|_| allocate()).collect();
        Ok(Self {
            invalid_count: items.len(),
            items,
            growth,
            validate: Box::new(validate),
            allocate: Box::new(allocate),
            on_initialize: None,
            on_deinitialize: None,
        })
    }

    /// Run `hook` on every item handed out by [`Pool::spawn`]
    pub fn set_on_initialize(&mut self, hook: impl FnMut(&mut T) + 'static) {
        self.on_initialize = Some(Box::new(hook));
    }

    /// Run `hook` on every item retired by [`Pool::clean_up`]
    pub fn set_on_deinitialize(&mut self, hook: impl FnMut(&mut T) + 'static) {
        self.on_deinitialize = Some(Box::new(hook));
    }

    /// Hand out a reusable item, growing the pool if none is left.
    pub fn spawn(&mut self) -> &mut T {
        if self.invalid_count == 0 {
            self.grow();
        }
        self.invalid_count -= 1;
        let item = &mut self.items[self.invalid_count];
        if let Some(hook) = self.on_initialize.as_mut() {
            hook(item);
        }
        item
    }

    fn grow(&mut self) {
        let old = self.items.len();
        log::debug!("Resizing pool. Old size: {}. New size: {}", old, old + self.growth);
        let mut items: Vec<T> = Vec::with_capacity(old + self.growth);
        items.extend((0..self.growth).map(|_| (self.allocate)()));
        items.append(&mut self.items);
        self.items = items;
        self.invalid_count += self.growth;
    }

    /// Move every live item that no longer validates into the reusable region.
    ///
    /// Returns the number of items retired.
    pub fn clean_up(&mut self) -> usize {
        let mut retired = 0;
        for i in self.invalid_count..self.items.len() {
            if (self.validate)(&self.items[i]) {
                continue;
            }
            self.items.swap(i, self.invalid_count);
            if let Some(hook) = self.on_deinitialize.as_mut() {
                hook(&mut self.items[self.invalid_count]);
            }
            self.invalid_count += 1;
            retired += 1;
        }
        retired
    }

    #[inline]
    pub fn valid_count(&self) -> usize {
        self.items.len() - self.invalid_count
    }

    #[inline]
    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.valid_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.valid_slice_mut().get_mut(index)
    }

    /// Live items in logical order
    pub fn valid_slice(&self) -> &[T] {
        &self.items[self.invalid_count..]
    }

    pub fn valid_slice_mut(&mut self) -> &mut [T] {
        &mut self.items[self.invalid_count..]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.valid_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.valid_slice_mut().iter_mut()
    }
}

impl<T: Default + 'static> Pool<T> {
    /// Pool allocating with `T::default()`
    pub fn with_default(
        initial_size: usize,
        growth: usize,
        validate: impl Fn(&T) -> bool + 'static,
    ) -> Result<Self, ScheduleError> {
        Self::new(initial_size, growth, validate, T::default)
    }
}

impl<T> Index<usize> for Pool<T> {
    type Output = T;

    /// Panics when `index >= valid_count()`
    fn index(&self, index: usize) -> &T {
        let valid = self.valid_count();
        assert!(index < valid, "pool index {index} out of range (valid count {valid})");
        &self.items[self.invalid_count + index]
    }
}

impl<T> IndexMut<usize> for Pool<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let valid = self.valid_count();
        assert!(index < valid, "pool index {index} out of range (valid count {valid})");
        &mut self.items[self.invalid_count + index]
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("valid", &self.valid_count())
            .field("invalid", &self.invalid_count)
            .field("growth", &self.growth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Default)]
    struct Slot {
        alive: bool,
        id: u32,
    }

    fn slots(initial: usize) -> Pool<Slot> {
        Pool::with_default(initial, 20, |s: &Slot| s.alive).unwrap()
    }

    fn assert_partitioned(pool: &Pool<Slot>) {
        for (i, item) in pool.items.iter().enumerate() {
            if i < pool.invalid_count {
                assert!(!item.alive, "slot {i} in reusable region is alive");
            } else {
                assert!(item.alive, "slot {i} in live region is dead");
            }
        }
        assert_eq!(pool.valid_count() + pool.invalid_count(), pool.capacity());
    }

    #[test]
    fn test_zero_initial_size_uses_default() {
        let pool = slots(0);
        assert_eq!(pool.capacity(), DEFAULT_INITIAL_SIZE);
        assert_eq!(pool.valid_count(), 0);
    }

    #[test]
    fn test_zero_growth_rejected() {
        assert!(matches!(
            Pool::<Slot>::with_default(4, 0, |s| s.alive),
            Err(ScheduleError::ZeroGrowth)
        ));
    }

    #[test]
    fn test_growth_past_initial_size() {
        let mut pool = slots(10);
        for id in 0..25 {
            let slot = pool.spawn();
            slot.alive = true;
            slot.id = id;
        }
        assert_eq!(pool.valid_count(), 25);
        assert_eq!(pool.capacity(), 30);
        let mut ids: Vec<u32> = pool.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_clean_up_retires_and_reuses() {
        let mut pool = slots(4);
        for id in 0..4 {
            let slot = pool.spawn();
            slot.alive = true;
            slot.id = id;
        }
        pool[1].alive = false;
        pool[3].alive = false;
        assert_eq!(pool.clean_up(), 2);
        assert_eq!(pool.valid_count(), 2);
        assert_partitioned(&pool);

        // Reuse does not grow the pool
        pool.spawn().alive = true;
        pool.spawn().alive = true;
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.valid_count(), 4);
    }

    #[test]
    fn test_hooks_run_on_spawn_and_retire() {
        let spawned = Rc::new(Cell::new(0));
        let retired = Rc::new(Cell::new(0));
        let mut pool = slots(2);
        let s = spawned.clone();
        pool.set_on_initialize(move |slot| {
            slot.alive = true;
            s.set(s.get() + 1);
        });
        let r = retired.clone();
        pool.set_on_deinitialize(move |slot| {
            slot.id = 0;
            r.set(r.get() + 1);
        });

        pool.spawn().id = 7;
        pool.spawn().id = 8;
        pool[0].alive = false;
        pool.clean_up();
        assert_eq!(spawned.get(), 2);
        assert_eq!(retired.get(), 1);
        assert_eq!(pool.items[0].id, 0);
    }

    #[test]
    fn test_get_out_of_range() {
        let mut pool = slots(3);
        pool.spawn().alive = true;
        assert!(pool.get(0).is_some());
        assert!(pool.get(1).is_none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_index_past_valid_count_panics() {
        let pool = slots(3);
        let _ = &pool[0];
    }

    #[derive(Debug, Clone)]
    enum Op {
        Spawn,
        Kill(usize),
        CleanUp,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Spawn),
            2 => (0usize..64).prop_map(Op::Kill),
            1 => Just(Op::CleanUp),
        ]
    }

    proptest! {
        #[test]
        fn prop_partition_holds_after_clean_up(ops in prop::collection::vec(op(), 0..200)) {
            let mut pool = slots(0);
            let mut live = 0usize;
            for op in ops {
                match op {
                    Op::Spawn => {
                        pool.spawn().alive = true;
                        live += 1;
                    }
                    Op::Kill(i) => {
                        let valid = pool.valid_count();
                        if valid > 0 && pool[i % valid].alive {
                            pool[i % valid].alive = false;
                            live -= 1;
                        }
                    }
                    Op::CleanUp => {
                        pool.clean_up();
                        assert_partitioned(&pool);
                        prop_assert_eq!(pool.valid_count(), live);
                    }
                }
            }
            pool.clean_up();
            assert_partitioned(&pool);
            prop_assert_eq!(pool.valid_count(), live);
        }
    }
}
