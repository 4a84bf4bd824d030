//! Ordered list that tolerates mutation while it is being iterated
//!
//! While a `for_each` traversal is active the list is "locked": `append`,
//! `remove` and `clear` are queued and applied in call order once the outermost
//! traversal finishes. Consequently items appended during a traversal are not
//! visited by it, and items removed during a traversal are still visited.

use std::cell::{Cell, RefCell};
use std::fmt;

enum Pending<T> {
    Append(T),
    Remove(T),
    Clear,
}

pub struct LockingList<T> {
    items: RefCell<Vec<T>>,
    pending: RefCell<Vec<Pending<T>>>,
    depth: Cell<u32>,
}

impl<T> Default for LockingList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LockingList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockingList")
            .field("items", &self.items.borrow())
            .field("locked", &self.is_locked())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

/// Decrements the lock depth even if a callback unwinds
struct LockGuard<'a> {
    depth: &'a Cell<u32>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

impl<T> LockingList<T> {
    pub fn new() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            depth: Cell::new(0),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.depth.get() > 0
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn append(&self, item: T) {
        if self.is_locked() {
            self.pending.borrow_mut().push(Pending::Append(item));
        } else {
            self.items.borrow_mut().push(item);
        }
    }

    pub fn clear(&self) {
        if self.is_locked() {
            self.pending.borrow_mut().push(Pending::Clear);
        } else {
            self.items.borrow_mut().clear();
        }
    }
}

impl<T: PartialEq> LockingList<T> {
    /// Visit every item present when the traversal starts, in order
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        {
            self.depth.set(self.depth.get() + 1);
            let _guard = LockGuard { depth: &self.depth };
            let items = self.items.borrow();
            for item in items.iter() {
                f(item);
            }
        }

        if !self.is_locked() {
            self.flush();
        }
    }

    fn flush(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        if pending.is_empty() {
            return;
        }

        let mut items = self.items.borrow_mut();
        for op in pending {
            match op {
                Pending::Append(item) => items.push(item),
                Pending::Remove(item) => remove_first(&mut items, &item),
                Pending::Clear => items.clear(),
            }
        }
    }

    /// Remove the first occurrence of `item`
    pub fn remove(&self, item: &T)
    where
        T: Clone,
    {
        if self.is_locked() {
            self.pending.borrow_mut().push(Pending::Remove(item.clone()));
        } else {
            remove_first(&mut self.items.borrow_mut(), item);
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.borrow().contains(item)
    }
}

impl<T: Clone> LockingList<T> {
    /// Copy of the current items (pending mutations excluded)
    pub fn to_vec(&self) -> Vec<T> {
        self.items.borrow().clone()
    }
}

fn remove_first<T: PartialEq>(items: &mut Vec<T>, item: &T) {
    if let Some(index) = items.iter().position(|i| i == item) {
        items.remove(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_append_during_traversal_is_deferred() {
        let list = LockingList::new();
        list.append(1);
        list.append(2);

        let mut seen = Vec::new();
        list.for_each(|&i| {
            seen.push(i);
            list.append(i * 10);
        });

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(list.to_vec(), vec![1, 2, 10, 20]);
    }

    #[test]
    fn test_removed_items_still_visited_this_traversal() {
        let list = LockingList::new();
        for i in 0..4 {
            list.append(i);
        }

        let mut seen = Vec::new();
        list.for_each(|&i| {
            seen.push(i);
            if i == 0 {
                list.remove(&2);
                list.remove(&3);
            }
        });

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(list.to_vec(), vec![0, 1]);
    }

    #[test]
    fn test_pending_ops_apply_in_call_order() {
        let list = LockingList::new();
        list.append("a");

        list.for_each(|_| {
            list.append("b");
            list.clear();
            list.append("c");
        });

        assert_eq!(list.to_vec(), vec!["c"]);
    }

    #[test]
    fn test_nested_traversal_flushes_once_outermost_finishes() {
        let list = LockingList::new();
        list.append(1);

        list.for_each(|_| {
            list.for_each(|_| list.append(2));
            assert!(list.is_locked());
            assert_eq!(list.len(), 1);
        });

        assert!(!list.is_locked());
        assert_eq!(list.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_entity_handles_removed_by_identity() {
        use crate::scene::{Entity, EntityRef};

        let list: LockingList<EntityRef> = LockingList::new();
        let a = EntityRef::new(Entity::new(0.0, 0.0));
        let b = EntityRef::new(Entity::new(0.0, 0.0));
        list.append(a.clone());
        list.append(b.clone());

        let mut visited = 0;
        list.for_each(|e| {
            visited += 1;
            if *e == a {
                list.remove(e);
            }
        });

        assert_eq!(visited, 2);
        assert!(!list.contains(&a));
        assert!(list.contains(&b));
        assert_eq!(list.len(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append(u8),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u8>().prop_map(Op::Append),
            any::<u8>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_traversal_sees_exactly_the_starting_items(
            initial in proptest::collection::vec(any::<u8>(), 0..16),
            ops in proptest::collection::vec(op(), 0..16),
        ) {
            let list = LockingList::new();
            for &i in &initial {
                list.append(i);
            }

            let mut seen = Vec::new();
            let mut ops_iter = ops.iter();
            list.for_each(|&i| {
                seen.push(i);
                if let Some(op) = ops_iter.next() {
                    match op {
                        Op::Append(v) => list.append(*v),
                        Op::Remove(v) => list.remove(v),
                    }
                }
            });
            prop_assert_eq!(&seen, &initial);

            // Replay the ops that ran against a plain Vec
            let mut expected = initial.clone();
            for op in ops.iter().take(initial.len()) {
                match op {
                    Op::Append(v) => expected.push(*v),
                    Op::Remove(v) => {
                        if let Some(idx) = expected.iter().position(|x| x == v) {
                            expected.remove(idx);
                        }
                    }
                }
            }
            prop_assert_eq!(list.to_vec(), expected.clone());

            let mut next = Vec::new();
            list.for_each(|&i| next.push(i));
            prop_assert_eq!(next, expected);
        }
    }
}
