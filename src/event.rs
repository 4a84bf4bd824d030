//! Multicast event with re-entrancy safe firing
//!
//! Listeners may add or remove listeners (including themselves) while the event
//! is firing. Additions are not called until the next `fire`; removals take
//! effect once the current `fire` returns.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`Event::add_listener`], used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<A> = Rc<dyn Fn(&A)>;

pub struct Event<A: ?Sized> {
    listeners: RefCell<Vec<(ListenerId, Listener<A>)>>,
    pending_removal: RefCell<Vec<ListenerId>>,
    firing: Cell<u32>,
    next_id: Cell<u64>,
}

impl<A: ?Sized> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listeners.borrow().len())
            .field("firing", &self.is_firing())
            .finish()
    }
}

impl<A: ?Sized> Event<A> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            pending_removal: RefCell::new(Vec::new()),
            firing: Cell::new(0),
            next_id: Cell::new(1),
        }
    }

    /// Append a listener; it is called on every subsequent `fire`
    pub fn add_listener(&self, listener: impl Fn(&A) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. While firing, the removal is queued until `fire` returns.
    pub fn remove_listener(&self, id: ListenerId) {
        if self.is_firing() {
            self.pending_removal.borrow_mut().push(id);
        } else {
            let mut listeners = self.listeners.borrow_mut();
            if let Some(index) = listeners.iter().position(|(l, _)| *l == id) {
                listeners.remove(index);
            }
        }
    }

    /// Invoke every listener registered when the call began, in registration order
    pub fn fire(&self, args: &A) {
        // Snapshot so listeners are free to add/remove while we iterate
        let snapshot: Vec<Listener<A>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();

        self.firing.set(self.firing.get() + 1);
        for listener in &snapshot {
            listener(args);
        }
        self.firing.set(self.firing.get() - 1);

        if !self.is_firing() {
            let pending = std::mem::take(&mut *self.pending_removal.borrow_mut());
            for id in pending {
                self.remove_listener(id);
            }
        }
    }

    pub fn is_firing(&self) -> bool {
        self.firing.get() > 0
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}
