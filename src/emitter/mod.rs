//! Prioritized publish/subscribe events.
//!
//! An [`EventEmitter`] maps event names to listener lists ordered by
//! priority (lower numbers run first, ties in registration order). Event
//! names form a `.`-separated hierarchy with wildcard listeners: emitting
//! `"foo.bar.baz"` also reaches listeners on `"foo.bar.*"`, `"foo.*"` and
//! the global `"*"`.
//!
//! Listeners return [`ControlFlow`]: `Break` halts the emission and makes
//! [`emit`](EventEmitter::emit) report `false`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::rc::Rc;

/// Priority assigned when the caller has no preference.
pub const DEFAULT_PRIORITY: i32 = 100;

/// A registered event listener.
///
/// Listeners are shared callbacks; the `Rc` allocation is also the
/// listener's identity for [`remove_listener`](EventEmitter::remove_listener).
/// Returning `ControlFlow::Break(())` stops the emission.
pub type Listener<A> = Rc<dyn Fn(&A) -> ControlFlow<()>>;

struct Entry<A> {
    priority: i32,
    /// Global registration order, breaks priority ties, including across
    /// the multiple name keys a wildcard lookup merges.
    seq: u64,
    callback: Listener<A>,
}

struct Registry<A> {
    map: HashMap<String, Vec<Entry<A>>>,
    next_seq: u64,
}

/// A publish/subscribe event emitter with listener priorities and
/// hierarchical wildcard matching.
///
/// The payload type `A` is chosen by the embedder and passed to listeners
/// by reference; use a tuple for multi-argument events. Cloning the
/// emitter is cheap and every clone shares the same listener registry.
///
/// # Examples
///
/// ```rust
/// use std::cell::RefCell;
/// use std::ops::ControlFlow;
/// use std::rc::Rc;
/// use tactus::{DEFAULT_PRIORITY, EventEmitter, Listener};
///
/// let emitter: EventEmitter<String> = EventEmitter::new();
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let log = seen.clone();
/// let listener: Listener<String> = Rc::new(move |name| {
///     log.borrow_mut().push(name.clone());
///     ControlFlow::Continue(())
/// });
/// emitter.on(&["user.created"], listener, DEFAULT_PRIORITY);
///
/// assert!(emitter.emit("user.created", &"alice".to_string()));
/// assert_eq!(seen.borrow().as_slice(), ["alice"]);
/// ```
pub struct EventEmitter<A> {
    registry: Rc<RefCell<Registry<A>>>,
}

impl<A> Clone for EventEmitter<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<A: 'static> Default for EventEmitter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> EventEmitter<A> {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                map: HashMap::new(),
                next_seq: 0,
            })),
        }
    }

    /// Subscribes a listener to one or more event names.
    ///
    /// Each name's listener list stays sorted ascending by priority; equal
    /// priorities keep registration order.
    pub fn on(&self, names: &[&str], callback: Listener<A>, priority: i32) {
        let mut registry = self.registry.borrow_mut();
        for name in names {
            log::trace!("listener registered for '{name}' at priority {priority}");
            let seq = registry.next_seq;
            registry.next_seq += 1;
            let entries = registry.map.entry((*name).to_owned()).or_default();
            let at = entries.partition_point(|e| e.priority <= priority);
            entries.insert(
                at,
                Entry {
                    priority,
                    seq,
                    callback: Rc::clone(&callback),
                },
            );
        }
    }

    /// Subscribes a listener to an event name for a single invocation.
    ///
    /// The listener is removed *before* it is invoked, so it fires at most
    /// once even when the event is emitted again re-entrantly from inside
    /// the callback.
    pub fn once(&self, name: &str, callback: Listener<A>, priority: i32) {
        // The wrapper needs its own Rc identity to deregister itself, so
        // it takes it out of this slot on first invocation.
        let slot: Rc<RefCell<Option<Listener<A>>>> = Rc::new(RefCell::new(None));

        let emitter = self.clone();
        let event = name.to_owned();
        let taken = Rc::clone(&slot);
        let wrapper: Listener<A> = Rc::new(move |args: &A| {
            let me = taken.borrow_mut().take();
            match me {
                Some(me) => {
                    emitter.remove_listener(&[event.as_str()], &me);
                    (*callback)(args)
                }
                None => ControlFlow::Continue(()),
            }
        });

        *slot.borrow_mut() = Some(Rc::clone(&wrapper));
        self.on(&[name], wrapper, priority);
    }

    /// Emits an event.
    ///
    /// Every matching listener runs in priority order with `args`. A
    /// listener returning `Break` halts the emission immediately; `emit`
    /// then returns `false`, and `true` otherwise.
    pub fn emit(&self, name: &str, args: &A) -> bool {
        for listener in self.listeners(name) {
            if (*listener)(args).is_break() {
                return false;
            }
        }
        true
    }

    /// Emits an event with a continuation gate.
    ///
    /// The gate runs between every pair of consecutive listener
    /// invocations: with five listeners it runs at most four times, and
    /// never after the last. A gate `Break` stops the emission but still
    /// counts as successful (`true` is returned), unlike a listener
    /// `Break`: the gate halting propagation is the embedder's own logic
    /// deciding it is done, not a listener breaking the chain.
    pub fn emit_gated(
        &self,
        name: &str,
        args: &A,
        gate: &mut dyn FnMut() -> ControlFlow<()>,
    ) -> bool {
        let listeners = self.listeners(name);
        let mut remaining = listeners.len();

        for listener in listeners {
            remaining -= 1;
            if (*listener)(args).is_break() {
                return false;
            }
            if remaining > 0 && gate().is_break() {
                break;
            }
        }
        true
    }

    /// Returns the listeners matching an event name, in invocation order.
    ///
    /// Wildcard listeners match through the name hierarchy:
    /// `"foo.bar.baz"` is matched by `"foo.bar.baz"`, `"foo.bar.*"`,
    /// `"foo.*"` and `"*"`. The merged result is ordered by priority,
    /// ties by registration order.
    pub fn listeners(&self, name: &str) -> Vec<Listener<A>> {
        let registry = self.registry.borrow();

        let mut matched: Vec<(i32, u64, Listener<A>)> = Vec::new();
        for key in matching_keys(name) {
            if let Some(entries) = registry.map.get(&key) {
                matched.extend(
                    entries
                        .iter()
                        .map(|e| (e.priority, e.seq, Rc::clone(&e.callback))),
                );
            }
        }

        matched.sort_by_key(|&(priority, seq, _)| (priority, seq));
        matched.into_iter().map(|(_, _, callback)| callback).collect()
    }

    /// Removes a listener from the given event names, by identity.
    ///
    /// Only exact name keys are touched; removing from `"foo.bar"` does
    /// not reach a `"foo.*"` registration. Returns whether at least one
    /// entry was removed across all given names.
    pub fn remove_listener(&self, names: &[&str], listener: &Listener<A>) -> bool {
        let mut registry = self.registry.borrow_mut();
        let mut removed = false;

        for name in names {
            if let Some(entries) = registry.map.get_mut(*name) {
                let before = entries.len();
                entries.retain(|e| !Rc::ptr_eq(&e.callback, listener));
                if entries.len() != before {
                    log::trace!("listener removed from '{name}'");
                    removed = true;
                }
            }
        }
        removed
    }

    /// Removes every listener for one event name, or all listeners for all
    /// names when `name` is `None`.
    pub fn remove_all_listeners(&self, name: Option<&str>) {
        let mut registry = self.registry.borrow_mut();
        match name {
            Some(name) => {
                registry.map.remove(name);
            }
            None => registry.map.clear(),
        }
    }
}

/// The name keys consulted for an emission, most specific first: the exact
/// name, then each suffix-truncated prefix with a `*` tail, then the
/// global `*`.
fn matching_keys(name: &str) -> Vec<String> {
    let mut keys = vec![name.to_owned()];
    let mut parts: Vec<&str> = name.split('.').collect();

    loop {
        match parts.pop() {
            Some(last) if !last.is_empty() => {
                if parts.is_empty() {
                    keys.push("*".to_owned());
                } else {
                    keys.push(format!("{}.*", parts.join(".")));
                }
            }
            _ => break,
        }
    }
    keys
}
