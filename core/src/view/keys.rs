//! Process-wide keyboard listener registry.
//!
//! A subscription is held by a [`KeyListener`]; dropping it removes the
//! registration, so a view that goes away cannot leave a dangling handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Character(char),
    Other,
}

struct Listener {
    key: Key,
    sender: UnboundedSender<Key>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: HashMap<u64, Listener>,
}

#[derive(Clone, Default)]
pub struct KeyListenerRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl KeyListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in one key until the returned listener is dropped.
    pub fn subscribe(&self, key: Key) -> KeyListener {
        let (sender, receiver) = unbounded_channel();
        let id = {
            let mut listeners = lock(&self.inner);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.insert(id, Listener { key, sender });
            id
        };
        KeyListener {
            id,
            registry: Arc::downgrade(&self.inner),
            receiver,
        }
    }

    /// Delivers a key press to every matching listener; returns how many
    /// received it.
    pub fn dispatch(&self, key: Key) -> usize {
        lock(&self.inner)
            .entries
            .values()
            .filter(|listener| listener.key == key)
            .filter(|listener| listener.sender.send(key).is_ok())
            .count()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).entries.len()
    }
}

// A panic elsewhere while holding the lock leaves the map itself intact.
fn lock(inner: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct KeyListener {
    id: u64,
    registry: Weak<Mutex<Listeners>>,
    receiver: UnboundedReceiver<Key>,
}

impl KeyListener {
    /// Next queued key press, if any. Never blocks.
    pub fn try_next(&mut self) -> Option<Key> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            lock(&inner).entries.remove(&self.id);
        }
    }
}
