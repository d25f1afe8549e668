//! Keyboard input: the host-side [`KeyboardHub`], scoped [`KeyListener`]s
//! and the per-vehicle [`InputState`].
//!
//! A listener is registered by [`KeyboardHub::listen`] and unregistered when
//! the returned guard is dropped, so every exit path of the owner releases
//! it.
//!
//! # Example
//!
//! ```rust
//! use drivesim_control::input::{InputState, KeyboardHub};
//! use drivesim_types::ControlKey;
//!
//! let hub = KeyboardHub::new();
//! let mut listener = hub.listen();
//! let mut input = InputState::default();
//!
//! hub.key_down("w");
//! input.pump(&mut listener);
//! assert!(input.snapshot().is_held(ControlKey::Forward));
//!
//! drop(listener);
//! assert_eq!(hub.listener_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use drivesim_types::ControlKey;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

/// A raw key edge from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: String,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn down(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            pressed: true,
        }
    }

    pub fn up(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            pressed: false,
        }
    }
}

/// Mapping from host key codes to [`ControlKey`]s.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<String, ControlKey>,
}

impl Default for KeyMap {
    fn default() -> Self {
        let mut map = Self {
            bindings: HashMap::new(),
        };
        for (code, key) in [
            ("w", ControlKey::Forward),
            ("ArrowUp", ControlKey::Forward),
            ("s", ControlKey::Backward),
            ("ArrowDown", ControlKey::Backward),
            ("a", ControlKey::Left),
            ("ArrowLeft", ControlKey::Left),
            ("d", ControlKey::Right),
            ("ArrowRight", ControlKey::Right),
            (" ", ControlKey::Brake),
            ("r", ControlKey::Reset),
        ] {
            map.bind(code, key);
        }
        map
    }
}

impl KeyMap {
    /// A map with no bindings.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind `code` to `key`, replacing any previous binding for `code`.
    pub fn bind(&mut self, code: impl Into<String>, key: ControlKey) {
        self.bindings.insert(code.into(), key);
    }

    pub fn lookup(&self, code: &str) -> Option<ControlKey> {
        self.bindings.get(code).copied()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// KeyboardHub
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Registry {
    next_id: u64,
    senders: HashMap<u64, UnboundedSender<KeyEvent>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Host-side key event source.  Clone it cheaply – clones share the same
/// listener registry.
#[derive(Clone, Default)]
pub struct KeyboardHub {
    registry: Arc<Mutex<Registry>>,
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.  It receives every event emitted after this call
    /// until it is dropped.
    pub fn listen(&self) -> KeyListener {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.senders.insert(id, sender);
        debug!(listener = id, "key listener registered");
        KeyListener {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every listener.  Returns how many received it.
    pub fn emit(&self, event: KeyEvent) -> usize {
        let registry = lock(&self.registry);
        registry
            .senders
            .values()
            .filter(|s| s.send(event.clone()).is_ok())
            .count()
    }

    pub fn key_down(&self, code: &str) -> usize {
        self.emit(KeyEvent::down(code))
    }

    pub fn key_up(&self, code: &str) -> usize {
        self.emit(KeyEvent::up(code))
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).senders.len()
    }
}

/// Scoped registration on a [`KeyboardHub`].  Dropping it unregisters.
pub struct KeyListener {
    id: u64,
    receiver: UnboundedReceiver<KeyEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl KeyListener {
    /// Next pending event, without blocking.
    pub fn try_next(&mut self) -> Option<KeyEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).senders.remove(&self.id);
            debug!(listener = self.id, "key listener released");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// InputState
// ────────────────────────────────────────────────────────────────────────────

/// The six control flags as read once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    flags: [bool; 6],
}

impl InputSnapshot {
    /// A snapshot with exactly `keys` held.
    pub fn holding(keys: &[ControlKey]) -> Self {
        let mut flags = [false; 6];
        for key in keys {
            flags[key.index()] = true;
        }
        Self { flags }
    }

    pub fn is_held(&self, key: ControlKey) -> bool {
        self.flags[key.index()]
    }
}

/// Per-vehicle held-key state.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    flags: [bool; 6],
    keymap: KeyMap,
}

impl InputState {
    pub fn new(keymap: KeyMap) -> Self {
        Self {
            flags: [false; 6],
            keymap,
        }
    }

    pub fn press(&mut self, key: ControlKey) {
        self.flags[key.index()] = true;
    }

    pub fn release(&mut self, key: ControlKey) {
        self.flags[key.index()] = false;
    }

    /// Apply one raw edge.  Returns `false` for unmapped codes.
    pub fn apply(&mut self, event: &KeyEvent) -> bool {
        let Some(key) = self.keymap.lookup(&event.code) else {
            trace!(code = %event.code, "unmapped key ignored");
            return false;
        };
        self.flags[key.index()] = event.pressed;
        true
    }

    /// Drain every pending event from `listener`, in arrival order.
    /// Returns the number of events drained.
    pub fn pump(&mut self, listener: &mut KeyListener) -> usize {
        let mut drained = 0;
        while let Some(event) = listener.try_next() {
            self.apply(&event);
            drained += 1;
        }
        drained
    }

    pub fn is_held(&self, key: ControlKey) -> bool {
        self.flags[key.index()]
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot { flags: self.flags }
    }

    /// Release every key.
    pub fn clear(&mut self) {
        self.flags = [false; 6];
    }
}
