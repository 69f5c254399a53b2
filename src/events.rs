//! Change notifications emitted by the catalog, session, and save worker.
//!
//! Listeners either register an observer ([`SaveObserver`]) that is called
//! synchronously on the emitting thread, or take a channel receiver from
//! [`Notifier::subscribe`]. Save outcomes are only ever reported here; the
//! background worker has no other way to reach the caller.

use crate::error::ErrorCode;
use par_saves_document::Value;
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

/// A notification about profile state.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    /// A property was written or removed. `old_value` is `Null` when the key
    /// was absent; `new_value` is `Null` for removals.
    SavesChanged {
        key: String,
        old_value: Value,
        new_value: Value,
    },
    /// A different profile was selected. `old_name` is empty if none was.
    ProfileChanged { old_name: String, new_name: String },
    /// A new profile file was created.
    ProfileCreated { name: String },
    /// A background save was dispatched.
    ProfileSaveStart,
    /// A background save failed.
    ProfileSaveFailed { code: ErrorCode },
    /// A profile was written to disk.
    ProfileSaved { name: String },
}

impl SaveEvent {
    /// Snake_case name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SaveEvent::SavesChanged { .. } => "saves_changed",
            SaveEvent::ProfileChanged { .. } => "profile_changed",
            SaveEvent::ProfileCreated { .. } => "profile_created",
            SaveEvent::ProfileSaveStart => "profile_save_start",
            SaveEvent::ProfileSaveFailed { .. } => "profile_save_failed",
            SaveEvent::ProfileSaved { .. } => "profile_saved",
        }
    }
}

/// Receives events as they are emitted.
///
/// Called from whichever thread emitted the event, including the save
/// worker. Implementations must not call back into the session. A panic in
/// `on_event` is logged and does not reach the emitter.
pub trait SaveObserver: Send + Sync {
    fn on_event(&self, event: &SaveEvent);
}

/// Observer that buffers events for later inspection.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<SaveEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all buffered events, returning them and clearing the buffer.
    pub fn drain_events(&self) -> Vec<SaveEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Copy of the buffered events without clearing them.
    pub fn events(&self) -> Vec<SaveEvent> {
        self.events.lock().clone()
    }
}

impl SaveObserver for EventRecorder {
    fn on_event(&self, event: &SaveEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Fan-out point shared by everything that emits events.
#[derive(Default)]
pub struct Notifier {
    observers: RwLock<Vec<Arc<dyn SaveObserver>>>,
    subscribers: Mutex<Vec<Sender<SaveEvent>>>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observers.read().len())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&self, observer: Arc<dyn SaveObserver>) {
        self.observers.write().push(observer);
    }

    /// Unregister `observer`, matched by pointer. Returns whether it was
    /// registered.
    pub fn remove_observer(&self, observer: &Arc<dyn SaveObserver>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|registered| !Arc::ptr_eq(registered, observer));
        observers.len() != before
    }

    /// Open a channel that receives every subsequent event.
    pub fn subscribe(&self) -> Receiver<SaveEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `event` to all observers, then to all live subscribers.
    pub fn emit(&self, event: SaveEvent) {
        log::debug!("Emitting {}", event.kind());
        for observer in self.observers.read().iter() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
            if delivered.is_err() {
                log::error!("Observer panicked while handling {}", event.kind());
            }
        }
        // Receivers that were dropped are pruned here.
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kinds() {
        assert_eq!(SaveEvent::ProfileSaveStart.kind(), "profile_save_start");
        assert_eq!(
            SaveEvent::ProfileSaved {
                name: "a".to_string()
            }
            .kind(),
            "profile_saved"
        );
    }

    #[test]
    fn test_recorder_captures_and_drains() {
        let notifier = Notifier::new();
        let recorder = Arc::new(EventRecorder::new());
        notifier.add_observer(recorder.clone());

        notifier.emit(SaveEvent::ProfileSaveStart);
        notifier.emit(SaveEvent::SavesChanged {
            key: "a.b".to_string(),
            old_value: Value::Null,
            new_value: json!(2),
        });

        assert_eq!(recorder.events().len(), 2);
        let drained = recorder.drain_events();
        assert_eq!(drained[0], SaveEvent::ProfileSaveStart);
        assert_eq!(drained[1].kind(), "saves_changed");
        assert!(recorder.drain_events().is_empty());
    }

    #[test]
    fn test_removed_observer_stops_receiving() {
        let notifier = Notifier::new();
        let recorder = Arc::new(EventRecorder::new());
        let observer: Arc<dyn SaveObserver> = recorder.clone();
        notifier.add_observer(Arc::clone(&observer));

        notifier.emit(SaveEvent::ProfileSaveStart);
        assert!(notifier.remove_observer(&observer));
        assert!(!notifier.remove_observer(&observer));
        notifier.emit(SaveEvent::ProfileSaveStart);

        assert_eq!(recorder.drain_events(), vec![SaveEvent::ProfileSaveStart]);
    }

    struct Panicky;

    impl SaveObserver for Panicky {
        fn on_event(&self, _event: &SaveEvent) {
            panic!("observer failure");
        }
    }

    #[test]
    fn test_panicking_observer_does_not_block_others() {
        let notifier = Notifier::new();
        let recorder = Arc::new(EventRecorder::new());
        notifier.add_observer(Arc::new(Panicky));
        notifier.add_observer(recorder.clone());
        let rx = notifier.subscribe();

        notifier.emit(SaveEvent::ProfileSaveStart);

        assert_eq!(recorder.drain_events(), vec![SaveEvent::ProfileSaveStart]);
        assert_eq!(rx.try_recv().unwrap(), SaveEvent::ProfileSaveStart);
    }

    #[test]
    fn test_subscribers_receive_events() {
        let notifier = Notifier::new();
        let rx = notifier.subscribe();

        notifier.emit(SaveEvent::ProfileCreated {
            name: "alpha".to_string(),
        });

        assert_eq!(
            rx.try_recv().unwrap(),
            SaveEvent::ProfileCreated {
                name: "alpha".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let notifier = Notifier::new();
        let rx = notifier.subscribe();
        let _kept = notifier.subscribe();
        drop(rx);

        notifier.emit(SaveEvent::ProfileSaveStart);
        assert_eq!(notifier.subscribers.lock().len(), 1);
    }
}
