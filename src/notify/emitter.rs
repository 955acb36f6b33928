use std::sync::Mutex;

use event_emitter_rs::EventEmitter;

use super::{Notification, NotificationSink};

/// Publishes notifications on an `EventEmitter` for in-process listeners.
///
/// Each notification is emitted under `notification.<level>` with its JSON
/// encoding as payload.
///
/// ```ignore
/// let mut emitter = EventEmitter::new();
/// emitter.on("notification.error", |json: String| eprintln!("{}", json));
/// let session = CollectionSession::builder(remote)
///     .with_notifier(EmitterNotifier::new(emitter))
///     .build();
/// ```
pub struct EmitterNotifier {
    emitter: Mutex<EventEmitter>,
}

impl EmitterNotifier {
    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            emitter: Mutex::new(emitter),
        }
    }

    pub fn event_name(notification: &Notification) -> String {
        format!("notification.{}", notification.level.as_str())
    }
}

impl NotificationSink for EmitterNotifier {
    fn notify(&self, notification: Notification) {
        let payload = match serde_json::to_string(&notification) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("could not encode notification: {}", e);
                return;
            }
        };
        match self.emitter.lock() {
            Ok(mut emitter) => {
                emitter.emit(&Self::event_name(&notification), payload);
            }
            Err(_) => tracing::warn!("notification emitter poisoned"),
        }
    }
}
