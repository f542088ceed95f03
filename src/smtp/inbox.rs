//! Shared store of delivered messages

use crate::smtp::message::MailMessage;

use std::sync::{Arc, Condvar, Mutex, MutexGuard, mpsc};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Shared {
    messages: Vec<MailMessage>,
    subscribers: Vec<mpsc::Sender<MailMessage>>,
}

/// Ordered, append-only collection of received messages.
///
/// Cloning an `Inbox` yields another handle to the same store. Every
/// session of a server appends to it; the test harness reads it.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    shared: Arc<(Mutex<Shared>, Condvar)>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A panic while holding the lock cannot leave a half-appended entry.
        self.shared
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a sealed message and notify waiters and subscribers
    pub(crate) fn push(&self, message: MailMessage) {
        let mut shared = self.lock();
        shared
            .subscribers
            .retain(|subscriber| subscriber.send(message.clone()).is_ok());
        shared.messages.push(message);
        let count = shared.messages.len();
        drop(shared);

        self.shared.1.notify_all();
        tracing::debug!(count, "message delivered to inbox");
    }

    /// Number of messages received so far
    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all messages in delivery order
    pub fn messages(&self) -> Vec<MailMessage> {
        self.lock().messages.clone()
    }

    pub fn get(&self, index: usize) -> Option<MailMessage> {
        self.lock().messages.get(index).cloned()
    }

    /// Remove every stored message
    pub fn clear(&self) {
        self.lock().messages.clear();
    }

    /// Receive every message delivered from now on.
    ///
    /// Messages already in the inbox are not replayed.
    pub fn subscribe(&self) -> mpsc::Receiver<MailMessage> {
        let (tx, rx) = mpsc::channel();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Block until at least `count` messages are present or `timeout`
    /// elapses. Returns whether the count was reached.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        // A timeout too large for `Instant` waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        let mut shared = self.lock();
        while shared.messages.len() < count {
            shared = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    match self.shared.1.wait_timeout(shared, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => match self.shared.1.wait(shared) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                },
            };
        }
        true
    }
}
