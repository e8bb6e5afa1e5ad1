use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::message::{ClientMessage, Envelope, ServerMessage};
use crate::error::EngineError;

type ReplySender = oneshot::Sender<Result<ServerMessage, EngineError>>;

struct Subscriber {
    id: u64,
    /// The message type this subscriber wants; "" matches everything.
    message_type: String,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

#[derive(Default)]
struct Shared {
    pending: HashMap<u64, ReplySender>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    closed: bool,
}

impl Shared {
    fn fail_pending(&mut self) {
        self.closed = true;
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(EngineError::ChannelClosed));
        }
        self.subscribers.clear();
    }
}

/// Request/reply correlation over a pair of raw text channels.
///
/// Every outbound frame carries a fresh `message_id`; a reply names it in
/// `reply_to`, which resolves the matching `send_and_wait` future. Frames are
/// also fanned out to type-keyed subscribers in arrival order, replies
/// included, so passive listeners see the same stream the waiters do.
pub struct Transport {
    outbound: mpsc::UnboundedSender<String>,
    shared: Arc<Mutex<Shared>>,
    next_message_id: AtomicU64,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl Transport {
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        mut inbound: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(Shared::default()));

        let dispatch_shared = shared.clone();
        let dispatch = tokio::spawn(async move {
            while let Some(raw) = inbound.recv().await {
                let msg = match ServerMessage::decode(&raw) {
                    Ok(msg) => msg,
                    Err(err) => {
                        warn!(%err, "undecodable frame skipped");
                        continue;
                    }
                };
                Transport::dispatch_one(&dispatch_shared, msg);
            }
            // Inbound side gone: nothing pending can ever resolve.
            dispatch_shared.lock().unwrap().fail_pending();
        });

        Transport {
            outbound,
            shared,
            next_message_id: AtomicU64::new(1),
            dispatch: Mutex::new(Some(dispatch)),
        }
    }

    fn dispatch_one(shared: &Mutex<Shared>, msg: ServerMessage) {
        let mut shared = shared.lock().unwrap();

        if msg.reply_to != 0 {
            if let Some(tx) = shared.pending.remove(&msg.reply_to) {
                let reply = if msg.is_error() {
                    Err(EngineError::Protocol(msg.error_text()))
                } else {
                    Ok(msg.clone())
                };
                let _ = tx.send(reply);
            }
        }

        shared.subscribers.retain(|sub| {
            if sub.message_type.is_empty() || sub.message_type == msg.message_type {
                sub.tx.send(msg.clone()).is_ok()
            } else {
                true
            }
        });
    }

    /// Sends without waiting for the reply. Returns the message id so a later
    /// `reply_to` can still be recognized by subscribers.
    pub fn send(&self, body: ClientMessage) -> Result<u64, EngineError> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let frame = Envelope { message_id, body }.encode()?;
        self.outbound
            .send(frame)
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(message_id)
    }

    /// Sends and resolves with the correlated reply. An error-typed reply
    /// resolves as `Err`; a closed connection rejects every waiter.
    pub async fn send_and_wait(&self, body: ClientMessage) -> Result<ServerMessage, EngineError> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let frame = Envelope { message_id, body }.encode()?;

        let (tx, rx) = oneshot::channel();
        {
            let mut shared = self.shared.lock().unwrap();
            if shared.closed {
                return Err(EngineError::ChannelClosed);
            }
            // Registered before the send so a reply arriving immediately
            // still finds the waiter.
            shared.pending.insert(message_id, tx);
        }

        if self.outbound.send(frame).is_err() {
            self.shared.lock().unwrap().pending.remove(&message_id);
            return Err(EngineError::ChannelClosed);
        }

        match rx.await {
            Ok(reply) => reply,
            Err(_) => Err(EngineError::ChannelClosed),
        }
    }

    /// Subscribes to every inbound frame of the given type; pass "" to
    /// receive everything. Dropping the subscription unsubscribes.
    pub fn on_message(&self, message_type: &str) -> Subscription {
        let mut shared = self.shared.lock().unwrap();
        let id = shared.next_subscriber;
        shared.next_subscriber += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        shared.subscribers.push(Subscriber {
            id,
            message_type: message_type.to_string(),
            tx,
        });
        debug!(id, message_type, "subscriber registered");

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
            receiver: rx,
        }
    }

    /// Stops dispatch and rejects every outstanding waiter.
    pub fn close(&self) {
        if let Some(handle) = self.dispatch.lock().unwrap().take() {
            handle.abort();
        }
        self.shared.lock().unwrap().fail_pending();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

/// A live subscription handed out by [`Transport::on_message`].
pub struct Subscription {
    id: u64,
    shared: Weak<Mutex<Shared>>,
    receiver: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared
                .lock()
                .unwrap()
                .subscribers
                .retain(|sub| sub.id != self.id);
        }
    }
}
