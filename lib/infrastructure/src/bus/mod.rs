use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// In-process fan-out of values to any number of listeners. Slow listeners lose the oldest values.
pub struct EventBus<T> {
    tx: broadcast::Sender<T>,
}

pub struct EventListener<T> {
    rx: broadcast::Receiver<T>,
}

#[derive(Clone)]
pub struct EventEmitter<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + std::fmt::Debug> EventBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> EventListener<T> {
        EventListener { rx: self.tx.subscribe() }
    }

    pub fn emitter(&self) -> EventEmitter<T> {
        EventEmitter { tx: self.tx.clone() }
    }
}

impl<T: Clone> EventListener<T> {
    /// Waits for the next value. `None` once every emitter is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Closed) => {
                    tracing::debug!("All emitters of {} dropped", std::any::type_name::<T>());
                    return None;
                }
                Err(RecvError::Lagged(count)) => {
                    tracing::warn!(skipped = count, "Listener of {} fell behind", std::any::type_name::<T>());
                }
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(count)) => {
                    tracing::warn!(skipped = count, "Listener of {} fell behind", std::any::type_name::<T>());
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl<T: Clone + std::fmt::Debug> EventEmitter<T> {
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Without listeners the value is dropped.
    pub fn send(&self, event: T) {
        if self.tx.receiver_count() == 0 {
            tracing::trace!(?event, "No listeners, dropping");
            return;
        }

        if let Err(e) = self.tx.send(event) {
            tracing::warn!("Error broadcasting {:?}", e.0);
        }
    }
}
