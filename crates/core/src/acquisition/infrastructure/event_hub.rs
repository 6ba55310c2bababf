use std::sync::{Arc, Mutex};

use crate::acquisition::domain::listener::MdaListener;
use crate::acquisition::domain::mda_event::MdaEvent;
use crate::acquisition::domain::sequence::MdaSequence;
use crate::shared::frame::Frame;

/// Shared handle to a subscribed listener. Callers keep a clone to inspect
/// the concrete writer after (or between) runs.
pub type ListenerHandle = Arc<Mutex<dyn MdaListener>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous fan-out of acquisition lifecycle events.
///
/// Listeners are called in subscription order. The first listener error
/// stops dispatch of that event and is returned to the emitter.
#[derive(Default)]
pub struct AcquisitionEvents {
    listeners: Vec<(SubscriptionId, ListenerHandle)>,
    next_id: u64,
}

impl AcquisitionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: ListenerHandle) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit_sequence_started(
        &self,
        sequence: &MdaSequence,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.dispatch(|l| l.sequence_started(sequence))
    }

    pub fn emit_frame_ready(
        &self,
        frame: &Frame,
        event: &MdaEvent,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.dispatch(|l| l.frame_ready(frame, event))
    }

    pub fn emit_sequence_finished(
        &self,
        sequence: &MdaSequence,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.dispatch(|l| l.sequence_finished(sequence))
    }

    fn dispatch<F>(&self, mut callback: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: FnMut(&mut dyn MdaListener) -> Result<(), Box<dyn std::error::Error>>,
    {
        for (_, listener) in &self.listeners {
            let mut guard = listener
                .lock()
                .map_err(|_| "acquisition listener mutex poisoned")?;
            callback(&mut *guard)?;
        }
        Ok(())
    }
}
