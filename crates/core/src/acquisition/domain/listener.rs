use crate::acquisition::domain::mda_event::MdaEvent;
use crate::acquisition::domain::sequence::MdaSequence;
use crate::shared::frame::Frame;

/// Receives acquisition lifecycle callbacks.
///
/// Callbacks are invoked synchronously by the event hub. `sequence_started`
/// always precedes the frames of a run and `sequence_finished` follows them.
pub trait MdaListener: Send {
    fn sequence_started(
        &mut self,
        sequence: &MdaSequence,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn frame_ready(
        &mut self,
        frame: &Frame,
        event: &MdaEvent,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn sequence_finished(
        &mut self,
        _sequence: &MdaSequence,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
