use crate::acquisition::domain::mda_event::MdaEvent;
use crate::shared::frame::Frame;

/// Produces the image for one acquisition event (a camera, in practice).
pub trait FrameSource: Send {
    fn snap(&mut self, event: &MdaEvent) -> Result<Frame, Box<dyn std::error::Error>>;
}
