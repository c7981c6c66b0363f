//! Frame Assembly

use crate::error::SimError;
use crate::generator::SignalGenerator;
use can_bus::CanFrame;
use rand::Rng;
use signal_db::{MessageDef, SignalValues};

/// Sample, encode and frame one transmission of a message
///
/// The payload is zero-padded to 8 bytes regardless of the message length.
/// Returns the frame together with the physical values it carries.
pub fn next_frame<R: Rng>(
    message: &MessageDef,
    generator: &mut SignalGenerator<R>,
) -> Result<(CanFrame, SignalValues), SimError> {
    let values = generator.sample_message(message);
    let payload = message.encode(&values)?;
    let frame = CanFrame::padded(message.frame_id, &payload)?;
    Ok((frame, values))
}
