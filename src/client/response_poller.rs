//! Single-frame poller for the control response stream.

use tracing::warn;

use crate::codec::{ControlResponse, MessageHeader};
use crate::core::TEMPLATE_CONTROL_RESPONSE;
use crate::transport::{ControlledAction, Subscription};

/// A frame taken off the response stream by [`ControlResponsePoller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFrame {
    /// A decoded control response.
    Control(ControlResponse),
    /// Any other archive message, identified only by template.
    Other {
        /// Template id from the message header.
        template_id: u16,
    },
}

impl ResponseFrame {
    /// Template id of the frame.
    pub fn template_id(&self) -> u16 {
        match self {
            ResponseFrame::Control(_) => TEMPLATE_CONTROL_RESPONSE,
            ResponseFrame::Other { template_id } => *template_id,
        }
    }

    /// The control response, if that is what the frame holds.
    pub fn control_response(&self) -> Option<&ControlResponse> {
        match self {
            ResponseFrame::Control(response) => Some(response),
            ResponseFrame::Other { .. } => None,
        }
    }
}

/// Takes at most one frame per poll off the response stream.
///
/// Holds no reference to the subscription; the session passes it in on each
/// call. The frame from the previous poll is cleared when the next starts.
#[derive(Debug)]
pub struct ControlResponsePoller {
    fragment_limit: usize,
    frame: Option<ResponseFrame>,
}

impl ControlResponsePoller {
    /// Poller handling up to `fragment_limit` fragments per poll.
    pub fn new(fragment_limit: usize) -> Self {
        Self {
            fragment_limit,
            frame: None,
        }
    }

    /// Poll once. Returns the number of fragments consumed.
    ///
    /// Stops at the first decodable frame. Fragments that do not decode are
    /// consumed and skipped.
    pub fn poll<S: Subscription + ?Sized>(&mut self, subscription: &mut S) -> usize {
        self.frame = None;
        let frame = &mut self.frame;

        subscription.controlled_poll(
            &mut |buffer: &[u8]| {
                if frame.is_some() {
                    return ControlledAction::Abort;
                }
                match decode(buffer) {
                    Some(decoded) => {
                        *frame = Some(decoded);
                        ControlledAction::Break
                    }
                    None => ControlledAction::Continue,
                }
            },
            self.fragment_limit,
        )
    }

    /// Check if the last poll produced a frame.
    pub fn is_poll_complete(&self) -> bool {
        self.frame.is_some()
    }

    /// Frame produced by the last poll.
    pub fn frame(&self) -> Option<&ResponseFrame> {
        self.frame.as_ref()
    }

    /// Take the frame produced by the last poll.
    pub fn take_frame(&mut self) -> Option<ResponseFrame> {
        self.frame.take()
    }
}

fn decode(buffer: &[u8]) -> Option<ResponseFrame> {
    let header = match MessageHeader::decode_archive(buffer) {
        Ok(header) => header,
        Err(err) => {
            warn!(error = %err, len = buffer.len(), "skipping undecodable response fragment");
            return None;
        }
    };

    if header.template_id != TEMPLATE_CONTROL_RESPONSE {
        return Some(ResponseFrame::Other {
            template_id: header.template_id,
        });
    }

    match ControlResponse::decode_body(&header, buffer) {
        Ok(response) => Some(ResponseFrame::Control(response)),
        Err(err) => {
            warn!(error = %err, "skipping malformed control response");
            None
        }
    }
}
