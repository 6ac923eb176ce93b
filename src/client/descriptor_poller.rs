//! Batched poller for recording descriptors.

use tracing::{trace, warn};

use crate::codec::{ControlResponse, ControlResponseCode, MessageHeader, RecordingDescriptor};
use crate::core::{
    ArchiveError, ArchiveResult, TEMPLATE_CONTROL_RESPONSE, TEMPLATE_RECORDING_DESCRIPTOR,
};
use crate::transport::{ControlledAction, Subscription};

/// Receives each descriptor of a batch, in arrival order.
pub trait RecordingDescriptorConsumer {
    /// Handle one descriptor.
    fn on_recording_descriptor(&mut self, descriptor: &RecordingDescriptor);
}

impl<F> RecordingDescriptorConsumer for F
where
    F: FnMut(&RecordingDescriptor),
{
    fn on_recording_descriptor(&mut self, descriptor: &RecordingDescriptor) {
        self(descriptor)
    }
}

/// Dispatches the descriptors of one query to a consumer.
///
/// One instance lives for the whole session and is re-armed with
/// [`reset`](Self::reset) before each batch.
#[derive(Debug)]
pub struct RecordingDescriptorPoller {
    fragment_limit: usize,
    control_session_id: i64,
    correlation_id: i64,
    remaining: usize,
    is_dispatch_complete: bool,
}

enum Step {
    Skip,
    Delivered,
    EndOfResults,
    Failed(ArchiveError),
}

impl RecordingDescriptorPoller {
    /// Poller handling up to `fragment_limit` fragments per poll.
    pub fn new(fragment_limit: usize) -> Self {
        Self {
            fragment_limit,
            control_session_id: 0,
            correlation_id: 0,
            remaining: 0,
            is_dispatch_complete: false,
        }
    }

    /// Arm for a new batch of up to `record_count` descriptors.
    pub fn reset(&mut self, control_session_id: i64, correlation_id: i64, record_count: usize) {
        self.control_session_id = control_session_id;
        self.correlation_id = correlation_id;
        self.remaining = record_count;
        self.is_dispatch_complete = false;
    }

    /// Poll once. Returns the number of fragments consumed.
    ///
    /// An error response for the armed query fails the poll with
    /// [`ArchiveError::Remote`].
    pub fn poll<S: Subscription + ?Sized>(
        &mut self,
        subscription: &mut S,
        consumer: &mut dyn RecordingDescriptorConsumer,
    ) -> ArchiveResult<usize> {
        let fragment_limit = self.fragment_limit;
        let mut failure = None;

        let fragments = subscription.controlled_poll(
            &mut |buffer: &[u8]| {
                if self.is_dispatch_complete {
                    return ControlledAction::Abort;
                }
                match self.on_fragment(buffer, &mut *consumer) {
                    Step::Skip => ControlledAction::Continue,
                    Step::Delivered if self.remaining == 0 => {
                        self.is_dispatch_complete = true;
                        ControlledAction::Break
                    }
                    Step::Delivered => ControlledAction::Continue,
                    Step::EndOfResults => {
                        self.is_dispatch_complete = true;
                        ControlledAction::Break
                    }
                    Step::Failed(err) => {
                        failure = Some(err);
                        ControlledAction::Break
                    }
                }
            },
            fragment_limit,
        );

        match failure {
            Some(err) => Err(err),
            None => Ok(fragments),
        }
    }

    fn on_fragment(
        &mut self,
        buffer: &[u8],
        consumer: &mut dyn RecordingDescriptorConsumer,
    ) -> Step {
        let header = match MessageHeader::decode_archive(buffer) {
            Ok(header) => header,
            Err(err) => {
                warn!(error = %err, "skipping undecodable fragment in descriptor batch");
                return Step::Skip;
            }
        };

        match header.template_id {
            TEMPLATE_RECORDING_DESCRIPTOR => {
                let descriptor = match RecordingDescriptor::decode_body(&header, buffer) {
                    Ok(descriptor) => descriptor,
                    Err(err) => {
                        warn!(error = %err, "skipping malformed recording descriptor");
                        return Step::Skip;
                    }
                };
                if !self.matches(descriptor.control_session_id, descriptor.correlation_id) {
                    trace!(
                        correlation_id = descriptor.correlation_id,
                        "dropping descriptor for another query"
                    );
                    return Step::Skip;
                }
                consumer.on_recording_descriptor(&descriptor);
                self.remaining = self.remaining.saturating_sub(1);
                Step::Delivered
            }
            TEMPLATE_CONTROL_RESPONSE => {
                let response = match ControlResponse::decode_body(&header, buffer) {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(error = %err, "skipping malformed control response");
                        return Step::Skip;
                    }
                };
                if !self.matches(response.control_session_id, response.correlation_id) {
                    return Step::Skip;
                }
                match response.code {
                    ControlResponseCode::RecordingUnknown => Step::EndOfResults,
                    ControlResponseCode::Error => Step::Failed(ArchiveError::Remote {
                        correlation_id: response.correlation_id,
                        message: response.error_message,
                        relevant_id: response.relevant_id,
                    }),
                    _ => Step::Skip,
                }
            }
            template_id => {
                trace!(template_id, "dropping frame during descriptor batch");
                Step::Skip
            }
        }
    }

    fn matches(&self, control_session_id: i64, correlation_id: i64) -> bool {
        control_session_id == self.control_session_id && correlation_id == self.correlation_id
    }

    /// Check if the batch has finished.
    ///
    /// True once every requested descriptor was delivered or the archive
    /// signalled there are no more.
    pub fn is_dispatch_complete(&self) -> bool {
        self.is_dispatch_complete
    }

    /// Descriptors still expected.
    pub fn remaining_record_count(&self) -> usize {
        self.remaining
    }

    /// Correlation id of the armed query.
    pub fn correlation_id(&self) -> i64 {
        self.correlation_id
    }
}
