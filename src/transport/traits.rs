//! Traits describing the transport consumed by the archive client.

use super::error::{OfferError, TransportResult};

/// Id returned by the transport for a pending channel registration.
pub type RegistrationId = i64;

/// What a controlled-poll handler wants done with the fragment it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlledAction {
    /// Consume the fragment and keep polling.
    Continue,
    /// Consume the fragment and stop this poll.
    Break,
    /// Leave the fragment unconsumed and stop this poll.
    Abort,
}

/// Receiving end of a channel/stream pair.
pub trait Subscription {
    /// Channel URI.
    fn channel(&self) -> &str;

    /// Stream id.
    fn stream_id(&self) -> i32;

    /// Check if at least one publisher is connected.
    fn is_connected(&self) -> bool;

    /// Hand up to `fragment_limit` fragments to `handler`, in arrival order.
    ///
    /// Returns the number of fragments consumed. A fragment answered with
    /// [`ControlledAction::Abort`] is not consumed and will be delivered
    /// again by the next poll.
    fn controlled_poll(
        &mut self,
        handler: &mut dyn FnMut(&[u8]) -> ControlledAction,
        fragment_limit: usize,
    ) -> usize;
}

/// Sending end of a channel/stream pair.
pub trait Publication {
    /// Channel URI.
    fn channel(&self) -> &str;

    /// Stream id.
    fn stream_id(&self) -> i32;

    /// Check if at least one subscriber is connected.
    fn is_connected(&self) -> bool;

    /// Try to append one message. Returns the new stream position.
    fn offer(&mut self, buffer: &[u8]) -> Result<i64, OfferError>;
}

/// The transport's duty-cycle task.
///
/// Must be invoked regularly by any thread that owns the transport client.
/// Starving it is a liveness bug, not a performance one.
pub trait Housekeeping {
    /// Run one duty cycle. Returns the amount of work done.
    fn invoke(&mut self) -> usize;
}

/// Client handle onto the transport.
///
/// Registration is asynchronous: `add_*` returns an id immediately and
/// `find_*` yields the channel once the transport has resolved it.
pub trait TransportClient: Housekeeping {
    /// Subscription type produced by this client.
    type Subscription: Subscription;

    /// Publication type produced by this client.
    type Publication: Publication;

    /// Request a subscription.
    fn add_subscription(&mut self, channel: &str, stream_id: i32)
    -> TransportResult<RegistrationId>;

    /// Resolve a requested subscription, `None` while still pending.
    fn find_subscription(
        &mut self,
        registration_id: RegistrationId,
    ) -> TransportResult<Option<Self::Subscription>>;

    /// Request a publication.
    fn add_publication(&mut self, channel: &str, stream_id: i32) -> TransportResult<RegistrationId>;

    /// Resolve a requested publication, `None` while still pending.
    fn find_publication(
        &mut self,
        registration_id: RegistrationId,
    ) -> TransportResult<Option<Self::Publication>>;

    /// Issue a fresh correlation id. Ids are unique and increasing per client.
    fn next_correlation_id(&mut self) -> i64;
}
