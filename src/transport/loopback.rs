//! In-memory transport for tests and local experiments.
//!
//! [`pair`] returns a [`LoopbackTransport`] to hand to the client and a
//! [`LoopbackArchive`] the test keeps. The archive handle scripts what the
//! client sees: connection state, registration latency, back pressure,
//! queued response frames, and an optional responder that answers each
//! request as it is offered.
//!
//! Everything is deterministic. Nothing happens unless the client polls,
//! offers, or invokes housekeeping.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::error::{OfferError, TransportError, TransportResult};
use super::timing::ManualClock;
use super::traits::{
    ControlledAction, Housekeeping, Publication, RegistrationId, Subscription, TransportClient,
};
use crate::codec::{ConnectRequest, ControlResponse, MessageHeader};
use crate::core::{IdleStrategy, TEMPLATE_CONNECT_REQUEST};

/// Answers one offered request with zero or more response frames.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Subscription,
    Publication,
}

#[derive(Debug)]
struct Registration {
    kind: ResourceKind,
    channel: String,
    stream_id: i32,
    pending_finds: usize,
}

struct Media {
    subscription_connected: bool,
    publication_connected: bool,
    publication_closed: bool,
    connect_after_invokes: Option<usize>,
    back_pressure_remaining: usize,
    registration_delay: usize,
    registrations: HashMap<RegistrationId, Registration>,
    responses: VecDeque<Vec<u8>>,
    requests: Vec<Vec<u8>>,
    responder: Option<Responder>,
    invoke_count: usize,
    poll_count: usize,
    next_id: i64,
    position: i64,
}

impl Default for Media {
    fn default() -> Self {
        Self {
            subscription_connected: true,
            publication_connected: true,
            publication_closed: false,
            connect_after_invokes: None,
            back_pressure_remaining: 0,
            registration_delay: 0,
            registrations: HashMap::new(),
            responses: VecDeque::new(),
            requests: Vec::new(),
            responder: None,
            invoke_count: 0,
            poll_count: 0,
            next_id: 0,
            position: 0,
        }
    }
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Media>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Media> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a connected transport/archive pair.
pub fn pair() -> (LoopbackTransport, LoopbackArchive) {
    let shared = Shared::default();
    (
        LoopbackTransport {
            shared: shared.clone(),
        },
        LoopbackArchive { shared },
    )
}

/// Client side of the loopback.
pub struct LoopbackTransport {
    shared: Shared,
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let media = self.shared.lock();
        f.debug_struct("LoopbackTransport")
            .field("registrations", &media.registrations.len())
            .field("invoke_count", &media.invoke_count)
            .finish()
    }
}

impl LoopbackTransport {
    fn register(
        &mut self,
        kind: ResourceKind,
        channel: &str,
        stream_id: i32,
    ) -> TransportResult<RegistrationId> {
        if channel.is_empty() {
            return Err(TransportError::InvalidChannel(channel.to_owned()));
        }

        let mut media = self.shared.lock();
        media.next_id += 1;
        let id = media.next_id;
        let pending_finds = media.registration_delay;
        media.registrations.insert(
            id,
            Registration {
                kind,
                channel: channel.to_owned(),
                stream_id,
                pending_finds,
            },
        );
        Ok(id)
    }

    fn resolve(
        &mut self,
        kind: ResourceKind,
        registration_id: RegistrationId,
    ) -> TransportResult<Option<(String, i32)>> {
        let mut media = self.shared.lock();
        let registration = media
            .registrations
            .get_mut(&registration_id)
            .filter(|r| r.kind == kind)
            .ok_or(TransportError::UnknownRegistration(registration_id))?;

        if registration.pending_finds > 0 {
            registration.pending_finds -= 1;
            return Ok(None);
        }
        Ok(Some((registration.channel.clone(), registration.stream_id)))
    }
}

impl Housekeeping for LoopbackTransport {
    fn invoke(&mut self) -> usize {
        let mut media = self.shared.lock();
        media.invoke_count += 1;
        match media.connect_after_invokes {
            Some(n) if media.invoke_count >= n => {
                media.subscription_connected = true;
                media.publication_connected = true;
                media.connect_after_invokes = None;
                1
            }
            _ => 0,
        }
    }
}

impl TransportClient for LoopbackTransport {
    type Subscription = LoopbackSubscription;
    type Publication = LoopbackPublication;

    fn add_subscription(
        &mut self,
        channel: &str,
        stream_id: i32,
    ) -> TransportResult<RegistrationId> {
        self.register(ResourceKind::Subscription, channel, stream_id)
    }

    fn find_subscription(
        &mut self,
        registration_id: RegistrationId,
    ) -> TransportResult<Option<LoopbackSubscription>> {
        Ok(self
            .resolve(ResourceKind::Subscription, registration_id)?
            .map(|(channel, stream_id)| LoopbackSubscription {
                shared: self.shared.clone(),
                channel,
                stream_id,
            }))
    }

    fn add_publication(&mut self, channel: &str, stream_id: i32) -> TransportResult<RegistrationId> {
        self.register(ResourceKind::Publication, channel, stream_id)
    }

    fn find_publication(
        &mut self,
        registration_id: RegistrationId,
    ) -> TransportResult<Option<LoopbackPublication>> {
        Ok(self
            .resolve(ResourceKind::Publication, registration_id)?
            .map(|(channel, stream_id)| LoopbackPublication {
                shared: self.shared.clone(),
                channel,
                stream_id,
            }))
    }

    fn next_correlation_id(&mut self) -> i64 {
        let mut media = self.shared.lock();
        media.next_id += 1;
        media.next_id
    }
}

/// Response subscription backed by the loopback's frame queue.
pub struct LoopbackSubscription {
    shared: Shared,
    channel: String,
    stream_id: i32,
}

impl Subscription for LoopbackSubscription {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn stream_id(&self) -> i32 {
        self.stream_id
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().subscription_connected
    }

    fn controlled_poll(
        &mut self,
        handler: &mut dyn FnMut(&[u8]) -> ControlledAction,
        fragment_limit: usize,
    ) -> usize {
        {
            let mut media = self.shared.lock();
            media.poll_count += 1;
            if !media.subscription_connected {
                return 0;
            }
        }

        // Never hold the lock across the handler; it may call back into
        // the archive handle.
        let mut fragments = 0;
        while fragments < fragment_limit {
            let Some(frame) = self.shared.lock().responses.pop_front() else {
                break;
            };
            match handler(&frame) {
                ControlledAction::Continue => fragments += 1,
                ControlledAction::Break => {
                    fragments += 1;
                    break;
                }
                ControlledAction::Abort => {
                    self.shared.lock().responses.push_front(frame);
                    break;
                }
            }
        }
        fragments
    }
}

/// Request publication recording every accepted message.
pub struct LoopbackPublication {
    shared: Shared,
    channel: String,
    stream_id: i32,
}

impl Publication for LoopbackPublication {
    fn channel(&self) -> &str {
        &self.channel
    }

    fn stream_id(&self) -> i32 {
        self.stream_id
    }

    fn is_connected(&self) -> bool {
        let media = self.shared.lock();
        media.publication_connected && !media.publication_closed
    }

    fn offer(&mut self, buffer: &[u8]) -> Result<i64, OfferError> {
        let mut media = self.shared.lock();
        if media.publication_closed {
            return Err(OfferError::Closed);
        }
        if !media.publication_connected {
            return Err(OfferError::NotConnected);
        }
        if media.back_pressure_remaining > 0 {
            media.back_pressure_remaining -= 1;
            return Err(OfferError::BackPressured);
        }

        media.requests.push(buffer.to_vec());
        media.position += buffer.len() as i64;
        let position = media.position;

        // The responder runs unlocked so it may drive the archive handle.
        let Some(mut responder) = media.responder.take() else {
            return Ok(position);
        };
        drop(media);
        let frames = responder(buffer);

        let mut media = self.shared.lock();
        if media.responder.is_none() {
            media.responder = Some(responder);
        }
        media.responses.extend(frames);
        Ok(position)
    }
}

/// Test-side handle onto the loopback.
#[derive(Clone)]
pub struct LoopbackArchive {
    shared: Shared,
}

impl LoopbackArchive {
    /// Set whether the response subscription is connected.
    pub fn set_connected(&self, connected: bool) {
        self.shared.lock().subscription_connected = connected;
    }

    /// Set whether the request publication is connected.
    pub fn set_publication_connected(&self, connected: bool) {
        self.shared.lock().publication_connected = connected;
    }

    /// Close the request publication for good.
    pub fn close_publication(&self) {
        self.shared.lock().publication_closed = true;
    }

    /// Start disconnected; connect both directions once housekeeping has
    /// run `invokes` times.
    pub fn connect_after_invokes(&self, invokes: usize) {
        let mut media = self.shared.lock();
        media.subscription_connected = false;
        media.publication_connected = false;
        media.connect_after_invokes = Some(invokes);
    }

    /// Reject the next `offers` offers with back pressure.
    pub fn back_pressure(&self, offers: usize) {
        self.shared.lock().back_pressure_remaining = offers;
    }

    /// Make every later registration need `finds` extra lookups to resolve.
    pub fn set_registration_delay(&self, finds: usize) {
        self.shared.lock().registration_delay = finds;
    }

    /// Queue a frame on the response stream.
    pub fn push_frame(&self, frame: Vec<u8>) {
        self.shared.lock().responses.push_back(frame);
    }

    /// Queue an encoded control response.
    pub fn push_response(&self, response: &ControlResponse) {
        // Encoding only fails for strings over 4 GiB.
        if let Ok(frame) = response.encode() {
            self.push_frame(frame);
        }
    }

    /// Answer each offered request with the responder's frames.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        self.shared.lock().responder = Some(Box::new(responder));
    }

    /// Accept connect requests by assigning `control_session_id`. Other
    /// requests get no answer.
    pub fn accept_sessions(&self, control_session_id: i64) {
        self.set_responder(move |request| {
            let Ok(header) = MessageHeader::decode_archive(request) else {
                return Vec::new();
            };
            match header.template_id {
                TEMPLATE_CONNECT_REQUEST => ConnectRequest::decode(request)
                    .ok()
                    .and_then(|connect| {
                        ControlResponse::ok(control_session_id, connect.correlation_id, 0)
                            .encode()
                            .ok()
                    })
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            }
        });
    }

    /// Every request accepted so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.shared.lock().requests.clone()
    }

    /// Frames still queued on the response stream.
    pub fn pending_frames(&self) -> usize {
        self.shared.lock().responses.len()
    }

    /// Times housekeeping has been invoked.
    pub fn invoke_count(&self) -> usize {
        self.shared.lock().invoke_count
    }

    /// Times the response subscription has been polled.
    pub fn poll_count(&self) -> usize {
        self.shared.lock().poll_count
    }

    /// Correlation id the next `next_correlation_id` call would return.
    pub fn peek_next_id(&self) -> i64 {
        self.shared.lock().next_id + 1
    }
}

/// Idle strategy that advances a [`ManualClock`] instead of waiting.
///
/// Lets deadline tests run instantly and deterministically.
#[derive(Debug, Clone)]
pub struct SteppingIdle {
    clock: ManualClock,
    step: Duration,
    idles: Arc<Mutex<usize>>,
}

impl SteppingIdle {
    /// Advance `clock` by `step` per idle cycle.
    pub fn new(clock: ManualClock, step: Duration) -> Self {
        Self {
            clock,
            step,
            idles: Arc::new(Mutex::new(0)),
        }
    }

    /// Idle cycles run so far, across clones.
    pub fn idles(&self) -> usize {
        *self.idles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdleStrategy for SteppingIdle {
    fn idle(&mut self) {
        *self.idles.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.clock.advance(self.step);
    }

    fn alias(&self) -> &'static str {
        "stepping"
    }
}
