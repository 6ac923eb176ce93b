//! Control session engine.
//!
//! Owns one control session with a remote archive. Every blocking operation
//! is a loop on the caller's thread that polls the response stream, drives
//! transport housekeeping, and idles on stalls, bounded by a deadline
//! computed fresh for that operation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::config::ArchiveConfig;
use super::context::Context;
use super::descriptor_poller::{RecordingDescriptorConsumer, RecordingDescriptorPoller};
use super::proxy::ArchiveProxy;
use super::response_poller::{ControlResponsePoller, ResponseFrame};
use crate::codec::{ControlResponse, ControlResponseCode};
use crate::core::{ArchiveError, ArchiveResult, Clock, IdleStrategy, NULL_VALUE};
use crate::transport::{Deadline, Housekeeping, Subscription, TransportClient, TransportResult};

/// Lifecycle of a control session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake in progress.
    Connecting,
    /// Handshake complete; requests may be issued.
    Open,
    /// Closed by the client.
    Closed,
    /// The response stream was lost while the session was in use.
    Failed,
}

/// Client for one control session with an archive.
///
/// All operations take `&mut self`, so at most one is in flight per client.
/// Share a client between threads only behind external synchronisation.
pub struct ArchiveClient<T: TransportClient> {
    config: ArchiveConfig,
    transport: T,
    subscription: T::Subscription,
    proxy: ArchiveProxy<T::Publication>,
    response_poller: ControlResponsePoller,
    descriptor_poller: RecordingDescriptorPoller,
    idle: Box<dyn IdleStrategy>,
    clock: Arc<dyn Clock>,
    control_session_id: i64,
    state: SessionState,
}

impl<T: TransportClient> std::fmt::Debug for ArchiveClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveClient")
            .field("control_session_id", &self.control_session_id)
            .field("state", &self.state)
            .field("response_channel", &self.subscription.channel())
            .field("idle", &self.idle.alias())
            .finish()
    }
}

impl<T: TransportClient> ArchiveClient<T> {
    /// Connect to the archive and open a control session.
    ///
    /// Concludes `ctx` if that has not been done yet, registers the response
    /// subscription and request publication, sends the connect request, and
    /// waits for the archive to assign a session id.
    pub fn connect(mut ctx: Context<T>) -> ArchiveResult<Self> {
        if !ctx.is_concluded() {
            ctx.conclude()?;
        }
        let (config, mut transport, mut idle, clock) = ctx.into_parts()?;

        let registration = transport.add_subscription(
            &config.control_response_channel,
            config.control_response_stream_id,
        )?;
        let subscription = resolve(
            &mut transport,
            idle.as_mut(),
            clock.as_ref(),
            config.message_timeout,
            "subscription",
            &config.control_response_channel,
            config.control_response_stream_id,
            |transport| transport.find_subscription(registration),
        )?;

        let registration = transport.add_publication(
            &config.control_request_channel,
            config.control_request_stream_id,
        )?;
        let publication = resolve(
            &mut transport,
            idle.as_mut(),
            clock.as_ref(),
            config.message_timeout,
            "publication",
            &config.control_request_channel,
            config.control_request_stream_id,
            |transport| transport.find_publication(registration),
        )?;

        let mut proxy = ArchiveProxy::new(
            publication,
            config.message_timeout,
            config.retry_attempts,
            clock.clone(),
        );

        let correlation_id = transport.next_correlation_id();
        let sent = proxy.connect(
            &config.control_response_channel,
            config.control_response_stream_id,
            correlation_id,
            &mut transport,
            idle.as_mut(),
        )?;
        if !sent {
            warn!(
                channel = %config.control_response_channel,
                "connect request was not accepted"
            );
            return Err(ArchiveError::ConnectFailed {
                channel: config.control_response_channel,
            });
        }

        let mut client = Self {
            response_poller: ControlResponsePoller::new(config.fragment_limit),
            descriptor_poller: RecordingDescriptorPoller::new(config.fragment_limit),
            config,
            transport,
            subscription,
            proxy,
            idle,
            clock,
            control_session_id: NULL_VALUE,
            state: SessionState::Connecting,
        };

        client.control_session_id = client.await_session_opened(correlation_id)?;
        client.state = SessionState::Open;
        info!(
            control_session_id = client.control_session_id,
            channel = %client.config.control_request_channel,
            stream_id = client.config.control_request_stream_id,
            "archive session opened"
        );
        Ok(client)
    }

    /// Non-blocking connect. Not supported; always fails.
    pub fn async_connect(_ctx: Context<T>) -> ArchiveResult<Self> {
        Err(ArchiveError::Unimplemented("async connect"))
    }

    /// Settings the session was opened with.
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Id the archive assigned to this session.
    pub fn control_session_id(&self) -> i64 {
        self.control_session_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Issue a correlation id for a new request.
    pub fn next_correlation_id(&mut self) -> i64 {
        self.transport.next_correlation_id()
    }

    /// The request proxy, for sending further requests on this session.
    pub fn proxy(&mut self) -> &mut ArchiveProxy<T::Publication> {
        &mut self.proxy
    }

    /// Wait for the connect response carrying `correlation_id` and return the
    /// session id it assigns.
    ///
    /// The response stream must connect first. Responses for other
    /// correlation ids and other templates are dropped.
    pub fn await_session_opened(&mut self, correlation_id: i64) -> ArchiveResult<i64> {
        let deadline = self.deadline();
        self.await_connection(&deadline)?;

        loop {
            let frame = self.poll_next_response(correlation_id, &deadline)?;
            let response = match frame {
                ResponseFrame::Control(response) if response.correlation_id == correlation_id => {
                    response
                }
                other => {
                    trace!(
                        correlation_id,
                        template_id = other.template_id(),
                        "dropping frame while awaiting session"
                    );
                    self.transport.invoke();
                    continue;
                }
            };

            check_code(&response)?;
            return Ok(response.control_session_id);
        }
    }

    /// Wait for the OK response to `correlation_id` and return its relevant id.
    ///
    /// Frames for other sessions or with other templates are dropped. A
    /// session response for another correlation id is dropped too, unless
    /// it reports a failure, which fails this wait.
    pub fn poll_for_response(&mut self, correlation_id: i64) -> ArchiveResult<i64> {
        self.ensure_open()?;
        let deadline = self.deadline();

        loop {
            let frame = self.poll_next_response(correlation_id, &deadline)?;
            let response = match frame {
                ResponseFrame::Control(response)
                    if response.control_session_id == self.control_session_id =>
                {
                    response
                }
                other => {
                    trace!(
                        correlation_id,
                        template_id = other.template_id(),
                        "dropping frame for another session"
                    );
                    self.transport.invoke();
                    continue;
                }
            };

            check_code(&response)?;
            if response.correlation_id == correlation_id {
                return Ok(response.relevant_id);
            }
            trace!(
                correlation_id,
                received = response.correlation_id,
                "dropping unrelated session response"
            );
        }
    }

    /// Hand the descriptors of query `correlation_id` to `consumer`.
    ///
    /// Returns how many were delivered. Fewer than `record_count` is a
    /// normal outcome when the archive signals it has no more.
    pub fn poll_for_descriptors(
        &mut self,
        correlation_id: i64,
        record_count: usize,
        consumer: &mut dyn RecordingDescriptorConsumer,
    ) -> ArchiveResult<usize> {
        self.ensure_open()?;
        if record_count == 0 {
            return Ok(0);
        }

        let deadline = self.deadline();
        self.descriptor_poller
            .reset(self.control_session_id, correlation_id, record_count);
        self.idle.reset();

        loop {
            let fragments = self
                .descriptor_poller
                .poll(&mut self.subscription, consumer)?;

            if self.descriptor_poller.is_dispatch_complete() {
                let delivered = record_count - self.descriptor_poller.remaining_record_count();
                debug!(
                    correlation_id,
                    requested = record_count,
                    delivered,
                    "descriptor batch complete"
                );
                return Ok(delivered);
            }

            self.transport.invoke();

            if fragments > 0 {
                continue;
            }
            self.check_connected()?;
            if deadline.is_expired(self.clock.as_ref()) {
                return Err(ArchiveError::DescriptorTimeout { correlation_id });
            }
            self.idle.idle();
        }
    }

    /// Close the session.
    ///
    /// Sends a close request and marks the session closed even if the
    /// request could not be sent. Closing twice is a no-op.
    pub fn close(&mut self) -> ArchiveResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;

        let sent = self
            .proxy
            .close_session(self.control_session_id, self.idle.as_mut())?;
        if !sent {
            warn!(
                control_session_id = self.control_session_id,
                "close request was not accepted"
            );
        }
        info!(
            control_session_id = self.control_session_id,
            "archive session closed"
        );
        Ok(())
    }

    /// Block until the response subscription reports connected.
    fn await_connection(&mut self, deadline: &Deadline) -> ArchiveResult<()> {
        self.idle.reset();
        while !self.subscription.is_connected() {
            if deadline.is_expired(self.clock.as_ref()) {
                warn!(
                    channel = self.subscription.channel(),
                    stream_id = self.subscription.stream_id(),
                    "response channel did not connect"
                );
                return Err(ArchiveError::ResponseChannelNotConnected {
                    channel: self.subscription.channel().to_owned(),
                    stream_id: self.subscription.stream_id(),
                });
            }
            self.idle.idle();
            self.transport.invoke();
        }
        Ok(())
    }

    /// Poll until one frame is available.
    fn poll_next_response(
        &mut self,
        correlation_id: i64,
        deadline: &Deadline,
    ) -> ArchiveResult<ResponseFrame> {
        self.idle.reset();
        loop {
            let fragments = self.response_poller.poll(&mut self.subscription);
            if let Some(frame) = self.response_poller.take_frame() {
                return Ok(frame);
            }
            if fragments > 0 {
                continue;
            }

            self.check_connected()?;
            if deadline.is_expired(self.clock.as_ref()) {
                return Err(ArchiveError::ResponseTimeout { correlation_id });
            }
            self.idle.idle();
            self.transport.invoke();
        }
    }

    fn check_connected(&mut self) -> ArchiveResult<()> {
        if self.subscription.is_connected() {
            return Ok(());
        }
        if self.state == SessionState::Open {
            self.state = SessionState::Failed;
        }
        warn!(
            control_session_id = self.control_session_id,
            channel = self.subscription.channel(),
            "subscription to archive is not connected"
        );
        Err(ArchiveError::NotConnected)
    }

    fn ensure_open(&self) -> ArchiveResult<()> {
        match self.state {
            SessionState::Closed => Err(ArchiveError::SessionClosed {
                control_session_id: self.control_session_id,
            }),
            _ => Ok(()),
        }
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.clock.as_ref(), self.config.message_timeout)
    }
}

/// Fail unless the response code is OK.
fn check_code(response: &ControlResponse) -> ArchiveResult<()> {
    match response.code {
        ControlResponseCode::Ok => Ok(()),
        ControlResponseCode::Error => Err(ArchiveError::Remote {
            correlation_id: response.correlation_id,
            message: response.error_message.clone(),
            relevant_id: response.relevant_id,
        }),
        code => Err(ArchiveError::UnexpectedCode {
            correlation_id: response.correlation_id,
            code: code.value(),
        }),
    }
}

/// Look up a registered resource until the transport resolves it.
#[allow(clippy::too_many_arguments)]
fn resolve<T, R, F>(
    transport: &mut T,
    idle: &mut dyn IdleStrategy,
    clock: &dyn Clock,
    timeout: Duration,
    resource: &'static str,
    channel: &str,
    stream_id: i32,
    mut find: F,
) -> ArchiveResult<R>
where
    T: Housekeeping,
    F: FnMut(&mut T) -> TransportResult<Option<R>>,
{
    let deadline = Deadline::after(clock, timeout);
    idle.reset();
    loop {
        if let Some(found) = find(transport)? {
            return Ok(found);
        }
        if deadline.is_expired(clock) {
            return Err(ArchiveError::RegistrationTimeout {
                resource,
                channel: channel.to_owned(),
                stream_id,
            });
        }
        idle.idle();
        transport.invoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CloseSessionRequest, ConnectRequest, MessageHeader, RecordingDescriptor};
    use crate::core::{TEMPLATE_CLOSE_SESSION_REQUEST, TEMPLATE_CONNECT_REQUEST};
    use crate::transport::ManualClock;
    use crate::transport::loopback::{self, LoopbackArchive, LoopbackTransport, SteppingIdle};
    use std::sync::atomic::{AtomicI64, Ordering};

    const SESSION: i64 = 77;
    const TIMEOUT: Duration = Duration::from_secs(1);
    const STEP: Duration = Duration::from_millis(100);

    fn context(transport: LoopbackTransport, clock: &ManualClock) -> Context<LoopbackTransport> {
        Context::new()
            .transport(transport)
            .clock(clock.clone())
            .idle_strategy(SteppingIdle::new(clock.clone(), STEP))
            .message_timeout(TIMEOUT)
    }

    fn open() -> (ArchiveClient<LoopbackTransport>, LoopbackArchive, ManualClock) {
        crate::init_tracing();
        let (transport, archive) = loopback::pair();
        archive.accept_sessions(SESSION);
        let clock = ManualClock::new();
        let client = ArchiveClient::connect(context(transport, &clock)).unwrap();
        (client, archive, clock)
    }

    fn connect_with<F>(responder: F) -> ArchiveResult<ArchiveClient<LoopbackTransport>>
    where
        F: FnMut(&ConnectRequest) -> Vec<ControlResponse> + Send + 'static,
    {
        crate::init_tracing();
        let (transport, archive) = loopback::pair();
        let mut responder = responder;
        archive.set_responder(move |request| match ConnectRequest::decode(request) {
            Ok(connect) => responder(&connect)
                .iter()
                .map(|response| response.encode().unwrap())
                .collect(),
            Err(_) => Vec::new(),
        });
        ArchiveClient::connect(context(transport, &ManualClock::new()))
    }

    fn descriptor(correlation_id: i64, recording_id: i64) -> Vec<u8> {
        RecordingDescriptor {
            control_session_id: SESSION,
            correlation_id,
            recording_id,
            ..Default::default()
        }
        .encode()
        .unwrap()
    }

    fn end_of_results(correlation_id: i64) -> ControlResponse {
        ControlResponse {
            control_session_id: SESSION,
            correlation_id,
            relevant_id: 0,
            code: ControlResponseCode::RecordingUnknown,
            error_message: String::new(),
        }
    }

    #[test]
    fn test_connect_opens_session() {
        let (client, archive, _clock) = open();
        assert_eq!(client.state(), SessionState::Open);
        assert_eq!(client.control_session_id(), SESSION);

        let requests = archive.requests();
        assert_eq!(requests.len(), 1);
        let header = MessageHeader::decode_archive(&requests[0]).unwrap();
        assert_eq!(header.template_id, TEMPLATE_CONNECT_REQUEST);
        let connect = ConnectRequest::decode(&requests[0]).unwrap();
        assert_eq!(connect.response_channel, client.config().control_response_channel);
        assert_eq!(
            connect.response_stream_id,
            client.config().control_response_stream_id
        );
    }

    #[test]
    fn test_handshake_ignores_foreign_correlation_id() {
        let client = connect_with(|connect| {
            vec![
                ControlResponse::ok(SESSION + 1, connect.correlation_id + 100, 0),
                ControlResponse::ok(SESSION, connect.correlation_id, 0),
            ]
        })
        .unwrap();
        assert_eq!(client.control_session_id(), SESSION);
    }

    #[test]
    fn test_handshake_error_response() {
        let err = connect_with(|connect| {
            vec![ControlResponse::error(
                NULL_VALUE,
                connect.correlation_id,
                9,
                "too many sessions",
            )]
        })
        .unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("too many sessions"));
    }

    #[test]
    fn test_handshake_unexpected_code() {
        let err = connect_with(|connect| {
            vec![ControlResponse {
                control_session_id: SESSION,
                correlation_id: connect.correlation_id,
                relevant_id: 0,
                code: ControlResponseCode::SubscriptionUnknown,
                error_message: String::new(),
            }]
        })
        .unwrap_err();
        assert!(matches!(err, ArchiveError::UnexpectedCode { code: 3, .. }));
    }

    /// Drops the response channel on its first idle cycle.
    struct DisconnectingIdle {
        archive: LoopbackArchive,
        clock: ManualClock,
    }

    impl IdleStrategy for DisconnectingIdle {
        fn idle(&mut self) {
            self.archive.set_connected(false);
            self.clock.advance(STEP);
        }

        fn alias(&self) -> &'static str {
            "disconnecting"
        }
    }

    #[test]
    fn test_handshake_times_out_without_response() {
        let sent = Arc::new(AtomicI64::new(NULL_VALUE));
        let seen = sent.clone();
        let err = connect_with(move |connect| {
            seen.store(connect.correlation_id, Ordering::SeqCst);
            Vec::new()
        })
        .unwrap_err();

        assert!(matches!(err, ArchiveError::ResponseTimeout { .. }));
        assert_ne!(sent.load(Ordering::SeqCst), NULL_VALUE);
        assert_eq!(err.correlation_id(), Some(sent.load(Ordering::SeqCst)));
    }

    #[test]
    fn test_handshake_detects_disconnect() {
        crate::init_tracing();
        let (transport, archive) = loopback::pair();
        let clock = ManualClock::new();
        let ctx = Context::new()
            .transport(transport)
            .clock(clock.clone())
            .idle_strategy(DisconnectingIdle {
                archive: archive.clone(),
                clock: clock.clone(),
            })
            .message_timeout(TIMEOUT);

        let err = ArchiveClient::connect(ctx).unwrap_err();
        assert!(matches!(err, ArchiveError::NotConnected));
        assert!(err.is_connectivity());
        assert!(!err.is_timeout());
        assert_eq!(archive.requests().len(), 1);
        assert!(clock.elapsed() < TIMEOUT);
    }

    #[test]
    fn test_connect_with_unbounded_timeout() {
        crate::init_tracing();
        let (transport, archive) = loopback::pair();
        archive.accept_sessions(SESSION);
        let clock = ManualClock::new();
        let ctx = context(transport, &clock).message_timeout(Duration::MAX);

        let mut client = ArchiveClient::connect(ctx).unwrap();
        assert_eq!(client.control_session_id(), SESSION);

        let correlation_id = client.next_correlation_id();
        archive.push_response(&ControlResponse::ok(SESSION, correlation_id, 8));
        assert_eq!(client.poll_for_response(correlation_id).unwrap(), 8);
    }

    #[test]
    fn test_response_channel_never_connects() {
        let (transport, archive) = loopback::pair();
        archive.accept_sessions(SESSION);
        archive.set_connected(false);
        let clock = ManualClock::new();

        let err = ArchiveClient::connect(context(transport, &clock)).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::ResponseChannelNotConnected { stream_id: 20, .. }
        ));
        assert!(err.is_timeout());
        assert!(err.is_connectivity());
        assert!(clock.elapsed() > TIMEOUT);
    }

    #[test]
    fn test_connect_request_never_accepted() {
        let (transport, archive) = loopback::pair();
        archive.set_publication_connected(false);

        let err = ArchiveClient::connect(context(transport, &ManualClock::new())).unwrap_err();
        assert!(matches!(err, ArchiveError::ConnectFailed { .. }));
        assert!(archive.requests().is_empty());
    }

    #[test]
    fn test_connect_waits_for_transport() {
        let (transport, archive) = loopback::pair();
        archive.accept_sessions(SESSION);
        archive.set_registration_delay(2);
        archive.connect_after_invokes(6);

        let client = ArchiveClient::connect(context(transport, &ManualClock::new())).unwrap();
        assert_eq!(client.state(), SessionState::Open);
        assert!(archive.invoke_count() >= 6);
    }

    #[test]
    fn test_registration_timeout() {
        let (transport, archive) = loopback::pair();
        archive.set_registration_delay(usize::MAX);

        let err = ArchiveClient::connect(context(transport, &ManualClock::new())).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::RegistrationTimeout {
                resource: "subscription",
                ..
            }
        ));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_connect_rejects_invalid_context() {
        let (transport, _archive) = loopback::pair();
        let ctx = context(transport, &ManualClock::new()).control_response_channel("");
        let err = ArchiveClient::connect(ctx).unwrap_err();
        assert!(matches!(err, ArchiveError::Config(_)));
    }

    #[test]
    fn test_connect_accepts_concluded_context() {
        let (transport, archive) = loopback::pair();
        archive.accept_sessions(SESSION);
        let mut ctx = context(transport, &ManualClock::new());
        ctx.conclude().unwrap();
        assert!(ArchiveClient::connect(ctx).is_ok());
    }

    #[test]
    fn test_async_connect_is_unimplemented() {
        let (transport, _archive) = loopback::pair();
        let err = ArchiveClient::async_connect(context(transport, &ManualClock::new())).unwrap_err();
        assert!(matches!(err, ArchiveError::Unimplemented(_)));
    }

    #[test]
    fn test_poll_for_response_returns_relevant_id() {
        let (mut client, archive, _clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.push_response(&ControlResponse::ok(SESSION, correlation_id, 1234));

        let invokes = archive.invoke_count();
        assert_eq!(client.poll_for_response(correlation_id).unwrap(), 1234);
        assert_eq!(archive.invoke_count(), invokes);
    }

    #[test]
    fn test_poll_for_response_skips_unrelated_frames() {
        let (mut client, archive, _clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.push_response(&ControlResponse::ok(SESSION, correlation_id + 1, 1));
        archive.push_response(&ControlResponse::ok(SESSION + 1, correlation_id, 2));
        archive.push_frame(descriptor(correlation_id, 5));
        archive.push_response(&ControlResponse::ok(SESSION, correlation_id, 3));

        assert_eq!(client.poll_for_response(correlation_id).unwrap(), 3);
        assert_eq!(archive.pending_frames(), 0);
    }

    #[test]
    fn test_poll_for_response_times_out() {
        let (mut client, archive, clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.push_response(&ControlResponse::ok(SESSION, correlation_id + 1, 1));

        let start = clock.elapsed();
        let err = client.poll_for_response(correlation_id).unwrap_err();
        let waited = clock.elapsed() - start;

        assert!(matches!(err, ArchiveError::ResponseTimeout { .. }));
        assert_eq!(err.correlation_id(), Some(correlation_id));
        assert!(waited > TIMEOUT);
        assert!(waited <= TIMEOUT + STEP);
        assert_eq!(client.state(), SessionState::Open);
    }

    #[test]
    fn test_poll_for_response_detects_disconnect() {
        let (mut client, archive, clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.set_connected(false);

        let start = clock.elapsed();
        let err = client.poll_for_response(correlation_id).unwrap_err();
        assert!(matches!(err, ArchiveError::NotConnected));
        assert!(err.is_connectivity());
        assert!(clock.elapsed() - start < TIMEOUT);
        assert_eq!(client.state(), SessionState::Failed);
    }

    #[test]
    fn test_poll_for_response_error_code() {
        let (mut client, archive, _clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.push_response(&ControlResponse::error(
            SESSION,
            correlation_id,
            42,
            "no such recording",
        ));

        let err = client.poll_for_response(correlation_id).unwrap_err();
        let text = err.to_string();
        assert!(err.is_protocol());
        assert!(text.contains("no such recording"));
        assert!(text.contains("42"));
    }

    #[test]
    fn test_poll_for_descriptors_partial_batch() {
        let (mut client, archive, _clock) = open();
        let correlation_id = client.next_correlation_id();
        for id in 0..4 {
            archive.push_frame(descriptor(correlation_id, id));
        }
        archive.push_response(&end_of_results(correlation_id));

        let mut seen = Vec::new();
        let delivered = client
            .poll_for_descriptors(correlation_id, 10, &mut |d: &RecordingDescriptor| {
                seen.push(d.recording_id)
            })
            .unwrap();

        assert_eq!(delivered, 4);
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_poll_for_descriptors_invokes_housekeeping_every_cycle() {
        let (transport, archive) = loopback::pair();
        archive.accept_sessions(SESSION);
        let mut client =
            ArchiveClient::connect(context(transport, &ManualClock::new()).fragment_limit(2))
                .unwrap();
        let correlation_id = client.next_correlation_id();
        for id in 0..5 {
            archive.push_frame(descriptor(correlation_id, id));
        }

        let invokes = archive.invoke_count();
        let delivered = client
            .poll_for_descriptors(correlation_id, 5, &mut |_: &RecordingDescriptor| {})
            .unwrap();
        assert_eq!(delivered, 5);
        assert_eq!(archive.invoke_count() - invokes, 2);
    }

    #[test]
    fn test_poll_for_descriptors_times_out() {
        let (mut client, archive, clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.push_frame(descriptor(correlation_id, 1));

        let start = clock.elapsed();
        let mut count = 0;
        let err = client
            .poll_for_descriptors(correlation_id, 3, &mut |_: &RecordingDescriptor| count += 1)
            .unwrap_err();

        assert_eq!(count, 1);
        assert!(matches!(err, ArchiveError::DescriptorTimeout { .. }));
        assert_eq!(err.correlation_id(), Some(correlation_id));
        assert!(clock.elapsed() - start > TIMEOUT);
    }

    #[test]
    fn test_poll_for_descriptors_detects_disconnect() {
        let (mut client, archive, _clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.set_connected(false);

        let err = client
            .poll_for_descriptors(correlation_id, 3, &mut |_: &RecordingDescriptor| {})
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotConnected));
        assert_eq!(client.state(), SessionState::Failed);
    }

    #[test]
    fn test_poll_for_descriptors_error_response() {
        let (mut client, archive, _clock) = open();
        let correlation_id = client.next_correlation_id();
        archive.push_response(&ControlResponse::error(
            SESSION,
            correlation_id,
            8,
            "unknown recording",
        ));

        let err = client
            .poll_for_descriptors(correlation_id, 3, &mut |_: &RecordingDescriptor| {})
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Remote { relevant_id: 8, .. }));
    }

    #[test]
    fn test_poll_for_zero_descriptors() {
        let (mut client, archive, _clock) = open();
        let correlation_id = client.next_correlation_id();
        let polls = archive.poll_count();

        let delivered = client
            .poll_for_descriptors(correlation_id, 0, &mut |_: &RecordingDescriptor| {})
            .unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(archive.poll_count(), polls);
    }

    #[test]
    fn test_close() {
        let (mut client, archive, _clock) = open();
        client.close().unwrap();
        assert_eq!(client.state(), SessionState::Closed);

        let requests = archive.requests();
        assert_eq!(requests.len(), 2);
        let header = MessageHeader::decode_archive(&requests[1]).unwrap();
        assert_eq!(header.template_id, TEMPLATE_CLOSE_SESSION_REQUEST);
        assert_eq!(
            CloseSessionRequest::decode(&requests[1]).unwrap(),
            CloseSessionRequest {
                control_session_id: SESSION
            }
        );

        client.close().unwrap();
        assert_eq!(archive.requests().len(), 2);
    }

    #[test]
    fn test_closed_session_rejects_operations() {
        let (mut client, _archive, _clock) = open();
        client.close().unwrap();
        let correlation_id = client.next_correlation_id();

        let err = client.poll_for_response(correlation_id).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::SessionClosed {
                control_session_id: SESSION
            }
        ));
        assert!(
            client
                .poll_for_descriptors(correlation_id, 1, &mut |_: &RecordingDescriptor| {})
                .is_err()
        );
    }

    #[test]
    fn test_correlation_ids_increase() {
        let (mut client, _archive, _clock) = open();
        let first = client.next_correlation_id();
        let second = client.next_correlation_id();
        assert!(second > first);
    }
}
