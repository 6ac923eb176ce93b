//! Outbound control requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::codec::{CloseSessionRequest, ConnectRequest};
use crate::core::{ArchiveError, ArchiveResult, Clock, IdleStrategy};
use crate::transport::{Deadline, Housekeeping, OfferError, Publication};

/// Encodes control requests and offers them on the request publication.
pub struct ArchiveProxy<P> {
    publication: P,
    buffer: Vec<u8>,
    connect_timeout: Duration,
    retry_attempts: u32,
    clock: Arc<dyn Clock>,
}

impl<P: Publication> ArchiveProxy<P> {
    /// Wrap a resolved request publication.
    pub fn new(
        publication: P,
        connect_timeout: Duration,
        retry_attempts: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            publication,
            buffer: Vec::with_capacity(256),
            connect_timeout,
            retry_attempts,
            clock,
        }
    }

    /// The request publication.
    pub fn publication(&self) -> &P {
        &self.publication
    }

    /// Offer a connect request, retrying until accepted or the timeout elapses.
    ///
    /// Housekeeping runs between attempts. Returns `Ok(false)` if the request
    /// was never accepted.
    pub fn connect(
        &mut self,
        response_channel: &str,
        response_stream_id: i32,
        correlation_id: i64,
        housekeeping: &mut dyn Housekeeping,
        idle: &mut dyn IdleStrategy,
    ) -> ArchiveResult<bool> {
        self.buffer.clear();
        ConnectRequest::new(correlation_id, response_stream_id, response_channel)
            .encode_into(&mut self.buffer)?;

        debug!(
            correlation_id,
            response_channel, response_stream_id, "sending connect request"
        );

        let deadline = Deadline::after(self.clock.as_ref(), self.connect_timeout);
        idle.reset();
        loop {
            match self.publication.offer(&self.buffer) {
                Ok(_) => return Ok(true),
                Err(OfferError::Closed) => return Err(ArchiveError::PublicationClosed),
                Err(OfferError::MaxPositionExceeded) => {
                    return Err(ArchiveError::MaxPositionExceeded);
                }
                Err(reason) => trace!(correlation_id, %reason, "connect request not accepted"),
            }

            if deadline.is_expired(self.clock.as_ref()) {
                return Ok(false);
            }
            idle.idle();
            housekeeping.invoke();
        }
    }

    /// Offer a close-session request with bounded retry.
    ///
    /// Returns `Ok(false)` if every attempt was refused with back pressure or
    /// an admin action.
    pub fn close_session(
        &mut self,
        control_session_id: i64,
        idle: &mut dyn IdleStrategy,
    ) -> ArchiveResult<bool> {
        self.buffer.clear();
        CloseSessionRequest { control_session_id }.encode_into(&mut self.buffer);
        self.offer_with_retry(idle)
    }

    fn offer_with_retry(&mut self, idle: &mut dyn IdleStrategy) -> ArchiveResult<bool> {
        idle.reset();
        for _ in 0..self.retry_attempts {
            match self.publication.offer(&self.buffer) {
                Ok(_) => return Ok(true),
                Err(OfferError::NotConnected) => return Err(ArchiveError::PublicationNotConnected),
                Err(OfferError::Closed) => return Err(ArchiveError::PublicationClosed),
                Err(OfferError::MaxPositionExceeded) => {
                    return Err(ArchiveError::MaxPositionExceeded);
                }
                Err(OfferError::BackPressured | OfferError::AdminAction) => idle.idle(),
            }
        }
        Ok(false)
    }
}
