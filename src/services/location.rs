use std::fmt;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::models::Position;

/// Classified location failures, mirroring the error codes a geolocation
/// backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    /// The user revoked or never granted location access. Fatal to the
    /// current trip.
    PermissionDenied,
    /// No fix could be obtained right now. Transient.
    PositionUnavailable,
    /// The backend gave up waiting for a fix. Transient.
    Timeout,
}

impl LocationError {
    /// Fatal errors force the trip back to idle; transient ones are logged
    /// and tracking keeps waiting for the next fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LocationError::PermissionDenied)
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            LocationError::PermissionDenied => "location access denied",
            LocationError::PositionUnavailable => "position unavailable",
            LocationError::Timeout => "location request timed out",
        };
        f.write_str(message)
    }
}

impl std::error::Error for LocationError {}

/// One event delivered by an active location subscription.
#[derive(Debug, Clone)]
pub enum LocationEvent {
    Fix(Position),
    Error(LocationError),
}

/// A stream of location fixes, abstracted from the concrete positioning
/// backend. At most one subscription is live at a time; `subscribe` while
/// already subscribed must replace the previous subscription.
pub trait LocationSource {
    /// Begin fix delivery. The returned receiver yields fixes and errors
    /// until `unsubscribe` is called or the source is dropped.
    fn subscribe(&mut self) -> Result<mpsc::UnboundedReceiver<LocationEvent>>;

    /// Stop fix delivery.
    fn unsubscribe(&mut self);

    /// Obtain a single fix, e.g. to probe that location access works.
    fn get_once(&mut self) -> impl std::future::Future<Output = Result<Position, LocationError>> + Send;
}

/// Location source fed manually by the host (or a test). Fixes pushed while
/// no subscription is active are discarded, like a real backend that only
/// reports while watched.
#[derive(Debug, Default)]
pub struct ManualLocationSource {
    sender: Option<mpsc::UnboundedSender<LocationEvent>>,
    next_once: Option<Result<Position, LocationError>>,
}

impl ManualLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.sender.is_some()
    }

    /// Deliver a fix to the current subscriber, if any.
    pub fn push_fix(&self, position: Position) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(LocationEvent::Fix(position));
        }
    }

    /// Deliver an error to the current subscriber, if any.
    pub fn push_error(&self, error: LocationError) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(LocationEvent::Error(error));
        }
    }

    /// Stage the outcome of the next `get_once` call.
    pub fn stage_once(&mut self, outcome: Result<Position, LocationError>) {
        self.next_once = Some(outcome);
    }
}

impl LocationSource for ManualLocationSource {
    fn subscribe(&mut self) -> Result<mpsc::UnboundedReceiver<LocationEvent>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.sender = Some(sender);
        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        self.sender = None;
    }

    async fn get_once(&mut self) -> Result<Position, LocationError> {
        self.next_once
            .take()
            .unwrap_or(Err(LocationError::PositionUnavailable))
    }
}
