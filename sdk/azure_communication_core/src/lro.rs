//! Long-running operation tracking.
//!
//! The service acknowledges asynchronous operations (play audio, transfer,
//! recording) with an operation id and finishes them later. A
//! [`LongRunningOperation`] is the local view of one such operation. Its
//! status advances from two directions:
//!
//! - **polling** through a [`StatusSource`], one request per [`poll`] call;
//! - **notifications** delivered to the caller's callback endpoint and fed in
//!   with [`apply_notification`].
//!
//! Status only moves forward (`Pending` < `Active` < terminal) and the first
//! terminal status wins. Observations that would move it backwards or
//! contradict a terminal status are discarded.
//!
//! [`poll`]: LongRunningOperation::poll
//! [`apply_notification`]: LongRunningOperation::apply_notification
//!
//! # Example
//!
//! ```rust,no_run
//! use azure_communication_core::lro::{LongRunningOperation, WaitOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(operation: LongRunningOperation) -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let status = operation
//!     .wait_until_terminal(WaitOptions::default(), &cancel)
//!     .await?;
//! println!("{} finished: {status}", operation.kind());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{OperationDispatcher, Route};
use crate::error::{CommunicationError, CommunicationResult};
use crate::models::{OperationId, OperationStatus, OperationStatusBody, ResourceId};

/// Default interval between status polls (1 second).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default maximum time to wait for a terminal status (2 minutes).
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);

/// Options for [`LongRunningOperation::wait_until_terminal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Time between polls when no notification arrives.
    pub poll_interval: Duration,
    /// Give up after this long.
    pub max_wait: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl WaitOptions {
    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the maximum wait.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Where a status observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOrigin {
    /// A direct service response to a request about the operation.
    Response,
    /// A status poll.
    Poll,
    /// A callback notification.
    Notification,
}

impl fmt::Display for StatusOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Response => "response",
            Self::Poll => "poll",
            Self::Notification => "notification",
        })
    }
}

/// What happened to a status fed into a [`LongRunningOperation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The status moved forward.
    Advanced {
        from: OperationStatus,
        to: OperationStatus,
    },
    /// Same as the current status.
    Unchanged,
    /// Older than the current status; discarded.
    Stale,
    /// Contradicts the terminal status already recorded; discarded.
    Conflict {
        kept: OperationStatus,
        rejected: OperationStatus,
    },
    /// A status this SDK version does not know; discarded.
    Unrecognized(String),
    /// A notification for a different operation.
    Uncorrelated,
}

impl Observation {
    /// Returns `true` if the observation changed the operation's status.
    pub fn advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// A status update delivered out of band, usually from a callback event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationNotification {
    /// The operation the update is about.
    pub operation_id: OperationId,
    /// Reported status.
    pub status: OperationStatus,
    /// Free-form detail from the service (result message, error code).
    pub detail: Option<String>,
}

impl OperationNotification {
    pub fn new(operation_id: impl Into<OperationId>, status: OperationStatus) -> Self {
        Self {
            operation_id: operation_id.into(),
            status,
            detail: None,
        }
    }

    /// Attach a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Fetches the current status of an operation from the service.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync + fmt::Debug {
    /// Fetch the status once.
    ///
    /// Returns `Ok(None)` if the source has no way to poll; the operation
    /// then only advances through notifications.
    async fn fetch(&self) -> CommunicationResult<Option<OperationStatus>>;
}

/// Polls a route that answers `{"status": "..."}`.
#[derive(Debug, Clone)]
pub struct RouteStatusSource {
    dispatcher: OperationDispatcher,
    route: Route,
    id: ResourceId,
}

impl RouteStatusSource {
    /// Poll `route` with `id` substituted into its template.
    pub fn new(dispatcher: OperationDispatcher, route: Route, id: impl Into<ResourceId>) -> Self {
        Self {
            dispatcher,
            route,
            id: id.into(),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for RouteStatusSource {
    async fn fetch(&self) -> CommunicationResult<Option<OperationStatus>> {
        let body: OperationStatusBody = self.dispatcher.invoke(&self.route, Some(&self.id)).await?;
        Ok(Some(body.status))
    }
}

/// Source for operations whose progress is only reported by callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationOnly;

#[async_trait::async_trait]
impl StatusSource for NotificationOnly {
    async fn fetch(&self) -> CommunicationResult<Option<OperationStatus>> {
        Ok(None)
    }
}

#[derive(Debug)]
struct State {
    status: OperationStatus,
    detail: Option<String>,
}

#[derive(Debug)]
struct Inner {
    resource_id: ResourceId,
    operation_id: OperationId,
    kind: &'static str,
    source: Box<dyn StatusSource>,
    state: Mutex<State>,
    changes: watch::Sender<OperationStatus>,
}

/// Handle to an asynchronous server-side operation.
///
/// Clones share state: a notification applied through one clone is seen by
/// all of them, including one blocked in
/// [`wait_until_terminal`](Self::wait_until_terminal).
#[derive(Debug, Clone)]
pub struct LongRunningOperation {
    inner: Arc<Inner>,
}

impl LongRunningOperation {
    /// Start tracking an operation.
    ///
    /// An unrecognized `initial` status is recorded as `Pending`.
    pub fn new(
        resource_id: impl Into<ResourceId>,
        operation_id: impl Into<OperationId>,
        kind: &'static str,
        initial: OperationStatus,
        source: impl StatusSource + 'static,
    ) -> Self {
        let initial = if initial.is_unrecognized() {
            OperationStatus::Pending
        } else {
            initial
        };
        let (changes, _) = watch::channel(initial.clone());

        Self {
            inner: Arc::new(Inner {
                resource_id: resource_id.into(),
                operation_id: operation_id.into(),
                kind,
                source: Box::new(source),
                state: Mutex::new(State {
                    status: initial,
                    detail: None,
                }),
                changes,
            }),
        }
    }

    /// The resource the operation acts on.
    pub fn resource_id(&self) -> &ResourceId {
        &self.inner.resource_id
    }

    /// The server-assigned operation id.
    pub fn operation_id(&self) -> &OperationId {
        &self.inner.operation_id
    }

    /// The kind of operation (`"play_audio"`, `"transfer"`, ...).
    pub fn kind(&self) -> &'static str {
        self.inner.kind
    }

    /// The current status.
    pub fn status(&self) -> OperationStatus {
        self.state().status.clone()
    }

    /// Detail attached to the notification that last advanced the status.
    pub fn detail(&self) -> Option<String> {
        self.state().detail.clone()
    }

    /// Returns `true` once a terminal status has been recorded.
    pub fn is_terminal(&self) -> bool {
        self.state().status.is_terminal()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<OperationStatus> {
        self.inner.changes.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed a status observation.
    pub fn observe(&self, status: OperationStatus, origin: StatusOrigin) -> Observation {
        self.transition(status, origin, None)
    }

    /// Feed a callback notification.
    ///
    /// Notifications for a different operation id are ignored and reported
    /// as [`Observation::Uncorrelated`].
    pub fn apply_notification(&self, notification: &OperationNotification) -> Observation {
        if notification.operation_id != self.inner.operation_id {
            tracing::debug!(
                operation_id = %self.inner.operation_id,
                notification_operation_id = %notification.operation_id,
                "notification for another operation"
            );
            return Observation::Uncorrelated;
        }
        self.transition(
            notification.status.clone(),
            StatusOrigin::Notification,
            notification.detail.clone(),
        )
    }

    fn transition(
        &self,
        status: OperationStatus,
        origin: StatusOrigin,
        detail: Option<String>,
    ) -> Observation {
        let kind = self.inner.kind;
        let operation_id = &self.inner.operation_id;

        let Some(new_rank) = status.rank() else {
            tracing::warn!(kind, %operation_id, %origin, status = %status, "ignoring unrecognized status");
            return Observation::Unrecognized(status.as_str().to_string());
        };

        let mut state = self.state();
        let current = state.status.clone();

        if current == status {
            return Observation::Unchanged;
        }
        if current.is_terminal() {
            tracing::warn!(
                kind,
                %operation_id,
                %origin,
                kept = %current,
                rejected = %status,
                "discarding status that contradicts terminal status"
            );
            return Observation::Conflict {
                kept: current,
                rejected: status,
            };
        }
        if new_rank < current.rank().unwrap_or(0) {
            tracing::debug!(kind, %operation_id, %origin, current = %current, stale = %status, "discarding stale status");
            return Observation::Stale;
        }

        state.status = status.clone();
        if detail.is_some() {
            state.detail = detail;
        }
        drop(state);

        self.inner.changes.send_replace(status.clone());
        tracing::debug!(kind, %operation_id, %origin, from = %current, to = %status, "operation status advanced");

        Observation::Advanced {
            from: current,
            to: status,
        }
    }

    /// Poll the status source once.
    ///
    /// Makes no request once the operation is terminal. Returns the status
    /// after the poll was applied.
    #[tracing::instrument(
        name = "communication::lro::poll",
        skip(self),
        fields(kind = self.inner.kind, operation_id = %self.inner.operation_id)
    )]
    pub async fn poll(&self) -> CommunicationResult<OperationStatus> {
        let current = self.status();
        if current.is_terminal() {
            return Ok(current);
        }

        if let Some(status) = self.inner.source.fetch().await? {
            tracing::trace!(status = %status, "polled status");
            self.observe(status, StatusOrigin::Poll);
        }
        Ok(self.status())
    }

    /// Wait until the operation reaches a terminal status.
    ///
    /// Polls every `poll_interval` and wakes early when a notification
    /// advances the status.
    ///
    /// # Errors
    ///
    /// - [`CommunicationError::Timeout`] after `max_wait`; no request is made
    ///   after the deadline.
    /// - [`CommunicationError::Cancelled`] as soon as `cancel` fires. Only
    ///   the local wait stops; the remote operation keeps running.
    /// - Any error returned by a poll.
    #[tracing::instrument(
        name = "communication::lro::wait_until_terminal",
        skip(self, options, cancel),
        fields(
            kind = self.inner.kind,
            operation_id = %self.inner.operation_id,
            max_wait_ms = options.max_wait.as_millis() as u64,
        )
    )]
    pub async fn wait_until_terminal(
        &self,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> CommunicationResult<OperationStatus> {
        let deadline = tokio::time::Instant::now() + options.max_wait;
        let mut changes = self.subscribe();
        let timeout = || CommunicationError::Timeout {
            waited: options.max_wait,
        };

        loop {
            let status = self.status();
            if status.is_terminal() {
                tracing::debug!(status = %status, "operation reached terminal status");
                return Ok(status);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CommunicationError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => return Err(timeout()),
                polled = self.poll() => { polled?; }
            }

            // Only changes arriving after this point cut the interval short.
            changes.mark_unchanged();
            if self.is_terminal() {
                continue;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CommunicationError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => return Err(timeout()),
                _ = changes.changed() => tracing::trace!("woken by status change"),
                _ = tokio::time::sleep(options.poll_interval) => {}
            }
        }
    }
}
