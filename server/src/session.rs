use crate::room::RoomId;
use pong_shared::protocol::{Seat, ServerMsg};
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Longest display name kept, in characters.
pub const MAX_NAME_CHARS: usize = 32;

/// Bit pattern stored in `target_y` when no pointer target is active.
const NO_TARGET: u64 = u64::MAX;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c-{}", self.0)
    }
}

/// Where a session currently lives. Written by the hub only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Assignment {
    pub room: Option<RoomId>,
    pub seat: Seat,
}

/// Paddle input as of the latest message from the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaddleInput {
    /// Continuous hold, one of -1, 0, 1
    Direction(i32),
    /// Absolute pointer target in world space
    Target(f64),
}

/// Per-connection state shared between the transport task, the hub and the
/// tick driver.
pub struct ClientSession {
    id: SessionId,
    name: Mutex<Option<String>>,
    assignment: Mutex<Assignment>,
    direction: AtomicI32,
    /// f64 bits, or `NO_TARGET`
    target_y: AtomicU64,
    outbox: mpsc::Sender<Arc<ServerMsg>>,
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("assignment", &self.assignment())
            .field("input", &self.input())
            .finish()
    }
}

impl ClientSession {
    /// Create a session and the receiving end of its outbox.
    pub fn new(id: SessionId, outbox_capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<ServerMsg>>) {
        let (tx, rx) = mpsc::channel(outbox_capacity);
        let session = Arc::new(Self {
            id,
            name: Mutex::new(None),
            assignment: Mutex::new(Assignment::default()),
            direction: AtomicI32::new(0),
            target_y: AtomicU64::new(NO_TARGET),
            outbox: tx,
        });
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The name set by the client, or the session id when none was set.
    pub fn display_name(&self) -> String {
        match lock(&self.name).as_deref() {
            Some(name) => name.to_string(),
            None => self.id.to_string(),
        }
    }

    /// Set the display name. Blank names reset to the default.
    pub fn set_name(&self, name: Option<&str>) {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| n.chars().take(MAX_NAME_CHARS).collect::<String>());
        *lock(&self.name) = name;
    }

    pub fn assignment(&self) -> Assignment {
        *lock(&self.assignment)
    }

    pub fn seat(&self) -> Seat {
        self.assignment().seat
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.assignment().room
    }

    pub(crate) fn set_assignment(&self, assignment: Assignment) {
        *lock(&self.assignment) = assignment;
    }

    /// Discrete movement. Out-of-range values are clamped. Clears any pointer target.
    pub fn set_direction(&self, dir: i32) {
        self.direction.store(dir.clamp(-1, 1), Ordering::Relaxed);
        self.target_y.store(NO_TARGET, Ordering::Relaxed);
    }

    /// Absolute pointer target. Clears the discrete direction.
    /// Returns false and leaves input untouched for non-finite values.
    pub fn set_target_y(&self, y: f64) -> bool {
        if !y.is_finite() {
            return false;
        }
        self.target_y.store(y.to_bits(), Ordering::Relaxed);
        self.direction.store(0, Ordering::Relaxed);
        true
    }

    pub fn input(&self) -> PaddleInput {
        let bits = self.target_y.load(Ordering::Relaxed);
        if bits != NO_TARGET {
            return PaddleInput::Target(f64::from_bits(bits));
        }
        PaddleInput::Direction(self.direction.load(Ordering::Relaxed))
    }

    /// Non-blocking enqueue. Returns false when the outbox is full or closed;
    /// the message is dropped in that case.
    pub fn send(&self, msg: Arc<ServerMsg>) -> bool {
        match self.outbox.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::trace!("Session {} outbox full, dropping message", self.id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pong_shared::protocol::{ErrorCode, ErrorMsg};

    fn test_session(capacity: usize) -> (Arc<ClientSession>, mpsc::Receiver<Arc<ServerMsg>>) {
        ClientSession::new(SessionId(7), capacity)
    }

    fn test_msg() -> Arc<ServerMsg> {
        Arc::new(ServerMsg::Error(ErrorMsg {
            code: ErrorCode::RoomNotFound,
            message: "x".to_string(),
        }))
    }

    #[test]
    fn display_name_defaults_to_id() {
        let (session, _rx) = test_session(4);
        assert_eq!(session.display_name(), "c-7");

        session.set_name(Some("  alice "));
        assert_eq!(session.display_name(), "alice");

        session.set_name(Some("   "));
        assert_eq!(session.display_name(), "c-7");

        session.set_name(Some("bob"));
        session.set_name(None);
        assert_eq!(session.display_name(), "c-7");
    }

    #[test]
    fn long_names_are_truncated() {
        let (session, _rx) = test_session(4);
        session.set_name(Some(&"x".repeat(100)));
        assert_eq!(session.display_name().chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn direction_is_clamped() {
        let (session, _rx) = test_session(4);
        session.set_direction(5);
        assert_eq!(session.input(), PaddleInput::Direction(1));
        session.set_direction(-9);
        assert_eq!(session.input(), PaddleInput::Direction(-1));
    }

    #[test]
    fn input_modes_are_mutually_exclusive() {
        let (session, _rx) = test_session(4);
        session.set_direction(1);
        assert!(session.set_target_y(120.0));
        assert_eq!(session.input(), PaddleInput::Target(120.0));

        session.set_direction(-1);
        assert_eq!(session.input(), PaddleInput::Direction(-1));
    }

    #[test]
    fn non_finite_target_is_dropped() {
        let (session, _rx) = test_session(4);
        session.set_direction(1);
        assert!(!session.set_target_y(f64::NAN));
        assert!(!session.set_target_y(f64::INFINITY));
        assert_eq!(session.input(), PaddleInput::Direction(1));
    }

    #[test]
    fn full_outbox_drops_without_blocking() {
        let (session, mut rx) = test_session(2);
        assert!(session.send(test_msg()));
        assert!(session.send(test_msg()));
        assert!(!session.send(test_msg()));

        assert!(rx.try_recv().is_ok());
        assert!(session.send(test_msg()));
    }

    #[test]
    fn closed_outbox_reports_failure() {
        let (session, rx) = test_session(2);
        drop(rx);
        assert!(!session.send(test_msg()));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
    }
}
