//! Matchmaking and the directory of active rooms.
//!
//! The hub lock covers the waiting queue, the room map and session
//! assignments. It is never held while a contended room lock is acquired:
//! operations copy what they need out of the hub, release it, then touch the
//! room.

use crate::room::{Room, RoomId};
use crate::session::{lock, Assignment, ClientSession, SessionId};
use pong_shared::config::GameConfig;
use pong_shared::protocol::{ErrorCode, HelloMsg, Seat, ServerMsg};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("players cannot spectate")]
    AlreadySeated,
}

impl HubError {
    pub fn code(&self) -> ErrorCode {
        match self {
            HubError::RoomNotFound(_) => ErrorCode::RoomNotFound,
            HubError::AlreadySeated => ErrorCode::AlreadySeated,
        }
    }
}

/// Outcome of `Hub::register_for_match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Queued,
    Paired(RoomId),
    /// Session was already queued or placed; nothing changed
    Unchanged,
}

struct HubState {
    waiting: VecDeque<Arc<ClientSession>>,
    rooms: HashMap<RoomId, Arc<Room>>,
    next_room_id: u64,
    /// Seeds each new room's serve RNG
    rng: ChaCha8Rng,
}

pub struct Hub {
    config: GameConfig,
    state: Mutex<HubState>,
}

impl Hub {
    pub fn new(config: GameConfig, rng_seed: Option<u64>) -> Self {
        let rng = match rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            state: Mutex::new(HubState {
                waiting: VecDeque::new(),
                rooms: HashMap::new(),
                next_room_id: 0,
                rng,
            }),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Pair `session` with the longest-waiting session, or queue it.
    ///
    /// Every session whose binding changes is sent a `hello`.
    pub fn register_for_match(&self, session: &Arc<ClientSession>) -> Placement {
        let placement = {
            let mut state = lock(&self.state);
            let queued = state.waiting.iter().any(|s| s.id() == session.id());
            if queued || session.room_id().is_some() {
                return Placement::Unchanged;
            }

            match state.waiting.pop_front() {
                Some(other) => {
                    let id = RoomId(state.next_room_id);
                    state.next_room_id += 1;
                    let rng = ChaCha8Rng::seed_from_u64(state.rng.gen());

                    // Not yet visible to anyone else, so building it here
                    // cannot contend with the tick driver.
                    let room = Room::new(
                        id,
                        self.config,
                        rng,
                        [Some(other.clone()), Some(session.clone())],
                    );
                    state.rooms.insert(id, Arc::new(room));
                    other.set_assignment(Assignment {
                        room: Some(id),
                        seat: Seat::Left,
                    });
                    session.set_assignment(Assignment {
                        room: Some(id),
                        seat: Seat::Right,
                    });
                    tracing::info!(
                        "Created {} for {} (left) and {} (right)",
                        id,
                        other.id(),
                        session.id()
                    );
                    self.send_hello(&other);
                    Placement::Paired(id)
                }
                None => {
                    state.waiting.push_back(session.clone());
                    session.set_assignment(Assignment::default());
                    tracing::info!("{} waiting for an opponent", session.id());
                    Placement::Queued
                }
            }
        };
        self.send_hello(session);
        placement
    }

    /// Bind `session` as a spectator of the room named `room_id`.
    ///
    /// A queued session leaves the queue; a session spectating another room
    /// leaves that room. Seated players are rejected.
    pub fn join_as_spectator(
        &self,
        session: &Arc<ClientSession>,
        room_id: &str,
    ) -> Result<RoomId, HubError> {
        let not_found = || HubError::RoomNotFound(room_id.to_string());
        let id = RoomId::parse(room_id).ok_or_else(not_found)?;

        let (room, previous) = {
            let state = lock(&self.state);
            let room = state.rooms.get(&id).cloned().ok_or_else(not_found)?;
            let current = session.assignment();
            if current.seat.is_player() {
                return Err(HubError::AlreadySeated);
            }
            (room, current.room)
        };

        if !room.add_spectator(session) {
            return Err(not_found());
        }

        let seated_meanwhile = {
            let mut state = lock(&self.state);
            let current = session.assignment();
            if current.seat.is_player() || current.room != previous {
                true
            } else {
                state.waiting.retain(|s| s.id() != session.id());
                session.set_assignment(Assignment {
                    room: Some(id),
                    seat: Seat::Unassigned,
                });
                false
            }
        };

        // Paired while the hub lock was released: the seat wins.
        if seated_meanwhile {
            self.leave_room(id, session.id());
            return Err(HubError::AlreadySeated);
        }

        if let Some(prev) = previous.filter(|&prev| prev != id) {
            self.leave_room(prev, session.id());
        }

        tracing::info!("{} spectating {}", session.id(), id);
        self.send_hello(session);
        Ok(id)
    }

    /// Detach `session` from the queue, its seat or its spectator entry,
    /// removing the room if that leaves it empty. Safe to call on a session
    /// that was never registered, and more than once.
    pub fn unregister(&self, session: &ClientSession) {
        let room_id = {
            let mut state = lock(&self.state);
            let before = state.waiting.len();
            state.waiting.retain(|s| s.id() != session.id());
            let was_queued = state.waiting.len() != before;
            let room_id = session.room_id();
            session.set_assignment(Assignment::default());
            if was_queued {
                tracing::info!("{} left the queue", session.id());
                return;
            }
            room_id
        };

        if let Some(room_id) = room_id {
            self.leave_room(room_id, session.id());
        }
    }

    fn leave_room(&self, room_id: RoomId, session_id: SessionId) {
        let Some(room) = self.room(room_id) else {
            return;
        };
        if room.remove_session(session_id) {
            // A closed room stays closed, so nothing can have joined since.
            lock(&self.state).rooms.remove(&room_id);
            tracing::info!("Removed empty {}", room_id);
        }
    }

    pub fn room(&self, id: RoomId) -> Option<Arc<Room>> {
        lock(&self.state).rooms.get(&id).cloned()
    }

    /// Point-in-time copy of the active rooms.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        lock(&self.state).rooms.values().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        lock(&self.state).rooms.len()
    }

    pub fn waiting_ids(&self) -> Vec<SessionId> {
        lock(&self.state).waiting.iter().map(|s| s.id()).collect()
    }

    /// Identity and binding announcement for `session`.
    pub fn hello_for(&self, session: &ClientSession) -> HelloMsg {
        let assignment = session.assignment();
        HelloMsg {
            client_id: session.id().to_string(),
            room_id: assignment.room.map(|r| r.to_string()).unwrap_or_default(),
            side: assignment.seat,
            w: self.config.world_width as u32,
            h: self.config.world_height as u32,
        }
    }

    fn send_hello(&self, session: &ClientSession) {
        session.send(Arc::new(ServerMsg::Hello(self.hello_for(session))));
    }
}
