//! One match: two paddle slots, the ball, score, match clock and spectators.
//!
//! All mutable state sits behind a single mutex so that `step` and
//! `snapshot` are atomic with respect to hub bookkeeping touching the room.

use crate::session::{lock, ClientSession, PaddleInput, SessionId};
use pong_shared::config::GameConfig;
use pong_shared::protocol::{Seat, StateMsg, NO_CLOCK};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

/// Speed multiplier applied on every paddle hit
const HIT_SPEEDUP: f64 = 1.04;
/// Deflection at the paddle tip (radians, ~51.5 degrees)
const MAX_DEFLECTION: f64 = 0.9;
/// Serve angle is uniform in [-SERVE_MAX_ANGLE, SERVE_MAX_ANGLE) radians
const SERVE_MAX_ANGLE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(pub u64);

impl RoomId {
    /// Parse the wire form `room-<n>`.
    pub fn parse(s: &str) -> Option<Self> {
        s.strip_prefix("room-")?.parse().ok().map(RoomId)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Ball {
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

#[derive(Debug, Clone, Copy)]
struct MatchClock {
    start: Instant,
    end: Instant,
}

/// Result of a locked step followed by a snapshot.
pub struct TickOutput {
    pub state: StateMsg,
    /// Both seated players and every live spectator
    pub recipients: Vec<Arc<ClientSession>>,
}

struct RoomState {
    seats: [Option<Arc<ClientSession>>; 2],
    spectators: BTreeMap<SessionId, Weak<ClientSession>>,
    paddle_y: [f64; 2],
    ball: Ball,
    score: [u32; 2],
    clock: Option<MatchClock>,
    /// Set once the room has emptied; a closed room accepts nobody
    closed: bool,
    rng: ChaCha8Rng,
}

pub struct Room {
    id: RoomId,
    config: GameConfig,
    state: Mutex<RoomState>,
}

impl Room {
    /// Create a room with the given occupants and serve the first round,
    /// which also starts the match clock.
    pub fn new(
        id: RoomId,
        config: GameConfig,
        rng: ChaCha8Rng,
        seats: [Option<Arc<ClientSession>>; 2],
    ) -> Self {
        Self::new_at(id, config, rng, seats, Instant::now())
    }

    pub fn new_at(
        id: RoomId,
        config: GameConfig,
        rng: ChaCha8Rng,
        seats: [Option<Arc<ClientSession>>; 2],
        now: Instant,
    ) -> Self {
        let mut state = RoomState {
            seats,
            spectators: BTreeMap::new(),
            paddle_y: [config.paddle_center_y(); 2],
            ball: Ball {
                x: config.world_width / 2.0,
                y: config.world_height / 2.0,
                vx: 0.0,
                vy: 0.0,
            },
            score: [0, 0],
            clock: None,
            closed: false,
            rng,
        };
        state.reset_round(&config, now);
        Self {
            id,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn step(&self, dt: f64) {
        self.step_at(dt, Instant::now());
    }

    /// Advance the simulation by `dt` seconds. No-op unless both seats are
    /// filled and the match clock has not run out.
    pub fn step_at(&self, dt: f64, now: Instant) {
        lock(&self.state).step(&self.config, dt, now);
    }

    pub fn snapshot(&self) -> StateMsg {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> StateMsg {
        lock(&self.state).snapshot(now)
    }

    /// Step then snapshot under one lock, and collect who should receive it.
    pub fn advance(&self, dt: f64, now: Instant) -> TickOutput {
        let mut state = lock(&self.state);
        state.step(&self.config, dt, now);
        TickOutput {
            state: state.snapshot(now),
            recipients: state.occupants(),
        }
    }

    pub fn is_running_at(&self, now: Instant) -> bool {
        lock(&self.state).running(now)
    }

    /// Match start and end, fixed when the first round was served.
    pub fn match_window(&self) -> Option<(Instant, Instant)> {
        lock(&self.state).clock.map(|c| (c.start, c.end))
    }

    pub fn score(&self) -> [u32; 2] {
        lock(&self.state).score
    }

    /// Session occupying `seat`, if any.
    pub fn player(&self, seat: Seat) -> Option<Arc<ClientSession>> {
        let slot = seat.index()?;
        lock(&self.state).seats[slot].clone()
    }

    pub fn spectator_ids(&self) -> Vec<SessionId> {
        lock(&self.state).spectators.keys().copied().collect()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Record `session` as a spectator, replacing any earlier entry for the
    /// same id. Returns false if the room has already been closed.
    pub(crate) fn add_spectator(&self, session: &Arc<ClientSession>) -> bool {
        let mut state = lock(&self.state);
        if state.closed {
            return false;
        }
        state
            .spectators
            .insert(session.id(), Arc::downgrade(session));
        true
    }

    /// Remove `id` from its seat, or failing that from the spectators.
    /// Returns true when the room is left empty, which closes it for good.
    pub(crate) fn remove_session(&self, id: SessionId) -> bool {
        let mut state = lock(&self.state);
        let mut found = false;
        for slot in state.seats.iter_mut() {
            if slot.as_ref().is_some_and(|s| s.id() == id) {
                *slot = None;
                found = true;
                break;
            }
        }
        if !found {
            state.spectators.remove(&id);
        }
        if state.seats.iter().all(Option::is_none) && state.spectators.is_empty() {
            state.closed = true;
        }
        state.closed
    }
}

impl RoomState {
    fn both_seated(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    fn expired(&self, now: Instant) -> bool {
        self.clock.is_some_and(|c| now > c.end)
    }

    fn running(&self, now: Instant) -> bool {
        self.both_seated() && !self.expired(now)
    }

    fn occupants(&self) -> Vec<Arc<ClientSession>> {
        self.seats
            .iter()
            .flatten()
            .cloned()
            .chain(self.spectators.values().filter_map(Weak::upgrade))
            .collect()
    }

    fn step(&mut self, cfg: &GameConfig, dt: f64, now: Instant) {
        if !self.running(now) {
            return;
        }

        let max_y = cfg.paddle_max_y();
        for (slot, seat) in self.seats.iter().enumerate() {
            let Some(session) = seat else { continue };
            self.paddle_y[slot] = match session.input() {
                PaddleInput::Target(y) => (y - cfg.paddle_height / 2.0).clamp(0.0, max_y),
                PaddleInput::Direction(dir) => {
                    (self.paddle_y[slot] + dir as f64 * cfg.paddle_speed * dt).clamp(0.0, max_y)
                }
            };
        }

        let r = cfg.ball_radius;
        self.ball.x += self.ball.vx * dt;
        self.ball.y += self.ball.vy * dt;

        if self.ball.y - r < 0.0 {
            self.ball.y = r;
            self.ball.vy = -self.ball.vy;
        } else if self.ball.y + r > cfg.world_height {
            self.ball.y = cfg.world_height - r;
            self.ball.vy = -self.ball.vy;
        }

        if self.paddle_contact(cfg, 0) {
            self.ball.x = cfg.left_paddle_face() + r;
            self.bounce_off_paddle(cfg, 0);
        } else if self.paddle_contact(cfg, 1) {
            self.ball.x = cfg.right_paddle_face() - r;
            self.bounce_off_paddle(cfg, 1);
        }

        if self.ball.x + r < 0.0 {
            self.score[1] += 1;
            self.reset_round(cfg, now);
        } else if self.ball.x - r > cfg.world_width {
            self.score[0] += 1;
            self.reset_round(cfg, now);
        }
    }

    /// Same test for both sides: moving toward the paddle, leading edge at or
    /// past the face, not yet fully behind the back edge, and overlapping it
    /// vertically.
    fn paddle_contact(&self, cfg: &GameConfig, slot: usize) -> bool {
        let r = cfg.ball_radius;
        let b = &self.ball;
        let (toward, reached_face, not_through) = if slot == 0 {
            (
                b.vx < 0.0,
                b.x - r <= cfg.left_paddle_face(),
                b.x + r >= cfg.paddle_margin,
            )
        } else {
            (
                b.vx > 0.0,
                b.x + r >= cfg.right_paddle_face(),
                b.x - r <= cfg.world_width - cfg.paddle_margin,
            )
        };
        let top = self.paddle_y[slot];
        let overlaps = b.y + r >= top && b.y - r <= top + cfg.paddle_height;
        toward && reached_face && not_through && overlaps
    }

    fn bounce_off_paddle(&mut self, cfg: &GameConfig, slot: usize) {
        let half = cfg.paddle_height / 2.0;
        let rel = ((self.ball.y - (self.paddle_y[slot] + half)) / half).clamp(-1.0, 1.0);
        let speed = (self.ball.speed() * HIT_SPEEDUP).clamp(cfg.ball_base_speed, cfg.ball_max_speed);
        let angle = rel * MAX_DEFLECTION;
        let away = if slot == 0 { 1.0 } else { -1.0 };

        self.ball.vx = away * speed * angle.cos();
        self.ball.vy = speed * angle.sin();
    }

    /// New rally. Starts the match clock the first time only.
    fn reset_round(&mut self, cfg: &GameConfig, now: Instant) {
        self.paddle_y = [cfg.paddle_center_y(); 2];

        let angle = self.rng.gen_range(-SERVE_MAX_ANGLE..SERVE_MAX_ANGLE);
        let dir = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.ball = Ball {
            x: cfg.world_width / 2.0,
            y: cfg.world_height / 2.0,
            vx: dir * cfg.ball_base_speed * angle.cos(),
            vy: cfg.ball_base_speed * angle.sin(),
        };

        if self.clock.is_none() {
            self.clock = Some(MatchClock {
                start: now,
                end: now + Duration::from_secs(cfg.match_duration_secs as u64),
            });
        }
    }

    fn snapshot(&self, now: Instant) -> StateMsg {
        let seconds_left = match self.clock {
            Some(clock) => clock.end.saturating_duration_since(now).as_secs_f64().round() as i32,
            None => NO_CLOCK,
        };
        StateMsg {
            paddle_y: self.paddle_y,
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            score: self.score,
            running: self.running(now),
            seconds_left,
            spectators: self
                .spectators
                .values()
                .filter_map(Weak::upgrade)
                .map(|s| s.display_name())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const DT: f64 = 1.0 / 60.0;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn test_session(id: u64) -> Arc<ClientSession> {
        ClientSession::new(SessionId(id), 8).0
    }

    /// Room with both seats filled, created at `now`.
    fn test_room(now: Instant) -> (Room, Arc<ClientSession>, Arc<ClientSession>) {
        let left = test_session(1);
        let right = test_session(2);
        let room = Room::new_at(
            RoomId(0),
            GameConfig::default(),
            test_rng(),
            [Some(left.clone()), Some(right.clone())],
            now,
        );
        (room, left, right)
    }

    fn set_ball(room: &Room, ball: Ball) {
        lock(&room.state).ball = ball;
    }

    fn ball(room: &Room) -> Ball {
        lock(&room.state).ball
    }

    fn paddles(room: &Room) -> [f64; 2] {
        lock(&room.state).paddle_y
    }

    fn set_paddles(room: &Room, paddle_y: [f64; 2]) {
        lock(&room.state).paddle_y = paddle_y;
    }

    fn match_end(room: &Room) -> Instant {
        room.match_window().unwrap().1
    }

    #[test]
    fn room_id_wire_form() {
        assert_eq!(RoomId(12).to_string(), "room-12");
        assert_eq!(RoomId::parse("room-12"), Some(RoomId(12)));
        assert_eq!(RoomId::parse("room-"), None);
        assert_eq!(RoomId::parse("12"), None);
        assert_eq!(RoomId::parse("room--1"), None);
    }

    #[test]
    fn new_room_serves_from_center_at_base_speed() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        let b = ball(&room);
        assert_eq!((b.x, b.y), (400.0, 300.0));
        assert!((b.speed() - 360.0).abs() < 1e-9);
        assert!(b.vy.abs() <= 360.0 * SERVE_MAX_ANGLE.sin() + 1e-9);
        assert_eq!(paddles(&room), [255.0, 255.0]);
        assert_eq!(match_end(&room), now + Duration::from_secs(300));
    }

    #[test]
    fn step_is_noop_with_empty_seat() {
        let now = Instant::now();
        let left = test_session(1);
        let room = Room::new_at(
            RoomId(0),
            GameConfig::default(),
            test_rng(),
            [Some(left), None],
            now,
        );
        let before = ball(&room);
        room.step_at(DT, now);
        assert_eq!(ball(&room), before);
        assert!(!room.snapshot_at(now).running);
    }

    #[test]
    fn step_is_noop_after_match_clock_expires() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        let later = now + Duration::from_secs(301);
        let before = ball(&room);
        room.step_at(DT, later);
        assert_eq!(ball(&room), before);

        let snap = room.snapshot_at(later);
        assert!(!snap.running);
        assert_eq!(snap.seconds_left, 0);
    }

    #[test]
    fn seconds_left_rounds_to_whole_seconds() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        assert_eq!(room.snapshot_at(now).seconds_left, 300);
        let snap = room.snapshot_at(now + Duration::from_millis(10_400));
        assert_eq!(snap.seconds_left, 290);
        let snap = room.snapshot_at(now + Duration::from_millis(10_600));
        assert_eq!(snap.seconds_left, 289);
    }

    #[test]
    fn snapshot_is_idempotent() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        room.step_at(DT, now);
        assert_eq!(room.snapshot_at(now), room.snapshot_at(now));
    }

    #[test]
    fn direction_input_moves_and_clamps_paddle() {
        let now = Instant::now();
        let (room, left, right) = test_room(now);
        left.set_direction(1);
        right.set_direction(-1);
        room.step_at(DT, now);
        let p = paddles(&room);
        assert!((p[0] - (255.0 + 7.0)).abs() < 1e-9);
        assert!((p[1] - (255.0 - 7.0)).abs() < 1e-9);

        // Hold long enough to hit both walls; keep the ball parked mid-field.
        for _ in 0..200 {
            set_ball(&room, Ball { x: 400.0, y: 300.0, vx: 0.0, vy: 0.0 });
            room.step_at(DT, now);
        }
        assert_eq!(paddles(&room), [510.0, 0.0]);
    }

    #[test]
    fn target_input_centers_paddle_on_pointer() {
        let now = Instant::now();
        let (room, left, right) = test_room(now);
        left.set_target_y(100.0);
        right.set_target_y(-500.0);
        room.step_at(DT, now);
        assert_eq!(paddles(&room), [55.0, 0.0]);

        right.set_target_y(10_000.0);
        room.step_at(DT, now);
        assert_eq!(paddles(&room)[1], 510.0);
    }

    #[test]
    fn paddles_always_within_bounds() {
        let now = Instant::now();
        let (room, left, right) = test_room(now);
        let mut rng = test_rng();
        for _ in 0..2000 {
            if rng.gen_bool(0.5) {
                left.set_direction(rng.gen_range(-3..=3));
            } else {
                left.set_target_y(rng.gen_range(-1000.0..1600.0));
            }
            right.set_direction(rng.gen_range(-1..=1));
            room.step_at(rng.gen_range(0.0..0.1), now);
            for y in paddles(&room) {
                assert!((0.0..=510.0).contains(&y), "paddle out of bounds: {}", y);
            }
        }
    }

    #[test]
    fn ball_stays_between_walls() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        let mut rng = test_rng();
        for _ in 0..2000 {
            set_ball(
                &room,
                Ball {
                    x: rng.gen_range(100.0..700.0),
                    y: rng.gen_range(8.0..592.0),
                    vx: rng.gen_range(-850.0..850.0),
                    vy: rng.gen_range(-850.0..850.0),
                },
            );
            room.step_at(DT, now);
            let b = ball(&room);
            assert!(b.y >= 8.0 && b.y <= 592.0, "ball escaped walls: {}", b.y);
        }
    }

    #[test]
    fn top_wall_reflects_without_energy_loss() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_ball(&room, Ball { x: 400.0, y: 10.0, vx: 100.0, vy: -300.0 });
        room.step_at(DT, now);
        let b = ball(&room);
        assert_eq!(b.y, 8.0);
        assert_eq!(b.vy, 300.0);
        assert_eq!(b.vx, 100.0);
    }

    #[test]
    fn bottom_wall_reflects() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_ball(&room, Ball { x: 400.0, y: 590.0, vx: 0.0, vy: 300.0 });
        room.step_at(DT, now);
        let b = ball(&room);
        assert_eq!(b.y, 592.0);
        assert_eq!(b.vy, -300.0);
    }

    #[test]
    fn dead_center_hit_on_left_paddle() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_paddles(&room, [255.0, 255.0]);
        set_ball(&room, Ball { x: 43.0, y: 300.0, vx: -360.0, vy: 0.0 });
        room.step_at(DT, now);
        let b = ball(&room);
        assert_eq!(b.x, 40.0);
        assert_eq!(b.vy, 0.0);
        assert!((b.vx - 360.0 * 1.04).abs() < 1e-9);
    }

    #[test]
    fn right_paddle_hit_sends_ball_left() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_paddles(&room, [255.0, 255.0]);
        set_ball(&room, Ball { x: 757.0, y: 300.0, vx: 360.0, vy: 0.0 });
        room.step_at(DT, now);
        let b = ball(&room);
        assert_eq!(b.x, 760.0);
        assert!(b.vx < 0.0);
        assert!((b.speed() - 374.4).abs() < 1e-9);
    }

    #[test]
    fn edge_hit_deflects_by_max_angle() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_paddles(&room, [255.0, 255.0]);
        // Below the paddle's bottom half: rel clamps to 1.
        set_ball(&room, Ball { x: 43.0, y: 349.0, vx: -500.0, vy: 0.0 });
        room.step_at(DT, now);
        let b = ball(&room);
        let speed = 520.0;
        assert!((b.vx - speed * 0.9f64.cos()).abs() < 1e-9);
        assert!((b.vy - speed * 0.9f64.sin()).abs() < 1e-9);
    }

    #[test]
    fn ball_behind_paddle_does_not_collide() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_paddles(&room, [255.0, 255.0]);
        // Fully behind the left paddle's back edge (x + r < margin).
        set_ball(&room, Ball { x: 10.0, y: 300.0, vx: -360.0, vy: 0.0 });
        room.step_at(DT, now);
        let b = ball(&room);
        assert!(b.vx < 0.0);
        assert!((b.x - 4.0).abs() < 1e-9);
    }

    #[test]
    fn ball_moving_away_is_not_caught_by_paddle() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_paddles(&room, [255.0, 255.0]);
        set_ball(&room, Ball { x: 36.0, y: 300.0, vx: 360.0, vy: 0.0 });
        room.step_at(DT, now);
        let b = ball(&room);
        assert!((b.x - 42.0).abs() < 1e-9);
        assert_eq!(b.vx, 360.0);
    }

    #[test]
    fn hit_speed_never_decreases_and_caps_at_max() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        let mut last_speed = 360.0;
        for i in 0..60 {
            set_paddles(&room, [255.0, 255.0]);
            let b = ball(&room);
            let speed = b.speed();
            let next = if i % 2 == 0 {
                Ball { x: 43.0, y: 310.0, vx: -speed * 0.99, vy: speed * 0.141 }
            } else {
                Ball { x: 757.0, y: 290.0, vx: speed * 0.99, vy: speed * 0.141 }
            };
            set_ball(&room, next);
            room.step_at(DT, now);
            let after = ball(&room).speed();
            assert!(after + 1e-9 >= last_speed, "speed decreased: {} -> {}", last_speed, after);
            assert!(after <= 850.0 + 1e-9);
            last_speed = after;
        }
        assert!((last_speed - 850.0).abs() < 1e-9);
    }

    #[test]
    fn ball_exiting_left_scores_for_right_and_resets() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        let end = match_end(&room);
        set_paddles(&room, [0.0, 0.0]);
        set_ball(&room, Ball { x: -5.0, y: 300.0, vx: -360.0, vy: 0.0 });
        room.step_at(DT, now + Duration::from_secs(10));

        assert_eq!(room.score(), [0, 1]);
        let b = ball(&room);
        assert_eq!((b.x, b.y), (400.0, 300.0));
        assert!((b.speed() - 360.0).abs() < 1e-9);
        assert_eq!(paddles(&room), [255.0, 255.0]);
        assert_eq!(match_end(&room), end);
    }

    #[test]
    fn ball_exiting_right_scores_for_left() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_paddles(&room, [0.0, 0.0]);
        set_ball(&room, Ball { x: 805.0, y: 300.0, vx: 360.0, vy: 0.0 });
        room.step_at(DT, now);
        assert_eq!(room.score(), [1, 0]);
    }

    #[test]
    fn scoring_takes_whole_ball_past_the_line() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        set_paddles(&room, [0.0, 0.0]);
        set_ball(&room, Ball { x: 12.0, y: 300.0, vx: -360.0, vy: 0.0 });
        let mut steps = 0;
        while room.score() == [0, 0] {
            room.step_at(DT, now);
            steps += 1;
            assert!(steps < 10);
        }
        assert_eq!(room.score(), [0, 1]);
        assert!(steps >= 2);
    }

    #[test]
    fn serves_are_random_in_direction_and_bounded() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        let mut lefts = 0;
        for _ in 0..200 {
            set_paddles(&room, [0.0, 0.0]);
            set_ball(&room, Ball { x: -20.0, y: 300.0, vx: -360.0, vy: 0.0 });
            room.step_at(DT, now);
            let b = ball(&room);
            assert!((b.speed() - 360.0).abs() < 1e-9);
            assert!(b.vy.abs() <= 360.0 * SERVE_MAX_ANGLE.sin() + 1e-9);
            if b.vx < 0.0 {
                lefts += 1;
            }
        }
        assert!(lefts > 50 && lefts < 150, "serve direction skewed: {}", lefts);
        assert_eq!(room.score(), [0, 200]);
    }

    #[test]
    fn spectators_listed_by_display_name() {
        let now = Instant::now();
        let (room, _, _) = test_room(now);
        let a = test_session(10);
        let b = test_session(11);
        b.set_name(Some("bob"));
        assert!(room.add_spectator(&a));
        assert!(room.add_spectator(&b));
        // Re-join overwrites rather than duplicating.
        assert!(room.add_spectator(&a));

        let snap = room.snapshot_at(now);
        assert_eq!(snap.spectators, vec!["c-10".to_string(), "bob".to_string()]);
        assert_eq!(room.advance(DT, now).recipients.len(), 4);
    }

    #[test]
    fn room_closes_only_when_fully_empty() {
        let now = Instant::now();
        let (room, left, right) = test_room(now);
        let spec = test_session(10);
        room.add_spectator(&spec);

        assert!(!room.remove_session(left.id()));
        assert!(room.player(Seat::Left).is_none());
        assert!(!room.remove_session(right.id()));
        assert!(room.remove_session(spec.id()));
        assert!(room.is_closed());
        assert!(!room.add_spectator(&spec));
    }

    #[test]
    fn advance_snapshot_matches_post_step_state() {
        let now = Instant::now();
        let (room, left, _) = test_room(now);
        left.set_direction(1);
        let out = room.advance(DT, now);
        assert_eq!(out.state, room.snapshot_at(now));
        assert_eq!(out.recipients.len(), 2);
        assert!(out.state.running);
    }
}
