use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Value of `StateMsg::seconds_left` when the room has no match clock.
pub const NO_CLOCK: i32 = -1;

/// Player role inside a room. Encoded on the wire as `0`, `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Seat {
    Left,
    Right,
    /// Queued for a match or spectating
    #[default]
    Unassigned,
}

impl Seat {
    /// Slot index for seated players.
    pub fn index(self) -> Option<usize> {
        match self {
            Seat::Left => Some(0),
            Seat::Right => Some(1),
            Seat::Unassigned => None,
        }
    }

    pub fn is_player(self) -> bool {
        self.index().is_some()
    }
}

impl From<Seat> for i8 {
    fn from(seat: Seat) -> i8 {
        match seat {
            Seat::Left => 0,
            Seat::Right => 1,
            Seat::Unassigned => -1,
        }
    }
}

impl TryFrom<i8> for Seat {
    type Error = String;

    fn try_from(side: i8) -> Result<Self, Self::Error> {
        match side {
            0 => Ok(Seat::Left),
            1 => Ok(Seat::Right),
            -1 => Ok(Seat::Unassigned),
            other => Err(format!("invalid side {}", other)),
        }
    }
}

// === Server -> Client ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type", content = "data")]
pub enum ServerMsg {
    #[serde(rename = "hello")]
    Hello(HelloMsg),
    #[serde(rename = "state")]
    State(StateMsg),
    #[serde(rename = "error")]
    Error(ErrorMsg),
}

/// Identity and seat announcement, sent once per room binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct HelloMsg {
    pub client_id: String,
    /// Empty while waiting in the matchmaking queue
    pub room_id: String,
    #[ts(type = "number")]
    pub side: Seat,
    pub w: u32,
    pub h: u32,
}

/// Per-tick room state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct StateMsg {
    pub paddle_y: [f64; 2],
    pub ball_x: f64,
    pub ball_y: f64,
    pub score: [u32; 2],
    pub running: bool,
    /// Whole seconds left in the match, or `NO_CLOCK`
    pub seconds_left: i32,
    pub spectators: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomNotFound,
    AlreadySeated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ErrorMsg {
    pub code: ErrorCode,
    pub message: String,
}

// === Client -> Server ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type", content = "data")]
pub enum ClientMsg {
    /// Spectate a room by id
    #[serde(rename = "join")]
    Join(JoinMsg),
    #[serde(rename = "move")]
    Move(MoveMsg),
    #[serde(rename = "mouse")]
    Mouse(MouseMsg),
    #[serde(rename = "name")]
    Name(NameMsg),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct JoinMsg {
    pub room_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct MoveMsg {
    /// -1 up, 1 down, 0 stop. Other values are clamped.
    pub dir: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct MouseMsg {
    /// World-space pointer y
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct NameMsg {
    pub name: String,
}
