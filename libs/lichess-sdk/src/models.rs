//! Wire models of the lichess REST API.
//!
//! Every field is optional on the wire; missing fields decode to their
//! defaults so a sparse payload never fails a whole page.

use lichess_http::{CursorKey, PageCursor};
use serde::{Deserialize, Serialize};

/// Public user profile (`GET api/user/{username}`, `GET api/account`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub online: bool,
    /// Account creation, milliseconds since epoch
    pub created_at: i64,
    /// Last login, milliseconds since epoch
    pub seen_at: i64,
    pub play_time: PlayTime,
    pub language: Option<String>,
    pub url: String,
    pub completion_rate: Option<u32>,
    pub profile: Option<Profile>,
    #[serde(rename = "count")]
    pub stats: Stats,
    pub disabled: bool,
    pub tos_violation: bool,
    pub patron: bool,
}

/// Total and TV time in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayTime {
    pub total: u64,
    pub tv: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub country: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub fide_rating: Option<u32>,
    pub uscf_rating: Option<u32>,
    pub ecf_rating: Option<u32>,
    pub links: Option<String>,
}

/// Game counters of a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    pub all: u64,
    pub rated: u64,
    pub ai: u64,
    pub draw: u64,
    pub draw_h: u64,
    pub loss: u64,
    pub loss_h: u64,
    pub win: u64,
    pub win_h: u64,
    pub bookmark: u64,
    pub playing: u64,
    pub import: u64,
    pub me: u64,
}

/// Account preferences (`GET api/account/preferences`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub dark: bool,
    pub transp: bool,
    pub bg_img: Option<String>,
    pub is3d: bool,
    pub theme: String,
    pub piece_set: String,
    pub theme3d: String,
    pub piece_set3d: String,
    pub sound_set: String,
    pub blindfold: i32,
    pub auto_queen: i32,
    pub auto_threefold: i32,
    pub takeback: i32,
    pub moretime: i32,
    pub clock_tenths: i32,
    pub clock_bar: bool,
    pub clock_sound: bool,
    pub premove: bool,
    pub animation: i32,
    pub captured: bool,
    pub follow: bool,
    pub highlight: bool,
    pub destination: bool,
    pub coords: i32,
    pub replay: i32,
    pub challenge: i32,
    pub message: i32,
    pub coord_color: i32,
    pub submit_move: i32,
    pub confirm_resign: i32,
    pub insight_share: i32,
    pub keyboard_move: i32,
    pub zen: i32,
    pub move_event: i32,
    pub rook_castle: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub rated: bool,
    pub variant: String,
    pub speed: String,
    pub perf: String,
    /// Milliseconds since epoch; the pagination key of game exports
    pub created_at: i64,
    pub last_move_at: i64,
    pub status: String,
    pub players: Players,
    pub winner: Option<String>,
    pub moves: String,
    pub pgn: Option<String>,
    pub opening: Option<Opening>,
    pub clock: Option<Clock>,
}

impl CursorKey for Game {
    fn cursor_key(&self) -> PageCursor {
        PageCursor::new(self.created_at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Players {
    pub white: Player,
    pub black: Player,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Player {
    /// Absent for anonymous players and the AI
    pub user: Option<LightUser>,
    pub rating: Option<u32>,
    pub rating_diff: Option<i32>,
    pub ai_level: Option<u8>,
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightUser {
    pub id: String,
    pub name: String,
    pub title: Option<String>,
}

/// Computer analysis summary of one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
    pub acpl: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Opening {
    pub eco: String,
    pub name: String,
    pub ply: u32,
}

/// Clock settings in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Clock {
    pub initial: u32,
    pub increment: u32,
    pub total_time: u32,
}
