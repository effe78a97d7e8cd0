use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque 32-byte room key, hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(pub [u8; 32]);

impl RoomId {
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| format!("invalid room id hex: {}", e))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "room id must be 32 bytes".to_string())?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomId({})", self)
    }
}

impl TryFrom<String> for RoomId {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.to_string()
    }
}

/// 20-byte account address. The zero address means "unfilled" or "no winner".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_hex(s: &str) -> Result<Self, String> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| format!("invalid address hex: {}", e))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| "address must be 20 bytes".to_string())?;
        Ok(Self(arr))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl TryFrom<String> for Address {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_string()
    }
}

/// On-chain room lifecycle. Resolved, Draw and Cancelled are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Open,
    Filled,
    InGame,
    Resolved,
    Draw,
    Cancelled,
}

impl RoomStatus {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(RoomStatus::Open),
            1 => Some(RoomStatus::Filled),
            2 => Some(RoomStatus::InGame),
            3 => Some(RoomStatus::Resolved),
            4 => Some(RoomStatus::Draw),
            5 => Some(RoomStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RoomStatus::Resolved | RoomStatus::Draw | RoomStatus::Cancelled
        )
    }

    /// Statuses the oracle is allowed to resolve from.
    pub fn is_resolvable(&self) -> bool {
        matches!(self, RoomStatus::Filled | RoomStatus::InGame)
    }
}

impl FromStr for RoomStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(RoomStatus::Open),
            "filled" => Ok(RoomStatus::Filled),
            "ingame" => Ok(RoomStatus::InGame),
            "resolved" => Ok(RoomStatus::Resolved),
            "draw" => Ok(RoomStatus::Draw),
            "cancelled" => Ok(RoomStatus::Cancelled),
            other => Err(format!("unknown room status: {}", other)),
        }
    }
}

/// Rule variants. Cards rooms carry per-player card selections on-chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Duel,
    Cards,
}

impl GameMode {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(GameMode::Duel),
            1 => Some(GameMode::Cards),
            _ => None,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMode::Duel => write!(f, "duel"),
            GameMode::Cards => write!(f, "cards"),
        }
    }
}

impl FromStr for GameMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duel" => Ok(GameMode::Duel),
            "cards" => Ok(GameMode::Cards),
            other => Err(format!("unknown game mode: {}", other)),
        }
    }
}

/// A player's recorded side of the duel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Front,
    Back,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Front => write!(f, "front"),
            Choice::Back => write!(f, "back"),
        }
    }
}

impl FromStr for Choice {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(Choice::Front),
            "back" => Ok(Choice::Back),
            other => Err(format!("unknown choice: {}", other)),
        }
    }
}

/// Decided result of a duel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    PlayerOne,
    PlayerTwo,
    Draw,
}

/// On-chain room record, authoritative for funds and status.
///
/// `card_selections` is populated only for cards-mode rooms, whose detail
/// call returns two extra fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub player1: Address,
    pub player2: Address,
    pub stake: u128,
    pub tier: u8,
    pub game_mode: GameMode,
    pub status: RoomStatus,
    pub winner: Address,
    pub created_at: u64,
    pub resolved_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_selections: Option<(u8, u8)>,
}

/// Off-chain game record: the low-latency UI cache keyed by room id.
/// Never the source of truth for money.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub room_id: RoomId,
    pub player1_choice: Option<Choice>,
    pub player2_choice: Option<Choice>,
    /// Shared fair outcome token, set once the duel is decided.
    pub flip: Option<Choice>,
    /// Status mirror (`resolved`, `draw`, ...) used to mask confirmation
    /// latency. Only ever advanced, never trusted over terminal chain state.
    pub status: Option<String>,
    pub updated_at: i64,
}

impl GameRecord {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            player1_choice: None,
            player2_choice: None,
            flip: None,
            status: None,
            updated_at: 0,
        }
    }

    pub fn choice_of(&self, room: &Room, player: &Address) -> Option<Choice> {
        if *player == room.player1 {
            self.player1_choice
        } else if *player == room.player2 {
            self.player2_choice
        } else {
            None
        }
    }
}

/// UI status vocabulary presented by the reconciled view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UiStatus {
    Open,
    WaitingChoices,
    Resolved,
    Draw,
    Cancelled,
}

impl UiStatus {
    pub fn from_chain(status: RoomStatus) -> Self {
        match status {
            RoomStatus::Open => UiStatus::Open,
            RoomStatus::Filled | RoomStatus::InGame => UiStatus::WaitingChoices,
            RoomStatus::Resolved => UiStatus::Resolved,
            RoomStatus::Draw => UiStatus::Draw,
            RoomStatus::Cancelled => UiStatus::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UiStatus::Resolved | UiStatus::Draw | UiStatus::Cancelled)
    }
}

/// Merged chain + off-chain view of a room served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub room_id: RoomId,
    pub status: UiStatus,
    pub player1: Address,
    pub player2: Address,
    pub stake: String,
    pub tier: u8,
    pub game_mode: GameMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Address>,
    pub player1_choice: Option<Choice>,
    pub player2_choice: Option<Choice>,
    pub flip: Option<Choice>,
    /// True when the flip was reconstructed from the declared winner's own
    /// choice rather than read from the off-chain record.
    pub flip_reconstructed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_selections: Option<(u8, u8)>,
    pub created_at: u64,
    pub resolved_at: u64,
}
