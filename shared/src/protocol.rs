//! Packet vocabulary and the `KIND|PAYLOAD` text codec.
//!
//! Every packet kind carries exactly one typed payload, encoded as JSON after
//! the first `|`. Decoding splits on that first delimiter only, so payloads may
//! contain `|` themselves.

use crate::{Archetype, BuildingType, PlayerId, ResourceKind};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-kind resource amounts, ordered for stable output.
pub type ResourceTally = BTreeMap<ResourceKind, u32>;

const DELIMITER: char = '|';

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown packet kind `{0}`")]
    UnknownKind(String),
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: PacketKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("failed to encode {kind} payload: {source}")]
    Encode {
        kind: PacketKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} is not accepted from clients")]
    UnexpectedKind(PacketKind),
}

// Client -> server payloads

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChooseArchetype {
    pub archetype: Archetype,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub place_id: u32,
    #[serde(rename = "type")]
    pub building_type: BuildingType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub place_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeSoldiersRequest {
    /// Sent by clients, not used for validation: capacity is pooled across barracks.
    #[serde(default)]
    pub barracks_id: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackRequest {
    pub target_player_id: PlayerId,
    pub soldiers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EndTurnRequest {}

// Server -> client payloads

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub nickname: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    /// The recipient's own id.
    pub player_id: PlayerId,
    pub player_count: u32,
    pub roster: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTurn {
    pub cycle: u32,
    pub turn: u32,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingState {
    pub place_id: u32,
    #[serde(rename = "type")]
    pub building_type: BuildingType,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub resources: ResourceTally,
    pub soldiers: u32,
    pub defense: u32,
    pub buildings: Vec<BuildingState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionResult {
    pub produced_by_kind: ResourceTally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackTarget {
    pub target_id: PlayerId,
    pub sent: u32,
    pub lost: u32,
    pub stolen_by_kind: ResourceTally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackReceived {
    pub from_id: PlayerId,
    pub from_nickname: String,
    pub attacked: u32,
    pub lost: u32,
    pub lost_by_kind: ResourceTally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEnded {
    pub player_id: PlayerId,
    pub next_player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub nickname: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    pub winner_id: Option<PlayerId>,
    pub winner_points: u32,
    pub all_scores: Vec<PlayerScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    pub player_id: PlayerId,
    pub nickname: String,
    pub remaining_roster: Vec<PlayerInfo>,
}

/// Discriminant of a [`Packet`], spelled on the wire as the text before `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Join,
    Archetype,
    Build,
    Upgrade,
    MakeSoldiers,
    Attack,
    EndTurn,
    Response,
    StartGame,
    StartTurn,
    State,
    ProductionResult,
    AttackTarget,
    AttackReceived,
    TurnEnded,
    GameEnd,
    PlayerLeft,
}

impl PacketKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PacketKind::Join => "JOIN",
            PacketKind::Archetype => "ARCHETYPE",
            PacketKind::Build => "BUILD",
            PacketKind::Upgrade => "UPGRADE",
            PacketKind::MakeSoldiers => "MAKE_SOLDIERS",
            PacketKind::Attack => "ATTACK",
            PacketKind::EndTurn => "END_TURN",
            PacketKind::Response => "RESPONSE",
            PacketKind::StartGame => "START_GAME",
            PacketKind::StartTurn => "START_TURN",
            PacketKind::State => "STATE",
            PacketKind::ProductionResult => "PRODUCTION_RESULT",
            PacketKind::AttackTarget => "ATTACK_TARGET",
            PacketKind::AttackReceived => "ATTACK_RECEIVED",
            PacketKind::TurnEnded => "TURN_ENDED",
            PacketKind::GameEnd => "GAME_END",
            PacketKind::PlayerLeft => "PLAYER_LEFT",
        }
    }

    /// Kinds a client may send. The rest flow server -> client only.
    pub fn is_client_request(self) -> bool {
        matches!(
            self,
            PacketKind::Join
                | PacketKind::Archetype
                | PacketKind::Build
                | PacketKind::Upgrade
                | PacketKind::MakeSoldiers
                | PacketKind::Attack
                | PacketKind::EndTurn
        )
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PacketKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "JOIN" => PacketKind::Join,
            "ARCHETYPE" => PacketKind::Archetype,
            "BUILD" => PacketKind::Build,
            "UPGRADE" => PacketKind::Upgrade,
            "MAKE_SOLDIERS" => PacketKind::MakeSoldiers,
            "ATTACK" => PacketKind::Attack,
            "END_TURN" => PacketKind::EndTurn,
            "RESPONSE" => PacketKind::Response,
            "START_GAME" => PacketKind::StartGame,
            "START_TURN" => PacketKind::StartTurn,
            "STATE" => PacketKind::State,
            "PRODUCTION_RESULT" => PacketKind::ProductionResult,
            "ATTACK_TARGET" => PacketKind::AttackTarget,
            "ATTACK_RECEIVED" => PacketKind::AttackReceived,
            "TURN_ENDED" => PacketKind::TurnEnded,
            "GAME_END" => PacketKind::GameEnd,
            "PLAYER_LEFT" => PacketKind::PlayerLeft,
            other => return Err(ProtocolError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Join(JoinRequest),
    Archetype(ChooseArchetype),
    Build(BuildRequest),
    Upgrade(UpgradeRequest),
    MakeSoldiers(MakeSoldiersRequest),
    Attack(AttackRequest),
    EndTurn(EndTurnRequest),

    Response(Response),
    StartGame(StartGame),
    StartTurn(StartTurn),
    State(StateSnapshot),
    ProductionResult(ProductionResult),
    AttackTarget(AttackTarget),
    AttackReceived(AttackReceived),
    TurnEnded(TurnEnded),
    GameEnd(GameEnd),
    PlayerLeft(PlayerLeft),
}

impl Packet {
    pub fn response(success: bool, message: impl Into<String>) -> Self {
        Packet::Response(Response {
            success,
            message: message.into(),
        })
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Join(_) => PacketKind::Join,
            Packet::Archetype(_) => PacketKind::Archetype,
            Packet::Build(_) => PacketKind::Build,
            Packet::Upgrade(_) => PacketKind::Upgrade,
            Packet::MakeSoldiers(_) => PacketKind::MakeSoldiers,
            Packet::Attack(_) => PacketKind::Attack,
            Packet::EndTurn(_) => PacketKind::EndTurn,
            Packet::Response(_) => PacketKind::Response,
            Packet::StartGame(_) => PacketKind::StartGame,
            Packet::StartTurn(_) => PacketKind::StartTurn,
            Packet::State(_) => PacketKind::State,
            Packet::ProductionResult(_) => PacketKind::ProductionResult,
            Packet::AttackTarget(_) => PacketKind::AttackTarget,
            Packet::AttackReceived(_) => PacketKind::AttackReceived,
            Packet::TurnEnded(_) => PacketKind::TurnEnded,
            Packet::GameEnd(_) => PacketKind::GameEnd,
            Packet::PlayerLeft(_) => PacketKind::PlayerLeft,
        }
    }

    /// Encodes into `KIND|PAYLOAD` text.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let kind = self.kind();
        let payload = match self {
            Packet::Join(dto) => serde_json::to_string(dto),
            Packet::Archetype(dto) => serde_json::to_string(dto),
            Packet::Build(dto) => serde_json::to_string(dto),
            Packet::Upgrade(dto) => serde_json::to_string(dto),
            Packet::MakeSoldiers(dto) => serde_json::to_string(dto),
            Packet::Attack(dto) => serde_json::to_string(dto),
            Packet::EndTurn(dto) => serde_json::to_string(dto),
            Packet::Response(dto) => serde_json::to_string(dto),
            Packet::StartGame(dto) => serde_json::to_string(dto),
            Packet::StartTurn(dto) => serde_json::to_string(dto),
            Packet::State(dto) => serde_json::to_string(dto),
            Packet::ProductionResult(dto) => serde_json::to_string(dto),
            Packet::AttackTarget(dto) => serde_json::to_string(dto),
            Packet::AttackReceived(dto) => serde_json::to_string(dto),
            Packet::TurnEnded(dto) => serde_json::to_string(dto),
            Packet::GameEnd(dto) => serde_json::to_string(dto),
            Packet::PlayerLeft(dto) => serde_json::to_string(dto),
        }
        .map_err(|source| ProtocolError::Encode { kind, source })?;

        Ok(format!("{}{}{}", kind, DELIMITER, payload))
    }

    /// Decodes `KIND|PAYLOAD` text. A missing or empty payload reads as `{}`.
    pub fn decode(text: &str) -> Result<Packet, ProtocolError> {
        let (kind_str, payload) = text.split_once(DELIMITER).unwrap_or((text, ""));
        let kind: PacketKind = kind_str.parse()?;
        let payload = if payload.trim().is_empty() { "{}" } else { payload };

        let packet = match kind {
            PacketKind::Join => Packet::Join(parse(kind, payload)?),
            PacketKind::Archetype => Packet::Archetype(parse(kind, payload)?),
            PacketKind::Build => Packet::Build(parse(kind, payload)?),
            PacketKind::Upgrade => Packet::Upgrade(parse(kind, payload)?),
            PacketKind::MakeSoldiers => Packet::MakeSoldiers(parse(kind, payload)?),
            PacketKind::Attack => Packet::Attack(parse(kind, payload)?),
            PacketKind::EndTurn => Packet::EndTurn(parse(kind, payload)?),
            PacketKind::Response => Packet::Response(parse(kind, payload)?),
            PacketKind::StartGame => Packet::StartGame(parse(kind, payload)?),
            PacketKind::StartTurn => Packet::StartTurn(parse(kind, payload)?),
            PacketKind::State => Packet::State(parse(kind, payload)?),
            PacketKind::ProductionResult => Packet::ProductionResult(parse(kind, payload)?),
            PacketKind::AttackTarget => Packet::AttackTarget(parse(kind, payload)?),
            PacketKind::AttackReceived => Packet::AttackReceived(parse(kind, payload)?),
            PacketKind::TurnEnded => Packet::TurnEnded(parse(kind, payload)?),
            PacketKind::GameEnd => Packet::GameEnd(parse(kind, payload)?),
            PacketKind::PlayerLeft => Packet::PlayerLeft(parse(kind, payload)?),
        };
        Ok(packet)
    }

    /// Encodes straight into a wire frame.
    pub fn to_frame(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(crate::framing::encode_frame(&self.encode()?))
    }

    /// Decodes a de-obfuscated frame payload.
    pub fn from_payload(payload: Vec<u8>) -> Result<Packet, ProtocolError> {
        let text = String::from_utf8(payload)?;
        Packet::decode(&text)
    }
}

fn parse<T: DeserializeOwned>(kind: PacketKind, payload: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(payload).map_err(|source| ProtocolError::MalformedPayload { kind, source })
}
