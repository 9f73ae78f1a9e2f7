//! Wire vocabulary shared by the plantation server and its clients.
//!
//! Holds the closed game enumerations that travel inside payloads, the
//! length-prefixed obfuscated framing ([`framing`]) and the `KIND|JSON`
//! packet codec ([`protocol`]).

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod framing;
pub mod protocol;

pub use framing::{decode_frame, encode_frame, obfuscate, Frame, FrameDecoder, FrameError};
pub use protocol::{
    AttackReceived, AttackRequest, AttackTarget, BuildRequest, BuildingState, ChooseArchetype,
    EndTurnRequest, GameEnd, JoinRequest, MakeSoldiersRequest, Packet, PacketKind, PlayerInfo,
    PlayerLeft, PlayerScore, ProductionResult, ProtocolError, ResourceTally, Response, StartGame,
    StartTurn, StateSnapshot, TurnEnded, UpgradeRequest,
};

/// Server-assigned player identifier. Strictly increasing, never reused.
pub type PlayerId = u32;

/// Everything a player can hold in their ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Wood,
    Stone,
    Ore,
    Wheat,
    Lumber,
    Bricks,
    Metal,
    Coal,
    Sand,
    Bread,
    Furniture,
    Walls,
    Tools,
    Glass,
    Weapon,
    Gold,
    Emerald,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 17] = [
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Ore,
        ResourceKind::Wheat,
        ResourceKind::Lumber,
        ResourceKind::Bricks,
        ResourceKind::Metal,
        ResourceKind::Coal,
        ResourceKind::Sand,
        ResourceKind::Bread,
        ResourceKind::Furniture,
        ResourceKind::Walls,
        ResourceKind::Tools,
        ResourceKind::Glass,
        ResourceKind::Weapon,
        ResourceKind::Gold,
        ResourceKind::Emerald,
    ];

    /// Base score for one unit before archetype modifiers.
    pub fn points(self) -> u32 {
        match self {
            ResourceKind::Wood | ResourceKind::Stone | ResourceKind::Ore | ResourceKind::Wheat => 1,
            ResourceKind::Lumber | ResourceKind::Bricks | ResourceKind::Coal | ResourceKind::Sand => 3,
            ResourceKind::Metal | ResourceKind::Bread => 4,
            ResourceKind::Walls => 9,
            ResourceKind::Furniture | ResourceKind::Tools | ResourceKind::Glass => 11,
            ResourceKind::Weapon => 14,
            ResourceKind::Gold => 43,
            ResourceKind::Emerald => 62,
        }
    }

    pub fn is_rare(self) -> bool {
        matches!(self, ResourceKind::Gold | ResourceKind::Emerald)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which of the three building families a type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingCategory {
    /// Consumes nothing, emits one raw resource per turn.
    Producer,
    /// Converts an input bundle into one refined resource per cycle.
    Processor,
    /// Barracks and fortifications. Emit no resources.
    Military,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingType {
    Logging,
    Quarry,
    Mine,
    Farm,
    Sawmill,
    Kiln,
    Smelter,
    Charcoal,
    Crusher,
    Bakery,
    Carpentry,
    Masonry,
    Forge,
    Glassworks,
    Armory,
    Laboratory,
    AlchemyFurnace,
    Barracks,
    Barricade,
    DefenseTower,
}

impl BuildingType {
    pub const ALL: [BuildingType; 20] = [
        BuildingType::Logging,
        BuildingType::Quarry,
        BuildingType::Mine,
        BuildingType::Farm,
        BuildingType::Sawmill,
        BuildingType::Kiln,
        BuildingType::Smelter,
        BuildingType::Charcoal,
        BuildingType::Crusher,
        BuildingType::Bakery,
        BuildingType::Carpentry,
        BuildingType::Masonry,
        BuildingType::Forge,
        BuildingType::Glassworks,
        BuildingType::Armory,
        BuildingType::Laboratory,
        BuildingType::AlchemyFurnace,
        BuildingType::Barracks,
        BuildingType::Barricade,
        BuildingType::DefenseTower,
    ];

    pub fn category(self) -> BuildingCategory {
        match self {
            BuildingType::Logging | BuildingType::Quarry | BuildingType::Mine | BuildingType::Farm => {
                BuildingCategory::Producer
            }
            BuildingType::Barracks | BuildingType::Barricade | BuildingType::DefenseTower => {
                BuildingCategory::Military
            }
            _ => BuildingCategory::Processor,
        }
    }

    pub fn is_producer(self) -> bool {
        self.category() == BuildingCategory::Producer
    }

    pub fn is_processor(self) -> bool {
        self.category() == BuildingCategory::Processor
    }

    /// Highest level this building can reach. Fortifications stop at 2: their
    /// balance table has no level 3 cost or defense value, so a third level
    /// would be a free upgrade that drops the bonus to zero.
    pub fn max_level(self) -> u8 {
        match self {
            BuildingType::Barricade | BuildingType::DefenseTower => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Permanent per-player trait chosen once after the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Archetype {
    /// Sturdier defenses, cheaper points.
    Greedy,
    /// Weaker defenses, richer points.
    Patron,
    /// Pierces defenses, expensive soldiers.
    Warrior,
    /// Cheap soldiers that struggle against defenses.
    Recruit,
    /// Gets part of every build cost back.
    Engineer,
    /// Rare resource specialist.
    Alchemist,
    /// Each surviving soldier steals twice.
    Glutton,
    #[default]
    Neutral,
}

impl Archetype {
    pub const ALL: [Archetype; 8] = [
        Archetype::Greedy,
        Archetype::Patron,
        Archetype::Warrior,
        Archetype::Recruit,
        Archetype::Engineer,
        Archetype::Alchemist,
        Archetype::Glutton,
        Archetype::Neutral,
    ];
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_building_has_exactly_one_category() {
        let producers = BuildingType::ALL.iter().filter(|b| b.is_producer()).count();
        let processors = BuildingType::ALL.iter().filter(|b| b.is_processor()).count();
        let military = BuildingType::ALL
            .iter()
            .filter(|b| b.category() == BuildingCategory::Military)
            .count();

        assert_eq!(producers, 4);
        assert_eq!(processors, 13);
        assert_eq!(military, 3);
        assert_eq!(producers + processors + military, BuildingType::ALL.len());
    }

    #[test]
    fn test_rare_resources_are_worth_the_most() {
        let top = ResourceKind::ALL.iter().max_by_key(|r| r.points()).unwrap();
        assert_eq!(*top, ResourceKind::Emerald);
        assert!(ResourceKind::Gold.is_rare());
        assert!(!ResourceKind::Weapon.is_rare());
        assert!(ResourceKind::ALL.iter().all(|r| r.points() >= 1));
    }

    #[test]
    fn test_fortifications_cap_at_level_two() {
        assert_eq!(BuildingType::Barricade.max_level(), 2);
        assert_eq!(BuildingType::DefenseTower.max_level(), 2);
        assert_eq!(BuildingType::Barracks.max_level(), 3);
        assert_eq!(BuildingType::Logging.max_level(), 3);
    }

    #[test]
    fn test_enums_serialize_by_name() {
        assert_eq!(serde_json::to_string(&ResourceKind::Wood).unwrap(), "\"Wood\"");
        assert_eq!(
            serde_json::to_string(&BuildingType::AlchemyFurnace).unwrap(),
            "\"AlchemyFurnace\""
        );
        let archetype: Archetype = serde_json::from_str("\"Glutton\"").unwrap();
        assert_eq!(archetype, Archetype::Glutton);
        assert_eq!(Archetype::default(), Archetype::Neutral);
    }
}
