//! Player records: identity, archetype, resource ledger, buildings and army.

use crate::error::RuleError;
use crate::rules::{self, scale_percent};
use plantation_shared::{
    Archetype, BuildingState, BuildingType, PlayerId, PlayerInfo, ResourceKind, ResourceTally,
    StateSnapshot,
};
use std::collections::{BTreeMap, HashSet};

/// Identifies one accepted TCP connection for the lifetime of the server.
pub type ConnectionId = u64;

/// Per-kind resource quantities. Absent kinds hold zero.
///
/// Quantities are unsigned and every debit is checked first, so a ledger can
/// never go negative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    amounts: BTreeMap<ResourceKind, u32>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger holding `amount` of every resource kind.
    pub fn filled(amount: u32) -> Self {
        Self {
            amounts: ResourceKind::ALL.iter().map(|&kind| (kind, amount)).collect(),
        }
    }

    pub fn amount(&self, kind: ResourceKind) -> u32 {
        self.amounts.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: ResourceKind, amount: u32) {
        self.amounts.insert(kind, amount);
    }

    pub fn credit(&mut self, kind: ResourceKind, amount: u32) {
        let entry = self.amounts.entry(kind).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn can_afford(&self, bundle: &[(ResourceKind, u32)]) -> bool {
        bundle
            .iter()
            .all(|&(kind, amount)| self.amount(kind) >= amount)
    }

    /// Removes the whole bundle, or nothing at all.
    pub fn debit(&mut self, bundle: &[(ResourceKind, u32)]) -> Result<(), RuleError> {
        if !self.can_afford(bundle) {
            return Err(RuleError::InsufficientResources);
        }
        for &(kind, amount) in bundle {
            if let Some(held) = self.amounts.get_mut(&kind) {
                *held -= amount;
            }
        }
        Ok(())
    }

    /// Kinds currently held in a strictly positive quantity.
    pub fn stocked_kinds(&self) -> Vec<ResourceKind> {
        self.amounts
            .iter()
            .filter(|&(_, &amount)| amount > 0)
            .map(|(&kind, _)| kind)
            .collect()
    }

    /// Removes one unit of `kind`. Returns false if none was held.
    pub fn take_one(&mut self, kind: ResourceKind) -> bool {
        match self.amounts.get_mut(&kind) {
            Some(held) if *held > 0 => {
                *held -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn total_units(&self) -> u64 {
        self.amounts.values().map(|&amount| u64::from(amount)).sum()
    }

    /// Every kind with its quantity, zeros included.
    pub fn tally(&self) -> ResourceTally {
        ResourceKind::ALL
            .iter()
            .map(|&kind| (kind, self.amount(kind)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.amounts.iter().map(|(&kind, &amount)| (kind, amount))
    }
}

/// A building on one of a player's places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Building {
    pub place_id: u32,
    pub building_type: BuildingType,
    pub level: u8,
    /// Global turn of construction or last upgrade.
    pub turn_built: u32,
}

impl Building {
    pub fn new(place_id: u32, building_type: BuildingType, turn_built: u32) -> Self {
        Self {
            place_id,
            building_type,
            level: rules::MIN_LEVEL,
            turn_built,
        }
    }

    pub fn state(&self) -> BuildingState {
        BuildingState {
            place_id: self.place_id,
            building_type: self.building_type,
            level: self.level,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub contact: String,
    /// Connection that joined this player. Used to route outgoing packets.
    pub connection: ConnectionId,
    archetype: Option<Archetype>,
    pub ledger: Ledger,
    pub buildings: Vec<Building>,
    pub soldiers: u32,
    pub soldiers_made_this_turn: u32,
    pub attacked_this_turn: HashSet<PlayerId>,
}

impl Player {
    pub fn new(
        id: PlayerId,
        nickname: String,
        contact: String,
        connection: ConnectionId,
        soldiers: u32,
    ) -> Self {
        Self {
            id,
            nickname,
            contact,
            connection,
            archetype: None,
            ledger: Ledger::new(),
            buildings: Vec::new(),
            soldiers,
            soldiers_made_this_turn: 0,
            attacked_this_turn: HashSet::new(),
        }
    }

    /// Locks in the archetype and hands out one unit of every resource.
    pub fn choose_archetype(&mut self, archetype: Archetype) -> Result<(), RuleError> {
        if self.archetype.is_some() {
            return Err(RuleError::ArchetypeAlreadyChosen);
        }
        self.archetype = Some(archetype);
        self.ledger = Ledger::filled(1);
        Ok(())
    }

    pub fn has_archetype(&self) -> bool {
        self.archetype.is_some()
    }

    /// The chosen archetype, `Neutral` until one is picked.
    pub fn archetype(&self) -> Archetype {
        self.archetype.unwrap_or_default()
    }

    pub fn building_at(&self, place_id: u32) -> Option<&Building> {
        self.buildings.iter().find(|b| b.place_id == place_id)
    }

    pub fn building_at_mut(&mut self, place_id: u32) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|b| b.place_id == place_id)
    }

    /// Indices into `buildings` in ascending place-id order.
    pub fn building_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.buildings.len()).collect();
        order.sort_by_key(|&i| self.buildings[i].place_id);
        order
    }

    /// Fortification total scaled by this player's archetype.
    pub fn defense(&self) -> u32 {
        let base: u32 = self
            .buildings
            .iter()
            .map(|b| rules::defense_value(b.building_type, b.level))
            .sum();
        scale_percent(base, rules::owner_defense_percent(self.archetype()))
    }

    /// Soldiers all barracks together may train per turn.
    pub fn soldier_capacity(&self) -> u32 {
        self.buildings
            .iter()
            .filter(|b| b.building_type == BuildingType::Barracks)
            .map(|b| rules::level_rate(b.building_type, b.level))
            .sum()
    }

    pub fn remaining_soldier_quota(&self) -> u32 {
        self.soldier_capacity()
            .saturating_sub(self.soldiers_made_this_turn)
    }

    /// Clears per-turn counters at the start of this player's turn.
    pub fn begin_turn(&mut self) {
        self.soldiers_made_this_turn = 0;
        self.attacked_this_turn.clear();
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            nickname: self.nickname.clone(),
            contact: self.contact.clone(),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            resources: self.ledger.tally(),
            soldiers: self.soldiers,
            defense: self.defense(),
            buildings: self.buildings.iter().map(Building::state).collect(),
        }
    }
}
