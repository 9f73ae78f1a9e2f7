//! Raid resolution between two players.

use crate::error::RuleError;
use crate::player::Player;
use crate::rules::{self, scale_percent};
use log::info;
use plantation_shared::{AttackReceived, AttackTarget, ResourceTally};
use rand::Rng;

/// Upper bound for the defense percentage an attack faces.
pub const MAX_DEFENSE: u32 = 100;

/// Outcome of one resolved attack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    pub sent: u32,
    pub lost: u32,
    /// Units moved from the target to the attacker, per kind.
    pub stolen: ResourceTally,
    /// Target defense after the target's own archetype modifier.
    pub base_defense: u32,
    /// Defense actually applied, after the attacker modifier and clamping.
    pub effective_defense: u32,
}

impl AttackReport {
    pub fn survivors(&self) -> u32 {
        self.sent - self.lost
    }

    pub fn to_attacker(&self, target_id: u32) -> AttackTarget {
        AttackTarget {
            target_id,
            sent: self.sent,
            lost: self.lost,
            stolen_by_kind: self.stolen.clone(),
        }
    }

    pub fn to_target(&self, attacker: &Player) -> AttackReceived {
        AttackReceived {
            from_id: attacker.id,
            from_nickname: attacker.nickname.clone(),
            attacked: self.sent,
            lost: self.lost,
            lost_by_kind: self.stolen.clone(),
        }
    }
}

/// Soldiers lost when `sent` soldiers face `defense` percent, rounded up.
pub fn losses(sent: u32, defense: u32) -> u32 {
    let defense = u64::from(defense.min(MAX_DEFENSE));
    ((u64::from(sent) * defense + 99) / 100) as u32
}

/// Resolves an attack by `attacker` with `soldiers` against `target`.
///
/// Phase and turn checks belong to the caller. On `Err` neither player is
/// modified.
pub fn resolve_attack<G: Rng>(
    attacker: &mut Player,
    target: &mut Player,
    soldiers: u32,
    rng: &mut G,
) -> Result<AttackReport, RuleError> {
    if soldiers == 0 {
        return Err(RuleError::InvalidCount);
    }
    if attacker.attacked_this_turn.contains(&target.id) {
        return Err(RuleError::AlreadyAttacked);
    }
    if attacker.soldiers < soldiers {
        return Err(RuleError::NotEnoughSoldiers);
    }

    attacker.soldiers -= soldiers;
    attacker.attacked_this_turn.insert(target.id);

    let base_defense = target.defense();
    let effective_defense = scale_percent(
        base_defense,
        rules::attacker_defense_percent(attacker.archetype()),
    )
    .min(MAX_DEFENSE);

    let lost = losses(soldiers, effective_defense);
    let survivors = soldiers - lost;
    let attempts = survivors.saturating_mul(rules::steals_per_survivor(attacker.archetype()));

    let mut stolen = ResourceTally::new();
    for _ in 0..attempts {
        let available = target.ledger.stocked_kinds();
        if available.is_empty() {
            break;
        }
        let kind = available[rng.gen_range(0..available.len())];
        if target.ledger.take_one(kind) {
            *stolen.entry(kind).or_insert(0) += 1;
        }
    }

    for (&kind, &amount) in &stolen {
        attacker.ledger.credit(kind, amount);
    }
    attacker.soldiers = attacker.soldiers.saturating_add(survivors);

    info!(
        "{} attacked {}: defense {}% -> {}%, lost {}, survived {}, stole {:?}",
        attacker.nickname, target.nickname, base_defense, effective_defense, lost, survivors, stolen
    );

    Ok(AttackReport {
        sent: soldiers,
        lost,
        stolen,
        base_defense,
        effective_defense,
    })
}
