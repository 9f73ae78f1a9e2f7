//! Construction, upgrades, per-turn production and processing, soldier training.
//!
//! Every operation validates fully before it mutates, so a rejected request
//! leaves the player untouched.

use crate::error::RuleError;
use crate::player::{Building, Player};
use crate::rules;
use log::debug;
use plantation_shared::{BuildingType, ResourceKind, ResourceTally};
use rand::Rng;

/// Builds a level-1 `building_type` at `place_id`.
///
/// Returns the resource kinds refunded by the engineer bonus, one unit each
/// (a kind may repeat).
pub fn build<G: Rng>(
    player: &mut Player,
    place_id: u32,
    building_type: BuildingType,
    turn: u32,
    rng: &mut G,
) -> Result<Vec<ResourceKind>, RuleError> {
    if player.building_at(place_id).is_some() {
        return Err(RuleError::PlaceOccupied);
    }

    let cost = rules::build_cost(building_type);
    player.ledger.debit(cost)?;
    player
        .buildings
        .push(Building::new(place_id, building_type, turn));

    let mut refunded = Vec::new();
    if rules::refunds_on_build(player.archetype()) && !cost.is_empty() {
        let picks = rng.gen_range(1..=2);
        for _ in 0..picks {
            let (kind, _) = cost[rng.gen_range(0..cost.len())];
            player.ledger.credit(kind, 1);
            refunded.push(kind);
        }
    }

    Ok(refunded)
}

/// Raises the building at `place_id` by one level. Returns the new level.
pub fn upgrade(player: &mut Player, place_id: u32, turn: u32) -> Result<u8, RuleError> {
    let (building_type, level, turn_built) = match player.building_at(place_id) {
        Some(b) => (b.building_type, b.level, b.turn_built),
        None => return Err(RuleError::BuildingNotFound),
    };

    if turn_built == turn {
        return Err(RuleError::SameTurnUpgrade);
    }
    if level >= building_type.max_level() {
        return Err(RuleError::MaxLevel);
    }

    let cost = rules::level_cost(building_type, level + 1).ok_or(RuleError::MaxLevel)?;
    player.ledger.debit(cost)?;

    let building = player
        .building_at_mut(place_id)
        .ok_or(RuleError::BuildingNotFound)?;
    building.level += 1;
    building.turn_built = turn;
    Ok(building.level)
}

/// Harvests every producer in place-id order. Returns the totals per kind.
pub fn produce(player: &mut Player) -> ResourceTally {
    let mut produced = ResourceTally::new();

    for index in player.building_order() {
        let building = &player.buildings[index];
        let Some(kind) = rules::producer_output(building.building_type) else {
            continue;
        };
        let amount = rules::level_rate(building.building_type, building.level);

        player.ledger.credit(kind, amount);
        *produced.entry(kind).or_insert(0) += amount;
    }

    produced
}

/// Runs every processor in place-id order. Returns the outputs per kind.
///
/// Each building attempts up to its level rate of conversions and stops at the
/// first one it cannot afford. Earlier buildings get first claim on inputs.
pub fn process(player: &mut Player) -> ResourceTally {
    let mut made = ResourceTally::new();

    for index in player.building_order() {
        let building = &player.buildings[index];
        let Some((inputs, output)) = rules::processor_recipe(building.building_type) else {
            continue;
        };
        let attempts = rules::level_rate(building.building_type, building.level);
        let place_id = building.place_id;

        for _ in 0..attempts {
            if player.ledger.debit(inputs).is_err() {
                debug!("Processor at place {} of {} ran dry", place_id, player.nickname);
                break;
            }
            player.ledger.credit(output, 1);
            *made.entry(output).or_insert(0) += 1;
        }
    }

    made
}

/// Trains `count` soldiers against the per-turn barracks quota.
pub fn make_soldiers(player: &mut Player, count: u32) -> Result<(), RuleError> {
    if count == 0 {
        return Err(RuleError::InvalidCount);
    }

    let remaining = player.remaining_soldier_quota();
    if remaining == 0 {
        return Err(RuleError::SoldierLimitReached);
    }
    if count > remaining {
        return Err(RuleError::SoldierQuotaExceeded { remaining });
    }

    let cost = scaled_bundle(rules::soldier_cost(player.archetype()), count)
        .ok_or(RuleError::InsufficientResources)?;
    player.ledger.debit(&cost)?;

    player.soldiers = player.soldiers.saturating_add(count);
    player.soldiers_made_this_turn += count;
    Ok(())
}

/// Multiplies each amount in `bundle` by `times`. `None` on overflow.
fn scaled_bundle(bundle: rules::Bundle, times: u32) -> Option<Vec<(ResourceKind, u32)>> {
    bundle
        .iter()
        .map(|&(kind, amount)| amount.checked_mul(times).map(|total| (kind, total)))
        .collect()
}
