//! Immutable balance tables: costs, rates, recipes, defense and archetype
//! modifiers. Pure lookups, no state.

use plantation_shared::{Archetype, BuildingType as B, ResourceKind as R};

/// A resource bundle: each kind with the amount required.
pub type Bundle = &'static [(R, u32)];

pub const MIN_LEVEL: u8 = 1;

/// Cost to construct a building, equal to its level-1 cost.
pub fn build_cost(building: B) -> Bundle {
    level_cost(building, MIN_LEVEL).unwrap_or(&[])
}

/// Cost to bring `building` up to `level`. `None` past its maximum level.
pub fn level_cost(building: B, level: u8) -> Option<Bundle> {
    let cost: Bundle = match (level, building) {
        (1, B::Logging) => &[(R::Stone, 2)],
        (1, B::Quarry) => &[(R::Wood, 2)],
        (1, B::Mine) => &[(R::Wood, 2), (R::Stone, 1)],
        (1, B::Farm) => &[(R::Wood, 2)],
        (1, B::Sawmill) => &[(R::Wood, 2), (R::Stone, 1)],
        (1, B::Kiln) => &[(R::Stone, 2), (R::Wood, 1)],
        (1, B::Smelter) => &[(R::Stone, 2), (R::Ore, 2)],
        (1, B::Charcoal) => &[(R::Wood, 2)],
        (1, B::Crusher) => &[(R::Stone, 2)],
        (1, B::Bakery) => &[(R::Lumber, 2), (R::Stone, 1)],
        (1, B::Carpentry) => &[(R::Lumber, 3), (R::Bricks, 1)],
        (1, B::Masonry) => &[(R::Bricks, 2), (R::Stone, 2)],
        (1, B::Forge) => &[(R::Metal, 2), (R::Lumber, 2)],
        (1, B::Glassworks) => &[(R::Sand, 2), (R::Coal, 1), (R::Bricks, 1)],
        (1, B::Armory) => &[(R::Metal, 2), (R::Lumber, 2)],
        (1, B::Barracks) => &[(R::Lumber, 2), (R::Weapon, 1)],
        (1, B::Laboratory) => &[(R::Glass, 2), (R::Tools, 2), (R::Coal, 1)],
        (1, B::AlchemyFurnace) => &[(R::Metal, 2), (R::Coal, 2), (R::Tools, 2)],
        (1, B::Barricade) => &[(R::Lumber, 2), (R::Stone, 1)],
        (1, B::DefenseTower) => &[(R::Walls, 1), (R::Tools, 1), (R::Weapon, 1)],

        (2, B::Logging) => &[(R::Stone, 1), (R::Lumber, 1)],
        (2, B::Quarry) => &[(R::Wood, 1), (R::Bricks, 1)],
        (2, B::Mine) => &[(R::Bricks, 2)],
        (2, B::Farm) => &[(R::Wood, 1), (R::Lumber, 1)],
        (2, B::Sawmill) => &[(R::Lumber, 2)],
        (2, B::Kiln) => &[(R::Bricks, 2)],
        (2, B::Smelter) => &[(R::Metal, 1), (R::Bricks, 1)],
        (2, B::Charcoal) => &[(R::Lumber, 1), (R::Wood, 1)],
        (2, B::Crusher) => &[(R::Bricks, 1), (R::Stone, 1)],
        (2, B::Bakery) => &[(R::Bread, 1), (R::Lumber, 1)],
        (2, B::Carpentry) => &[(R::Furniture, 2)],
        (2, B::Masonry) => &[(R::Walls, 1), (R::Bricks, 1)],
        (2, B::Forge) => &[(R::Tools, 1), (R::Metal, 1)],
        (2, B::Glassworks) => &[(R::Glass, 1), (R::Sand, 1)],
        (2, B::Armory) => &[(R::Weapon, 1), (R::Metal, 1)],
        (2, B::Barracks) => &[(R::Walls, 1), (R::Bread, 1)],
        (2, B::Laboratory) => &[(R::Emerald, 1), (R::Glass, 1)],
        (2, B::AlchemyFurnace) => &[(R::Gold, 1), (R::Metal, 1)],
        (2, B::Barricade) => &[(R::Metal, 1)],
        (2, B::DefenseTower) => &[(R::Weapon, 3)],

        (3, B::Logging) => &[(R::Lumber, 2), (R::Bricks, 1)],
        (3, B::Quarry) => &[(R::Bricks, 2), (R::Lumber, 1)],
        (3, B::Mine) => &[(R::Walls, 1), (R::Tools, 1)],
        (3, B::Farm) => &[(R::Lumber, 2), (R::Bread, 1)],
        (3, B::Sawmill) => &[(R::Bricks, 1), (R::Lumber, 2)],
        (3, B::Kiln) => &[(R::Walls, 1), (R::Lumber, 1)],
        (3, B::Smelter) => &[(R::Metal, 2), (R::Walls, 1)],
        (3, B::Charcoal) => &[(R::Lumber, 2), (R::Coal, 1)],
        (3, B::Crusher) => &[(R::Bricks, 2), (R::Sand, 1)],
        (3, B::Bakery) => &[(R::Bread, 2), (R::Bricks, 1)],
        (3, B::Carpentry) => &[(R::Furniture, 1), (R::Walls, 1)],
        (3, B::Masonry) => &[(R::Walls, 2), (R::Tools, 1)],
        (3, B::Forge) => &[(R::Tools, 2), (R::Walls, 1)],
        (3, B::Glassworks) => &[(R::Glass, 2), (R::Tools, 1)],
        (3, B::Armory) => &[(R::Weapon, 2), (R::Tools, 1)],
        (3, B::Barracks) => &[(R::Weapon, 1), (R::Walls, 1), (R::Bread, 1)],
        (3, B::Laboratory) => &[(R::Emerald, 2), (R::Tools, 1)],
        (3, B::AlchemyFurnace) => &[(R::Gold, 2), (R::Tools, 1)],

        _ => return None,
    };
    Some(cost)
}

/// Per-turn rate of a building at `level`.
///
/// Producers: units harvested. Processors: conversion attempts.
/// Barracks: soldiers that may be trained. Zero for fortifications.
pub fn level_rate(building: B, level: u8) -> u32 {
    let tiers: [u32; 3] = match building {
        B::Logging | B::Quarry | B::Mine | B::Farm => [2, 3, 6],
        B::Sawmill | B::Kiln | B::Smelter | B::Charcoal | B::Crusher | B::Bakery => [1, 2, 4],
        B::Carpentry | B::Masonry | B::Forge | B::Glassworks | B::Armory => [1, 2, 3],
        B::Barracks => [1, 2, 3],
        B::Laboratory | B::AlchemyFurnace => [1, 1, 2],
        B::Barricade | B::DefenseTower => return 0,
    };
    match level {
        1..=3 => tiers[usize::from(level - 1)],
        _ => 0,
    }
}

pub fn producer_output(building: B) -> Option<R> {
    match building {
        B::Logging => Some(R::Wood),
        B::Quarry => Some(R::Stone),
        B::Mine => Some(R::Ore),
        B::Farm => Some(R::Wheat),
        _ => None,
    }
}

/// Input bundle and single output of a processor.
pub fn processor_recipe(building: B) -> Option<(Bundle, R)> {
    let recipe: (Bundle, R) = match building {
        B::Sawmill => (&[(R::Wood, 2)], R::Lumber),
        B::Kiln => (&[(R::Stone, 2)], R::Bricks),
        B::Smelter => (&[(R::Ore, 3)], R::Metal),
        B::Charcoal => (&[(R::Wood, 2)], R::Coal),
        B::Crusher => (&[(R::Stone, 2)], R::Sand),
        B::Bakery => (&[(R::Wheat, 2), (R::Wood, 1)], R::Bread),
        B::Carpentry => (&[(R::Lumber, 3)], R::Furniture),
        B::Masonry => (&[(R::Bricks, 2), (R::Stone, 1)], R::Walls),
        B::Forge => (&[(R::Metal, 2), (R::Wood, 1)], R::Tools),
        B::Glassworks => (&[(R::Sand, 2), (R::Coal, 1)], R::Glass),
        B::Armory => (&[(R::Metal, 2), (R::Lumber, 1)], R::Weapon),
        B::Laboratory => (&[(R::Glass, 2), (R::Coal, 1), (R::Tools, 1)], R::Emerald),
        B::AlchemyFurnace => (&[(R::Metal, 2), (R::Coal, 2), (R::Tools, 1)], R::Gold),
        _ => return None,
    };
    Some(recipe)
}

/// Defense percentage a building contributes before archetype scaling.
pub fn defense_value(building: B, level: u8) -> u32 {
    match (building, level) {
        (B::Barricade, 1) => 5,
        (B::Barricade, 2) => 10,
        (B::DefenseTower, 1) => 20,
        (B::DefenseTower, 2) => 30,
        _ => 0,
    }
}

/// Resources needed to train one soldier.
pub fn soldier_cost(archetype: Archetype) -> Bundle {
    match archetype {
        Archetype::Warrior => &[(R::Bread, 5), (R::Weapon, 2)],
        Archetype::Recruit => &[(R::Bread, 1), (R::Weapon, 1)],
        Archetype::Glutton => &[(R::Bread, 6), (R::Weapon, 1)],
        _ => &[(R::Bread, 3), (R::Weapon, 1)],
    }
}

/// Scaling of the owner's own fortifications, in percent.
pub fn owner_defense_percent(archetype: Archetype) -> u32 {
    match archetype {
        Archetype::Greedy => 130,
        Archetype::Patron => 75,
        _ => 100,
    }
}

/// Scaling an attacker applies to the defense they face, in percent.
pub fn attacker_defense_percent(archetype: Archetype) -> u32 {
    match archetype {
        Archetype::Warrior => 80,
        Archetype::Recruit => 120,
        _ => 100,
    }
}

/// Scaling of a resource's point value at game end, in percent.
pub fn score_percent(archetype: Archetype, resource: R) -> u32 {
    match archetype {
        Archetype::Greedy | Archetype::Engineer => 80,
        Archetype::Patron => 125,
        Archetype::Alchemist if resource.is_rare() => 125,
        Archetype::Alchemist => 70,
        _ => 100,
    }
}

pub fn steals_per_survivor(archetype: Archetype) -> u32 {
    match archetype {
        Archetype::Glutton => 2,
        _ => 1,
    }
}

pub fn refunds_on_build(archetype: Archetype) -> bool {
    archetype == Archetype::Engineer
}

/// Applies an integer percentage, truncating toward zero.
pub fn scale_percent(value: u32, percent: u32) -> u32 {
    (u64::from(value) * u64::from(percent) / 100) as u32
}
