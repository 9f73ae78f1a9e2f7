//! End-of-game points and winner selection.

use crate::player::Player;
use crate::rules::{self, scale_percent};
use plantation_shared::{Archetype, GameEnd, PlayerScore, ResourceKind};

/// Points one unit of `kind` is worth to a player of `archetype`. Never below 1.
pub fn points_per_unit(archetype: Archetype, kind: ResourceKind) -> u32 {
    scale_percent(kind.points(), rules::score_percent(archetype, kind)).max(1)
}

pub fn score(player: &Player) -> u32 {
    let archetype = player.archetype();
    let total: u64 = player
        .ledger
        .iter()
        .map(|(kind, amount)| u64::from(points_per_unit(archetype, kind)) * u64::from(amount))
        .sum();
    u32::try_from(total).unwrap_or(u32::MAX)
}

/// Scores every player in roster order and picks the first maximum.
///
/// Any non-empty roster has a winner, even when every score is 0, so the
/// last player standing after attrition is always named.
pub fn final_standings<'a>(players: impl IntoIterator<Item = &'a Player>) -> GameEnd {
    let all_scores: Vec<PlayerScore> = players
        .into_iter()
        .map(|player| PlayerScore {
            player_id: player.id,
            nickname: player.nickname.clone(),
            points: score(player),
        })
        .collect();

    let mut winner: Option<&PlayerScore> = None;
    for entry in &all_scores {
        if winner.map_or(true, |best| entry.points > best.points) {
            winner = Some(entry);
        }
    }

    GameEnd {
        winner_id: winner.map(|w| w.player_id),
        winner_points: winner.map_or(0, |w| w.points),
        all_scores,
    }
}
