//! Player roster management for the game server
//!
//! This module tracks every joined player and the connection that carries them:
//! - Identity allocation (strictly increasing ids, never reused)
//! - Join and removal, with removal being idempotent
//! - Lookup by player id or by transport connection
//! - Stable roster snapshots for broadcasting
//!
//! Players are kept in join order. Broadcasts and end-of-game scoring walk the
//! roster in that order, so ties resolve toward the earliest joiner.

use crate::player::{ConnectionId, Player};
use log::info;
use plantation_shared::{PlayerId, PlayerInfo};

const DEFAULT_NICKNAME: &str = "Player";

/// Owns every [`Player`] record for the running session.
#[derive(Debug)]
pub struct PlayerRegistry {
    /// Joined players in join order
    players: Vec<Player>,
    /// Next id handed out by [`PlayerRegistry::join`]
    next_player_id: PlayerId,
    /// Army size every new player starts with
    starting_soldiers: u32,
}

impl PlayerRegistry {
    /// Creates an empty roster. Ids start from 1.
    pub fn new(starting_soldiers: u32) -> Self {
        Self {
            players: Vec::new(),
            next_player_id: 1,
            starting_soldiers,
        }
    }

    /// Creates a player bound to `connection` and returns their fresh id.
    ///
    /// Every call allocates a new id, even for an identical request from the
    /// same connection. An empty nickname falls back to a default.
    pub fn join(&mut self, connection: ConnectionId, nickname: &str, contact: &str) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let nickname = match nickname.trim() {
            "" => DEFAULT_NICKNAME.to_string(),
            name => name.to_string(),
        };

        info!("Player {} joined (id={}, connection {})", nickname, id, connection);
        self.players.push(Player::new(
            id,
            nickname,
            contact.to_string(),
            connection,
            self.starting_soldiers,
        ));

        id
    }

    /// Removes a player. Returns the record if they were still present.
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(index);
        info!("Player {} (#{}) removed", player.nickname, player.id);
        Some(player)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Borrows two distinct players mutably at once.
    ///
    /// Returns `None` if the ids are equal or either player is missing.
    pub fn pair_mut(&mut self, first: PlayerId, second: PlayerId) -> Option<(&mut Player, &mut Player)> {
        if first == second {
            return None;
        }
        let i = self.players.iter().position(|p| p.id == first)?;
        let j = self.players.iter().position(|p| p.id == second)?;

        if i < j {
            let (left, right) = self.players.split_at_mut(j);
            Some((&mut left[i], &mut right[0]))
        } else {
            let (left, right) = self.players.split_at_mut(i);
            Some((&mut right[0], &mut left[j]))
        }
    }

    /// First player joined through `connection`, if any.
    pub fn find_by_connection(&self, connection: ConnectionId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.connection == connection)
            .map(|p| p.id)
    }

    /// Every player joined through `connection`, in join order.
    pub fn players_on_connection(&self, connection: ConnectionId) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.connection == connection)
            .map(|p| p.id)
            .collect()
    }

    /// Player ids in join order.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// Snapshot of `(player, connection)` pairs used to fan out broadcasts.
    pub fn addresses(&self) -> Vec<(PlayerId, ConnectionId)> {
        self.players.iter().map(|p| (p.id, p.connection)).collect()
    }

    pub fn roster(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(Player::info).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn all_chose_archetype(&self) -> bool {
        self.players.iter().all(Player::has_archetype)
    }

    /// Returns the number of joined players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if nobody has joined
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
