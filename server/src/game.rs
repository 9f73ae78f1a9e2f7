//! Authoritative session state and the turn scheduler.
//!
//! [`GameSession`] is owned by exactly one task. Every request, disconnect and
//! operator command is applied to it one at a time, and each call returns the
//! packets it produced as `(connection, packet)` deliveries for the network
//! layer to write out.

use crate::combat;
use crate::config::ServerConfig;
use crate::economy;
use crate::error::RuleError;
use crate::player::ConnectionId;
use crate::registry::PlayerRegistry;
use crate::scoring;
use log::{debug, info, warn};
use plantation_shared::{
    Archetype, AttackRequest, BuildRequest, JoinRequest, MakeSoldiersRequest, Packet, PlayerId,
    PlayerLeft, ProductionResult, ProtocolError, StartGame, StartTurn, TurnEnded, UpgradeRequest,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Lifecycle of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    ArchetypeSelection,
    TurnActive,
    Ended,
}

/// One packet addressed to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub connection: ConnectionId,
    pub packet: Packet,
}

/// Deliveries collected while handling a single event.
#[derive(Debug, Default)]
struct Outbox {
    deliveries: Vec<Outgoing>,
}

impl Outbox {
    fn send(&mut self, connection: ConnectionId, packet: Packet) {
        self.deliveries.push(Outgoing { connection, packet });
    }

    fn respond(&mut self, connection: ConnectionId, success: bool, message: impl Into<String>) {
        self.send(connection, Packet::response(success, message));
    }

    fn reject(&mut self, connection: ConnectionId, error: &RuleError) {
        self.respond(connection, false, error.to_string());
    }

    /// Sends `packet` to every player on the roster as it stands now.
    fn broadcast(&mut self, registry: &PlayerRegistry, packet: Packet) {
        for (_, connection) in registry.addresses() {
            self.send(connection, packet.clone());
        }
    }
}

pub struct GameSession {
    config: ServerConfig,
    registry: PlayerRegistry,
    phase: GamePhase,
    cycle: u32,
    /// Monotonic across the whole game; stamps construction and upgrades.
    global_turn: u32,
    turn_order: Vec<PlayerId>,
    turn_index: usize,
    rng: StdRng,
}

impl GameSession {
    pub fn new(config: &ServerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &ServerConfig, rng: StdRng) -> Self {
        Self {
            config: config.clone(),
            registry: PlayerRegistry::new(config.starting_soldiers),
            phase: GamePhase::Lobby,
            cycle: 0,
            global_turn: 0,
            turn_order: Vec::new(),
            turn_index: 0,
            rng,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn global_turn(&self) -> u32 {
        self.global_turn
    }

    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    /// The acting player while turns are running.
    pub fn current_player(&self) -> Option<PlayerId> {
        match self.phase {
            GamePhase::TurnActive => self.turn_order.get(self.turn_index).copied(),
            _ => None,
        }
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PlayerRegistry {
        &mut self.registry
    }

    /// Applies one decoded packet received on `connection`.
    pub fn handle_packet(&mut self, connection: ConnectionId, packet: Packet) -> Vec<Outgoing> {
        let mut out = Outbox::default();
        let kind = packet.kind();

        let result = if self.phase == GamePhase::Ended && kind.is_client_request() {
            Err(RuleError::GameOver)
        } else {
            match packet {
                Packet::Join(request) => self.join(connection, request, &mut out),
                request if kind.is_client_request() => {
                    match self.registry.find_by_connection(connection) {
                        Some(player_id) => self.dispatch(player_id, connection, request, &mut out),
                        None => Err(RuleError::NotJoined),
                    }
                }
                _ => {
                    warn!("Connection {} sent server-only packet {}", connection, kind);
                    Err(RuleError::MalformedRequest)
                }
            }
        };

        if let Err(error) = result {
            info!("Rejected {} from connection {}: {}", kind, connection, error);
            out.reject(connection, &error);
        }

        out.deliveries
    }

    /// Answers a frame that could not be decoded into a request.
    pub fn handle_malformed(&mut self, connection: ConnectionId, error: &ProtocolError) -> Vec<Outgoing> {
        warn!("Malformed request from connection {}: {}", connection, error);
        let mut out = Outbox::default();
        out.reject(connection, &RuleError::MalformedRequest);
        out.deliveries
    }

    /// Removes every player that joined through `connection`.
    pub fn handle_disconnect(&mut self, connection: ConnectionId) -> Vec<Outgoing> {
        let mut out = Outbox::default();
        for player_id in self.registry.players_on_connection(connection) {
            self.remove_player(player_id, &mut out);
        }
        out.deliveries
    }

    /// Operator start. A no-op unless the lobby holds enough players.
    pub fn force_start(&mut self) -> Vec<Outgoing> {
        let mut out = Outbox::default();
        if self.phase != GamePhase::Lobby {
            info!("Start ignored: session already started");
        } else if self.registry.len() < self.config.min_players {
            warn!(
                "Start ignored: {} player(s) joined, at least {} needed",
                self.registry.len(),
                self.config.min_players
            );
        } else {
            self.start_session(&mut out);
        }
        out.deliveries
    }

    fn join(
        &mut self,
        connection: ConnectionId,
        request: JoinRequest,
        out: &mut Outbox,
    ) -> Result<(), RuleError> {
        if self.phase != GamePhase::Lobby {
            return Err(RuleError::GameAlreadyStarted);
        }

        self.registry
            .join(connection, &request.nickname, &request.contact);
        out.respond(connection, true, "Подключено");

        let joined = self.registry.len();
        if joined >= self.config.auto_start_players {
            self.start_session(out);
        } else if joined >= self.config.min_players {
            info!(
                "Waiting for players ({}/{}); enter 'start' to begin with {}",
                joined, self.config.auto_start_players, joined
            );
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        packet: Packet,
        out: &mut Outbox,
    ) -> Result<(), RuleError> {
        match packet {
            Packet::Archetype(request) => self.choose_archetype(player_id, request.archetype, out),
            Packet::Build(request) => self.build(player_id, connection, request, out),
            Packet::Upgrade(request) => self.upgrade(player_id, connection, request, out),
            Packet::MakeSoldiers(request) => self.make_soldiers(player_id, connection, request, out),
            Packet::Attack(request) => self.attack(player_id, connection, request, out),
            Packet::EndTurn(_) => {
                self.require_turn(player_id)?;
                self.turn_index += 1;
                self.advance_from(player_id, out);
                Ok(())
            }
            _ => Err(RuleError::MalformedRequest),
        }
    }

    fn choose_archetype(
        &mut self,
        player_id: PlayerId,
        archetype: Archetype,
        out: &mut Outbox,
    ) -> Result<(), RuleError> {
        if self.phase == GamePhase::Lobby {
            return Err(RuleError::GameNotStarted);
        }
        let player = self.registry.get_mut(player_id).ok_or(RuleError::NotJoined)?;
        player.choose_archetype(archetype)?;
        info!("Player {} chose archetype {:?}", player.nickname, archetype);

        if self.phase == GamePhase::ArchetypeSelection && self.registry.all_chose_archetype() {
            self.start_first_cycle(out);
        }
        Ok(())
    }

    fn build(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        request: BuildRequest,
        out: &mut Outbox,
    ) -> Result<(), RuleError> {
        self.require_turn(player_id)?;
        let player = self.registry.get_mut(player_id).ok_or(RuleError::NotJoined)?;

        let refunded = economy::build(
            player,
            request.place_id,
            request.building_type,
            self.global_turn,
            &mut self.rng,
        )?;
        info!(
            "[{}] Built {} at place {}",
            player.nickname, request.building_type, request.place_id
        );
        if !refunded.is_empty() {
            info!("[{}] Engineer refund: {:?}", player.nickname, refunded);
        }

        out.respond(connection, true, "Построено");
        out.send(connection, Packet::State(player.snapshot()));
        Ok(())
    }

    fn upgrade(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        request: UpgradeRequest,
        out: &mut Outbox,
    ) -> Result<(), RuleError> {
        self.require_turn(player_id)?;
        let player = self.registry.get_mut(player_id).ok_or(RuleError::NotJoined)?;

        let level = economy::upgrade(player, request.place_id, self.global_turn)?;
        info!(
            "[{}] Upgraded place {} to level {}",
            player.nickname, request.place_id, level
        );

        out.respond(connection, true, "Улучшено");
        out.send(connection, Packet::State(player.snapshot()));
        Ok(())
    }

    fn make_soldiers(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        request: MakeSoldiersRequest,
        out: &mut Outbox,
    ) -> Result<(), RuleError> {
        self.require_turn(player_id)?;
        let player = self.registry.get_mut(player_id).ok_or(RuleError::NotJoined)?;

        economy::make_soldiers(player, request.count)?;
        info!(
            "[{}] Trained {} soldiers (total {}, this turn {}/{})",
            player.nickname,
            request.count,
            player.soldiers,
            player.soldiers_made_this_turn,
            player.soldier_capacity()
        );

        out.respond(connection, true, "Солдаты созданы");
        out.send(connection, Packet::State(player.snapshot()));
        Ok(())
    }

    fn attack(
        &mut self,
        player_id: PlayerId,
        connection: ConnectionId,
        request: AttackRequest,
        out: &mut Outbox,
    ) -> Result<(), RuleError> {
        self.require_active()?;
        if self.cycle <= self.config.peace_cycles {
            return Err(RuleError::AttacksDisabled {
                peace_cycles: self.config.peace_cycles,
            });
        }
        self.require_turn(player_id)?;

        let (attacker, target) = self
            .registry
            .pair_mut(player_id, request.target_player_id)
            .ok_or(RuleError::InvalidTarget)?;
        let report = combat::resolve_attack(attacker, target, request.soldiers, &mut self.rng)?;

        out.send(
            connection,
            Packet::AttackTarget(report.to_attacker(target.id)),
        );
        out.send(
            target.connection,
            Packet::AttackReceived(report.to_target(attacker)),
        );
        out.respond(connection, true, "Атака выполнена");
        out.send(connection, Packet::State(attacker.snapshot()));
        out.send(target.connection, Packet::State(target.snapshot()));
        Ok(())
    }

    /// Fails unless turns are running.
    fn require_active(&self) -> Result<(), RuleError> {
        match self.phase {
            GamePhase::TurnActive => Ok(()),
            GamePhase::Ended => Err(RuleError::GameOver),
            GamePhase::Lobby | GamePhase::ArchetypeSelection => Err(RuleError::GameNotStarted),
        }
    }

    fn require_turn(&self, player_id: PlayerId) -> Result<(), RuleError> {
        self.require_active()?;
        if self.current_player() != Some(player_id) {
            return Err(RuleError::NotYourTurn);
        }
        Ok(())
    }

    fn start_session(&mut self, out: &mut Outbox) {
        self.phase = GamePhase::ArchetypeSelection;
        info!("Session starting with {} players", self.registry.len());

        let roster = self.registry.roster();
        let player_count = roster.len() as u32;
        for (player_id, connection) in self.registry.addresses() {
            out.send(
                connection,
                Packet::StartGame(StartGame {
                    player_id,
                    player_count,
                    roster: roster.clone(),
                }),
            );
        }
    }

    fn start_first_cycle(&mut self, out: &mut Outbox) {
        self.phase = GamePhase::TurnActive;
        self.cycle = 1;
        self.global_turn = 1;
        self.turn_index = 0;
        self.shuffle_turn_order();
        info!("=== Cycle 1 begins, order {:?} ===", self.turn_order);
        self.start_turn(out);
    }

    fn shuffle_turn_order(&mut self) {
        self.turn_order = self.registry.ids();
        self.turn_order.shuffle(&mut self.rng);
    }

    /// Turn-start effects for the acting player: counters reset, production,
    /// processing, then the notices.
    fn start_turn(&mut self, out: &mut Outbox) {
        let Some(player_id) = self.current_player() else {
            return;
        };
        let Some(player) = self.registry.get_mut(player_id) else {
            return;
        };

        player.begin_turn();
        let produced = economy::produce(player);
        let processed = economy::process(player);
        info!(
            "=== Turn of {} (cycle {}, turn {}) ===",
            player.nickname, self.cycle, self.global_turn
        );
        debug!("Produced {:?}, processed {:?}", produced, processed);

        let connection = player.connection;
        let snapshot = player.snapshot();

        out.send(
            connection,
            Packet::ProductionResult(ProductionResult {
                produced_by_kind: produced,
            }),
        );
        out.broadcast(
            &self.registry,
            Packet::StartTurn(StartTurn {
                cycle: self.cycle,
                turn: self.global_turn,
                player_id,
            }),
        );
        out.send(connection, Packet::State(snapshot));
    }

    /// Moves play on from `previous`. `turn_index` must already point at the
    /// next seat.
    fn advance_from(&mut self, previous: PlayerId, out: &mut Outbox) {
        self.global_turn += 1;

        if self.turn_index >= self.turn_order.len() {
            if self.cycle >= self.config.total_cycles {
                self.finish_game(out);
                return;
            }
            self.cycle += 1;
            self.turn_index = 0;
            self.shuffle_turn_order();
            info!("=== Cycle {} begins, order {:?} ===", self.cycle, self.turn_order);
        }

        let Some(&next) = self.turn_order.get(self.turn_index) else {
            self.finish_game(out);
            return;
        };

        out.broadcast(
            &self.registry,
            Packet::TurnEnded(TurnEnded {
                player_id: previous,
                next_player_id: next,
            }),
        );
        self.start_turn(out);
    }

    /// Scores whoever is left and ends the session.
    fn finish_game(&mut self, out: &mut Outbox) {
        self.phase = GamePhase::Ended;
        self.turn_order.clear();
        self.turn_index = 0;

        let end = scoring::final_standings(self.registry.iter());
        for score in &end.all_scores {
            info!("Player {}: {} points", score.nickname, score.points);
        }
        match end.winner_id.and_then(|id| self.registry.get(id)) {
            Some(winner) => info!(
                "Game over, winner {} with {} points",
                winner.nickname, end.winner_points
            ),
            None => info!("Game over, no players left"),
        }

        out.broadcast(&self.registry, Packet::GameEnd(end));
    }

    fn remove_player(&mut self, player_id: PlayerId, out: &mut Outbox) {
        let current = self.current_player();
        let Some(player) = self.registry.remove(player_id) else {
            return;
        };

        if let Some(position) = self.turn_order.iter().position(|&id| id == player_id) {
            self.turn_order.remove(position);
            if position < self.turn_index {
                self.turn_index -= 1;
            }
        }

        match self.phase {
            GamePhase::Ended => return,
            GamePhase::Lobby => {}
            GamePhase::ArchetypeSelection | GamePhase::TurnActive => {
                if self.registry.len() < self.config.min_players {
                    warn!("Not enough players to continue after {} left", player.nickname);
                    self.finish_game(out);
                    return;
                }
            }
        }

        out.broadcast(
            &self.registry,
            Packet::PlayerLeft(PlayerLeft {
                player_id,
                nickname: player.nickname.clone(),
                remaining_roster: self.registry.roster(),
            }),
        );

        match self.phase {
            GamePhase::ArchetypeSelection if self.registry.all_chose_archetype() => {
                self.start_first_cycle(out);
            }
            GamePhase::TurnActive if current == Some(player_id) => {
                info!("Turn of {} interrupted, passing play on", player.nickname);
                self.advance_from(player_id, out);
            }
            _ => {}
        }
    }
}
