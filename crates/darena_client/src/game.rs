//! The client update loop.
//!
//! [`Game`] owns the match, the connection session and the turn being
//! recorded. The embedding UI feeds it input and frame time and reads
//! [`FrameView`] back to draw.

use darena_core::avatar::ShotState;
use darena_core::layout::FIXED_TIMESTEP;
use darena_core::match_state::{MatchState, PlayerId, Role};
use darena_core::projectile::ImpactOutcome;
use darena_core::protocol::ServerTerrainResponse;
use darena_core::turn_log::TurnLog;
use tokio::runtime::Handle;

use crate::input::{InputEvent, InputState};
use crate::replay::{ReplayPoll, ReplaySession};
use crate::session::{ConnectionSession, NetOutcome};
use crate::state::{transition, ClientEvent, ClientState};

/// Most fixed ticks run by one [`Game::update`]; older time is dropped.
pub const MAX_TICKS_PER_UPDATE: u32 = 8;

/// What a renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Current state.
    pub state: ClientState,
    /// Status line for the state.
    pub status: &'static str,
    /// The match, once the islands arrived.
    pub match_state: Option<&'a MatchState>,
}

/// One client.
#[derive(Debug)]
pub struct Game {
    state: ClientState,
    session: ConnectionSession,
    player_name: String,
    server_addr: String,
    match_state: Option<MatchState>,
    input: InputState,
    turn_log: Option<TurnLog>,
    unsent_turn: Option<TurnLog>,
    replay: Option<ReplaySession>,
    accumulator: f32,
}

impl Game {
    /// Create a client that runs its network tasks on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            state: ClientState::Initial,
            session: ConnectionSession::new(runtime),
            player_name: String::new(),
            server_addr: String::new(),
            match_state: None,
            input: InputState::default(),
            turn_log: None,
            unsent_turn: None,
            replay: None,
            accumulator: 0.0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Seat assigned by the server.
    #[must_use]
    pub const fn player_id(&self) -> Option<PlayerId> {
        self.session.player_id()
    }

    /// The match, once the islands arrived.
    #[must_use]
    pub const fn match_state(&self) -> Option<&MatchState> {
        self.match_state.as_ref()
    }

    /// Whether a finished turn is still on its way to the server.
    ///
    /// A client that just fell off sends its turn after reaching
    /// [`ClientState::Lost`]; keep ticking until this clears so the
    /// opponent sees the fall too.
    #[must_use]
    pub const fn is_sending(&self) -> bool {
        self.session.is_sending()
    }

    /// Everything a renderer needs.
    #[must_use]
    pub fn frame_view(&self) -> FrameView<'_> {
        FrameView {
            state: self.state,
            status: self.state.status_text(),
            match_state: self.match_state.as_ref(),
        }
    }

    /// Connect to `server_addr` as `player_name`.
    ///
    /// Ignored unless the client is still in [`ClientState::Initial`].
    pub fn request_connect(&mut self, player_name: &str, server_addr: &str) {
        if self.state != ClientState::Initial {
            tracing::warn!(state = %self.state, "connect requested twice");
            return;
        }
        self.player_name = player_name.to_string();
        self.server_addr = server_addr.to_string();
        self.fire_event(ClientEvent::ConnectRequested);
        self.session.start_connect(&self.server_addr, &self.player_name);
    }

    /// Route one input event.
    pub fn handle_input(&mut self, event: InputEvent) {
        self.input.apply(event);
    }

    /// Advance by `frame_dt` seconds of wall time.
    ///
    /// Runs as many fixed ticks as the accumulated time allows.
    pub fn update(&mut self, frame_dt: f32) {
        self.accumulator += frame_dt;

        let mut ticks = 0;
        while self.accumulator >= FIXED_TIMESTEP {
            if ticks == MAX_TICKS_PER_UPDATE {
                tracing::debug!(behind = self.accumulator, "dropping simulation backlog");
                self.accumulator = 0.0;
                break;
            }
            self.tick(FIXED_TIMESTEP);
            self.accumulator -= FIXED_TIMESTEP;
            ticks += 1;
        }
    }

    /// Run exactly one fixed tick.
    pub fn tick(&mut self, dt: f32) {
        if let Some(outcome) = self.session.poll() {
            self.on_network(outcome);
        }

        match self.state {
            ClientState::Initial | ClientState::WaitingForTerrain => {}
            ClientState::Connecting => {
                if !self.session.is_busy() {
                    self.session.start_connect(&self.server_addr, &self.player_name);
                }
            }
            ClientState::Connected => self.start_match(),
            ClientState::PlayTurn => self.play_turn(dt),
            ClientState::ShootProjectile => self.shoot_projectile(dt),
            ClientState::WaitTurn => self.wait_turn(dt),
            ClientState::SimulateOpponentTurn => self.simulate_opponent(dt),
            ClientState::Won | ClientState::Lost => self.settle_avatars(dt),
        }
        if self.state.is_live() {
            self.check_falls();
        }

        if let Some(state) = self.match_state.as_mut() {
            state.advance_tick();
        }
    }

    fn fire_event(&mut self, event: ClientEvent) {
        let next = transition(self.state, event);
        if next != self.state {
            tracing::info!(from = %self.state, to = %next, "client state");
        }
        self.state = next;
    }

    fn on_network(&mut self, outcome: NetOutcome) {
        match outcome {
            NetOutcome::Connected(id) => {
                tracing::info!(client_id = id.get(), "connected, waiting for opponent");
                self.fire_event(ClientEvent::ConnectAcknowledged);
                self.session.start_await_terrain();
            }
            NetOutcome::ConnectFailed(err) => {
                tracing::warn!(addr = %self.server_addr, error = %err, "connect failed, retrying");
            }
            NetOutcome::Terrain(response) => self.on_terrain(response),
            NetOutcome::TurnSent => {
                tracing::debug!("turn sent");
                if self.state == ClientState::WaitTurn {
                    self.session.start_await_turn();
                }
            }
            NetOutcome::TurnReceived(log) => self.on_opponent_turn(log),
            NetOutcome::Disconnected(err) => {
                tracing::error!(state = %self.state, error = %err, "lost connection to server");
            }
        }
    }

    fn on_terrain(&mut self, response: ServerTerrainResponse) {
        let Some(id) = self.session.player_id() else {
            tracing::warn!("terrain arrived before the seat");
            return;
        };
        if response.client_id != id.get() {
            tracing::warn!(
                client_id = id.get(),
                addressed_to = response.client_id,
                "terrain addressed to another seat"
            );
        }

        match MatchState::from_heightmaps(id, response.heightmaps) {
            Ok(state) => {
                tracing::info!(client_id = id.get(), side = ?id.side(), "islands received");
                self.match_state = Some(state);
                self.fire_event(ClientEvent::TerrainReceived);
            }
            Err(err) => {
                tracing::error!(error = %err, "unusable terrain");
                self.session.start_await_terrain();
            }
        }
    }

    fn start_match(&mut self) {
        let Some(id) = self.session.player_id() else {
            return;
        };
        self.fire_event(ClientEvent::MatchStarted {
            moves_first: id.moves_first(),
        });
        match self.state {
            ClientState::PlayTurn => self.begin_turn(),
            ClientState::WaitTurn => {
                self.session.start_await_turn();
            }
            _ => {}
        }
    }

    fn begin_turn(&mut self) {
        let (Some(state), Some(id)) = (self.match_state.as_mut(), self.session.player_id()) else {
            return;
        };
        state.player.begin_turn();
        self.input.clear();
        self.turn_log = Some(TurnLog::new(id.get()));
        tracing::debug!(tick = state.tick(), "turn started");
    }

    fn play_turn(&mut self, dt: f32) {
        let Some(state) = self.match_state.as_mut() else {
            return;
        };

        if self.input.take_shoot() {
            state.player.press_shoot();
        }

        let movement = self.input.movement();
        let aim = self.input.aim();
        if state.player.records_intents() {
            if let Some(log) = self.turn_log.as_mut() {
                log.record_tick(movement, aim);
            }
        }

        state.step_avatar(Role::Player, movement, aim, dt);
        state.step_avatar(Role::Enemy, 0, 0, dt);
        state.player.charge(dt);

        if state.player.shot_state == ShotState::Shoot {
            if let Err(err) = state.fire(Role::Player) {
                tracing::warn!(error = %err, "could not fire");
                return;
            }
            self.unsent_turn = self.finish_turn();
            self.fire_event(ClientEvent::ShotFired);
        }
    }

    /// Close the recorded turn with the avatar's current shot and position.
    fn finish_turn(&mut self) -> Option<TurnLog> {
        let state = self.match_state.as_ref()?;
        let mut log = self.turn_log.take()?;
        log.finalize(
            state.player.shot_angle,
            state.player.shot_power,
            state.player.position,
        );
        log.trim();
        tracing::debug!(
            movements = log.movements.len(),
            aim_deltas = log.aim_deltas.len(),
            angle = log.final_shot_angle,
            power = log.final_shot_power,
            "turn finished"
        );
        Some(log)
    }

    fn shoot_projectile(&mut self, dt: f32) {
        let Some(state) = self.match_state.as_mut() else {
            return;
        };
        state.step_avatar(Role::Player, 0, 0, dt);
        state.step_avatar(Role::Enemy, 0, 0, dt);

        let Some(outcome) = state.step_projectile(dt) else {
            if state.projectile.is_none() {
                tracing::warn!("no projectile in flight");
                self.fire_event(ClientEvent::ShotMissed);
            }
            return;
        };

        if let Some(log) = self.unsent_turn.take() {
            self.session.start_send_turn(log);
        }
        match outcome {
            ImpactOutcome::AvatarHit { target: Role::Enemy } => {
                self.fire_event(ClientEvent::EnemyHit);
            }
            outcome => {
                tracing::debug!(?outcome, "shot missed");
                self.fire_event(ClientEvent::ShotMissed);
            }
        }
    }

    fn wait_turn(&mut self, dt: f32) {
        self.settle_avatars(dt);
        if !self.session.is_busy() {
            self.session.start_await_turn();
        }
    }

    fn on_opponent_turn(&mut self, log: TurnLog) {
        let Some(id) = self.session.player_id() else {
            return;
        };
        if log.owner_id != id.other().get() {
            tracing::warn!(owner_id = log.owner_id, "turn from the wrong owner, ignoring");
            self.session.start_await_turn();
            return;
        }
        if self.state != ClientState::WaitTurn {
            tracing::warn!(state = %self.state, "opponent turn arrived out of order");
            return;
        }

        match ReplaySession::start(log) {
            Ok(replay) => {
                if let Some(state) = self.match_state.as_mut() {
                    state.enemy.begin_turn();
                }
                self.replay = Some(replay);
                self.fire_event(ClientEvent::OpponentTurnReceived);
            }
            Err(err) => tracing::error!(error = %err, "could not start the replay"),
        }
    }

    fn simulate_opponent(&mut self, dt: f32) {
        let Some(state) = self.match_state.as_mut() else {
            return;
        };
        state.step_avatar(Role::Player, 0, 0, dt);

        if state.projectile.is_some() {
            state.step_avatar(Role::Enemy, 0, 0, dt);
            if let Some(outcome) = state.step_projectile(dt) {
                self.replay = None;
                if outcome == (ImpactOutcome::AvatarHit { target: Role::Player }) {
                    self.fire_event(ClientEvent::PlayerHit);
                } else {
                    self.fire_event(ClientEvent::OpponentTurnEnded);
                    self.begin_turn();
                }
            }
            return;
        }

        // No step is taken while the enemy falls, matching how it was recorded
        if state.enemy.falling {
            state.step_avatar(Role::Enemy, 0, 0, dt);
            return;
        }

        let step = self
            .replay
            .as_mut()
            .map_or(ReplayPoll::Finished, ReplaySession::poll_step);
        match step {
            ReplayPoll::Ready(step) => {
                if let Err(err) = state.apply_replay_step(Role::Enemy, step, dt) {
                    tracing::warn!(error = %err, "replay step rejected");
                }
            }
            // The enemy holds still until the next step is handed over
            ReplayPoll::Pending => {}
            ReplayPoll::Finished => {
                // Nothing left to replay and nothing in flight
                self.replay = None;
                self.fire_event(ClientEvent::OpponentTurnEnded);
                self.begin_turn();
            }
        }
    }

    /// End the match once either avatar has dropped below the playfield.
    ///
    /// A recorded turn that has not gone out yet is sent first, so the
    /// opponent replays the same fall. A shot replayed from below the
    /// playfield ends here too: the opponent fell before firing.
    fn check_falls(&mut self) {
        let Some(state) = self.match_state.as_ref() else {
            return;
        };

        let event = if state.player.fell_off() {
            tracing::info!(tick = state.tick(), state = %self.state, "fell off the island");
            ClientEvent::PlayerFellOff
        } else if state.enemy.fell_off() {
            tracing::info!(tick = state.tick(), state = %self.state, "opponent fell off the island");
            ClientEvent::EnemyFellOff
        } else {
            return;
        };

        let unsent = match self.state {
            ClientState::PlayTurn => self.finish_turn(),
            _ => self.unsent_turn.take(),
        };
        if let Some(log) = unsent {
            self.session.start_send_turn(log);
        }

        if let Some(state) = self.match_state.as_mut() {
            state.projectile = None;
        }
        self.replay = None;
        self.fire_event(event);
    }

    fn settle_avatars(&mut self, dt: f32) {
        if let Some(state) = self.match_state.as_mut() {
            state.step_avatar(Role::Player, 0, 0, dt);
            state.step_avatar(Role::Enemy, 0, 0, dt);
        }
    }
}
