use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::game::state::GameState;
use crate::game::tile::Tile;
use crate::net::message::{ClientMessage, PlayerSummary, ServerMessage};
use crate::net::transport::Transport;

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How often the background refresh sends a `peek`.
    pub refresh_interval: Duration,
    /// Empty margin re-established around the board after reconciliation.
    pub grid_padding: (i32, i32),
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            refresh_interval: Duration::from_secs(10),
            grid_padding: (2, 2),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `TILERUSH_REFRESH_SECS` and `TILERUSH_PAD`.
    pub fn from_env() -> Self {
        let mut config = SessionConfig::default();
        if let Ok(secs) = std::env::var("TILERUSH_REFRESH_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => config.refresh_interval = Duration::from_secs(secs),
                _ => warn!(value = %secs, "invalid TILERUSH_REFRESH_SECS ignored"),
            }
        }
        if let Ok(pad) = std::env::var("TILERUSH_PAD") {
            match pad.parse::<i32>() {
                Ok(pad) if pad >= 0 => config.grid_padding = (pad, pad),
                _ => warn!(value = %pad, "invalid TILERUSH_PAD ignored"),
            }
        }
        config
    }
}

/// One player's final position in the end-of-game results.
#[derive(Debug, Clone)]
pub struct PlayerResult {
    pub player: u64,
    pub state: GameState,
}

/// Everything a UI layer needs to react to, published over the session's
/// event channel in arrival order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The local state mutated under reconciliation.
    StateChanged,
    GameStart,
    Countdown { value: i64 },
    /// Another player drew, forcing a round for everyone.
    TilesDrawn { drawer: Option<u64> },
    GameOver { winner: Option<u64> },
    /// Running scoreboard: who is still playing and how many tiles each
    /// player holds.
    Synopsis {
        players: Vec<PlayerSummary>,
        remaining: Option<i64>,
    },
    /// Final snapshots for every player.
    Results {
        winner: Option<u64>,
        finished: bool,
        players: Vec<PlayerResult>,
    },
    WordsChecked { unwords: Vec<String> },
    Error { text: String },
    Notification { message_type: String, message: String },
}

/// Orchestrates one player's connection: optimistic local mutation plus
/// reconciliation of the server's authoritative pushes.
///
/// Two states, one-way: `uninitialized` until the first state-bearing
/// message, `started` after. While uninitialized a message with a non-zero
/// `reply_to` is skipped entirely and payloads only seed empty stores; while
/// started, `added.hand` is appended regardless of `reply_to`. The direct
/// reply path absorbs the same payloads, and duplicate-suppressing draw makes
/// the double application harmless.
pub struct GameSession {
    transport: Arc<Transport>,
    state: Mutex<GameState>,
    config: SessionConfig,
    started: AtomicBool,
    /// Next draw id to request. The server rejects ids below its own
    /// counter, so inbound ids raise this one.
    draw_counter: AtomicU64,
    /// Latest reported pool size; -1 until first seen.
    remaining: AtomicI64,
    events: mpsc::UnboundedSender<SessionEvent>,
    router: Mutex<Option<JoinHandle<()>>>,
}

impl GameSession {
    /// Announces the session with a `join` and starts routing inbound
    /// notifications. Returns the session and its event stream.
    pub fn new(
        transport: Transport,
        config: SessionConfig,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>), EngineError> {
        let transport = Arc::new(transport);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = Arc::new(GameSession {
            transport: transport.clone(),
            state: Mutex::new(GameState::new()),
            config,
            started: AtomicBool::new(false),
            draw_counter: AtomicU64::new(1),
            remaining: AtomicI64::new(-1),
            events: events_tx,
            router: Mutex::new(None),
        });

        session.transport.send(ClientMessage::Join)?;

        let weak = Arc::downgrade(&session);
        let mut inbox = transport.on_message("");
        let router = tokio::spawn(async move {
            while let Some(msg) = inbox.recv().await {
                let Some(session) = weak.upgrade() else { break };
                session.handle_message(msg);
            }
        });
        *session.router.lock().unwrap() = Some(router);

        Ok((session, events_rx))
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    /// Tiles left in the shared pool, once the server has reported it.
    pub fn remaining(&self) -> Option<i64> {
        match self.remaining.load(Ordering::Relaxed) {
            -1 => None,
            n => Some(n),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn handle_message(&self, msg: ServerMessage) {
        match msg.message_type.as_str() {
            "state" => self.reconcile(&msg),
            "error" => self.emit(SessionEvent::Error {
                text: msg.error_text(),
            }),
            "gamestart" => {
                info!("game started");
                self.emit(SessionEvent::GameStart);
            }
            "countdown" => {
                if let Some(value) = msg.value {
                    // The server expects the countdown value echoed back.
                    if self.transport.send(ClientMessage::Countback { value }).is_err() {
                        warn!("countback after channel close dropped");
                    }
                    self.emit(SessionEvent::Countdown { value });
                }
            }
            "draw" => self.emit(SessionEvent::TilesDrawn { drawer: msg.drawer }),
            "gameover" => {
                info!(winner = ?msg.winner, "game over");
                self.emit(SessionEvent::GameOver { winner: msg.winner });
            }
            "checked" => {
                // Direct replies are applied by the waiting check() call.
                if msg.reply_to == 0 {
                    let unwords = msg.unwords.clone().unwrap_or_default();
                    self.state.lock().unwrap().check(&unwords);
                    self.emit(SessionEvent::WordsChecked { unwords });
                }
            }
            "synopsis" => self.handle_synopsis(&msg),
            "gamestate" | "game-state" => self.handle_results(&msg),
            other => {
                if let Some(message) = &msg.message {
                    self.emit(SessionEvent::Notification {
                        message_type: other.to_string(),
                        message: message.clone(),
                    });
                }
            }
        }
    }

    /// Merges one authoritative `state` message into the local stores.
    fn reconcile(&self, msg: &ServerMessage) {
        if let Some(draw_id) = msg.draw_id {
            self.observe_draw_id(draw_id);
        }
        if let Some(remaining) = msg.remaining {
            self.remaining.store(remaining, Ordering::Relaxed);
        }
        if let Some(error) = &msg.error {
            self.emit(SessionEvent::Error { text: error.clone() });
        }

        if !self.started() {
            // Stale direct replies can outrun the first push; a reply to a
            // request we never completed setup for is skipped outright.
            if msg.reply_to != 0 {
                debug!(reply_to = msg.reply_to, "reply before initialization skipped");
                return;
            }
            let mut state = self.state.lock().unwrap();
            if let Some(hand) = &msg.hand {
                if state.bank.is_empty() {
                    state.draw(hand.iter().cloned());
                } else {
                    debug!("seed skipped, hand already populated");
                }
            }
            if let Some(board) = &msg.board {
                if state.grid.is_empty() {
                    state.grid = crate::game::grid::Grid::from_wire(board);
                    state.grid.padding(self.config.grid_padding);
                } else {
                    debug!("seed skipped, board already populated");
                }
            }
            if msg.hand.is_some() || msg.board.is_some() {
                self.started.store(true, Ordering::Relaxed);
                info!("session initialized");
            }
        } else {
            let mut state = self.state.lock().unwrap();
            if let Some(added) = &msg.added {
                if let Some(hand) = &added.hand {
                    state.draw(hand.iter().cloned());
                }
                if let Some(board) = &added.board {
                    for tile in &board.tiles {
                        let Some(pos) = board.positions.get(&tile.id) else { continue };
                        if state.position_of(tile.id).is_some() {
                            continue;
                        }
                        let (row, col) = state.grid.storage(*pos);
                        if state.grid.get(row, col).is_none() {
                            state.grid.set(row, col, tile.clone());
                        }
                    }
                }
            }
            if let Some(unwords) = &msg.unwords {
                state.check(unwords);
            }
        }

        self.emit(SessionEvent::StateChanged);
    }

    /// Applies a direct reply's payload; returns any tiles it delivered.
    fn absorb_reply(&self, reply: &ServerMessage) -> Vec<Tile> {
        if let Some(draw_id) = reply.draw_id {
            self.observe_draw_id(draw_id);
        }
        if let Some(remaining) = reply.remaining {
            self.remaining.store(remaining, Ordering::Relaxed);
        }

        let mut state = self.state.lock().unwrap();
        let mut delivered = Vec::new();
        if let Some(added) = &reply.added {
            if let Some(hand) = &added.hand {
                delivered = state.draw(hand.iter().cloned());
            }
        }
        if let Some(unwords) = &reply.unwords {
            state.check(unwords);
        }
        drop(state);

        if !delivered.is_empty() {
            self.emit(SessionEvent::StateChanged);
        }
        delivered
    }

    /// Raises the draw counter to at least the server's view of it.
    fn observe_draw_id(&self, draw_id: u64) {
        self.draw_counter.fetch_max(draw_id, Ordering::Relaxed);
    }

    /// Requests the next tile batch. Each request consumes one draw id,
    /// strictly increasing across the session even after a counter observed
    /// from the server.
    pub async fn draw(&self) -> Result<Vec<Tile>, EngineError> {
        let draw_id = self.draw_counter.fetch_add(1, Ordering::Relaxed);
        let reply = self
            .transport
            .send_and_wait(ClientMessage::Draw { draw_id })
            .await?;
        Ok(self.absorb_reply(&reply))
    }

    /// Discards a tile; the replacement rides on the server's reply.
    pub async fn discard(&self, tile_id: i64) -> Result<Vec<Tile>, EngineError> {
        self.state.lock().unwrap().discard(tile_id);
        let reply = self
            .transport
            .send_and_wait(ClientMessage::Discard { tile_id })
            .await?;
        Ok(self.absorb_reply(&reply))
    }

    /// Asks the server to validate the board; invalid words come back and
    /// are re-anchored onto the grid for highlighting.
    pub async fn check(&self) -> Result<Vec<String>, EngineError> {
        let reply = self.transport.send_and_wait(ClientMessage::Check).await?;
        let unwords = reply.unwords.clone().unwrap_or_default();
        self.state.lock().unwrap().check(&unwords);
        self.emit(SessionEvent::WordsChecked {
            unwords: unwords.clone(),
        });
        Ok(unwords)
    }

    /// Moves a grid tile back to the hand, locally and on the server.
    pub fn recall(&self, tile_id: i64) -> Result<(), EngineError> {
        self.state.lock().unwrap().recall(tile_id);
        self.transport.send(ClientMessage::Recall { tile_id })?;
        Ok(())
    }

    /// Exchanges two tiles wherever they currently sit.
    pub fn swap(&self, first_id: i64, second_id: i64) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock().unwrap();
            match (state.position_of(first_id), state.position_of(second_id)) {
                (Some(first), Some(second)) => state.swap(first, second),
                _ => debug!(first_id, second_id, "swap with an unknown tile skipped locally"),
            }
        }
        self.transport.send(ClientMessage::Swap { first_id, second_id })?;
        Ok(())
    }

    /// Repositions a grid tile. `row`/`col` are local storage coordinates;
    /// the wire carries drift-compensated logical coordinates.
    pub fn move_tile(&self, tile_id: i64, row: i32, col: i32) -> Result<(), EngineError> {
        let pos = {
            let mut state = self.state.lock().unwrap();
            state.move_tile(tile_id, row, col);
            state.grid.logical(row, col)
        };
        self.transport.send(ClientMessage::Move {
            tile_id,
            x: pos.x,
            y: pos.y,
        })?;
        Ok(())
    }

    /// Places a hand tile onto the grid.
    pub fn play(&self, tile_id: i64, row: i32, col: i32) -> Result<(), EngineError> {
        let pos = {
            let mut state = self.state.lock().unwrap();
            state.play(tile_id, row, col);
            state.grid.logical(row, col)
        };
        self.transport.send(ClientMessage::Play {
            tile_id,
            x: pos.x,
            y: pos.y,
        })?;
        Ok(())
    }

    pub fn mark_ready(&self, ready: bool) -> Result<(), EngineError> {
        self.transport.send(ClientMessage::Ready { ready })?;
        Ok(())
    }

    pub fn start_game(&self) -> Result<(), EngineError> {
        self.transport.send(ClientMessage::Start)?;
        Ok(())
    }

    pub fn admit_player(
        &self,
        target_id: u64,
        admit: bool,
        playing: bool,
    ) -> Result<(), EngineError> {
        self.transport.send(ClientMessage::Admit {
            target_id,
            admit,
            playing,
        })?;
        Ok(())
    }

    fn handle_synopsis(&self, msg: &ServerMessage) {
        if let Some(remaining) = msg.remaining {
            self.remaining.store(remaining, Ordering::Relaxed);
        }
        self.emit(SessionEvent::Synopsis {
            players: msg.players.clone().unwrap_or_default(),
            remaining: msg.remaining,
        });
    }

    fn handle_results(&self, msg: &ServerMessage) {
        if let Some(remaining) = msg.remaining {
            self.remaining.store(remaining, Ordering::Relaxed);
        }

        let mut players = Vec::new();
        if let Some(data) = &msg.player_data {
            for (index, snapshot) in data.iter().enumerate() {
                let player = msg
                    .player_map
                    .as_ref()
                    .and_then(|map| map.get(&index).copied())
                    .unwrap_or(index as u64);
                players.push(PlayerResult {
                    player,
                    state: GameState::from_snapshot(snapshot),
                });
            }
        }

        self.emit(SessionEvent::Results {
            winner: msg.winner,
            finished: msg.finished.unwrap_or(false),
            players,
        });
    }

    /// Starts the periodic `peek` pull that corrects any drift between local
    /// and server state. Runs until killed or the session goes away.
    pub fn spawn_refresh(self: &Arc<Self>) -> RefreshTimer {
        let weak = Arc::downgrade(self);
        let period = self.config.refresh_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so the join/state
            // exchange settles first.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(session) = weak.upgrade() else { break };
                if session.transport.send(ClientMessage::Peek).is_err() {
                    break;
                }
            }
        });
        RefreshTimer { handle }
    }

    /// Tears the session down: stops routing and rejects anything still
    /// waiting on the transport.
    pub fn close(&self) {
        if let Some(handle) = self.router.lock().unwrap().take() {
            handle.abort();
        }
        self.transport.close();
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cancellable handle for the background refresh loop.
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    pub fn kill(self) {
        self.handle.abort();
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

    struct Harness {
        session: Arc<GameSession>,
        events: UnboundedReceiver<SessionEvent>,
        to_client: UnboundedSender<String>,
        from_client: UnboundedReceiver<String>,
    }

    fn harness_with(config: SessionConfig) -> Harness {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let transport = Transport::new(out_tx, in_rx);
        let (session, events) = GameSession::new(transport, config).unwrap();
        let mut h = Harness {
            session,
            events,
            to_client: in_tx,
            from_client: out_rx,
        };
        // The session introduces itself first.
        let join = h.from_client.try_recv().unwrap();
        assert!(join.contains(r#""message_type":"join""#));
        h
    }

    fn harness() -> Harness {
        harness_with(SessionConfig::default())
    }

    async fn next_frame(h: &mut Harness) -> serde_json::Value {
        let raw = h.from_client.recv().await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    async fn wait_state_changed(h: &mut Harness) {
        loop {
            match h.events.recv().await.unwrap() {
                SessionEvent::StateChanged => return,
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_seeding_then_started_append() {
        let mut h = harness();

        // First push seeds the empty bank and flips the session to started.
        h.to_client
            .send(r#"{"message_type":"state","hand":[{"id":1,"value":"A"}]}"#.to_string())
            .unwrap();
        wait_state_changed(&mut h).await;
        assert!(h.session.started());
        assert_eq!(h.session.state().bank.tile_count(), 1);

        // While started, added.hand appends even on a direct reply.
        h.to_client
            .send(
                r#"{"message_type":"state","reply_to":7,"added":{"hand":[{"id":2,"value":"B"}]}}"#
                    .to_string(),
            )
            .unwrap();
        wait_state_changed(&mut h).await;

        let state = h.session.state();
        assert_eq!(state.bank.tile_count(), 2);
        assert_eq!(state.bank.find_letter(1), Some(0));
        assert_eq!(state.bank.find_letter(2), Some(1));
    }

    #[tokio::test]
    async fn test_reply_before_initialization_is_skipped() {
        let mut h = harness();

        h.to_client
            .send(
                r#"{"message_type":"state","reply_to":3,"hand":[{"id":9,"value":"Z"}]}"#
                    .to_string(),
            )
            .unwrap();
        // A plain push afterwards still seeds normally.
        h.to_client
            .send(r#"{"message_type":"state","hand":[{"id":1,"value":"A"}]}"#.to_string())
            .unwrap();
        wait_state_changed(&mut h).await;

        assert!(h.session.started());
        let state = h.session.state();
        assert_eq!(state.bank.tile_count(), 1);
        assert_eq!(state.bank.find_letter(9), None);
    }

    #[tokio::test]
    async fn test_seed_does_not_clobber_populated_stores() {
        let mut h = harness();
        h.to_client
            .send(r#"{"message_type":"state","hand":[{"id":1,"value":"A"}]}"#.to_string())
            .unwrap();
        wait_state_changed(&mut h).await;

        // Force uninitialized-style full-hand push again by closing over a
        // second session: here we just confirm a second full hand does not
        // replace the first (started path ignores bare `hand`).
        h.to_client
            .send(r#"{"message_type":"state","hand":[{"id":5,"value":"Q"}]}"#.to_string())
            .unwrap();
        wait_state_changed(&mut h).await;

        let state = h.session.state();
        assert_eq!(state.bank.tile_count(), 1);
        assert_eq!(state.bank.find_letter(1), Some(0));
    }

    #[tokio::test]
    async fn test_draw_ids_strictly_increase() {
        let mut h = harness();

        for expected in 1..=3u64 {
            let session = h.session.clone();
            let call = tokio::spawn(async move { session.draw().await });

            let frame = next_frame(&mut h).await;
            assert_eq!(frame["message_type"], "draw");
            assert_eq!(frame["draw_id"].as_u64().unwrap(), expected);

            // The server echoes a stale (lower) counter; it must not
            // wind the client's counter back.
            let id = frame["message_id"].as_u64().unwrap();
            h.to_client
                .send(format!(
                    r#"{{"message_type":"state","reply_to":{id},"draw_id":1,"added":{{"hand":[{{"id":{expected},"value":"E"}}]}}}}"#
                ))
                .unwrap();

            let delivered = call.await.unwrap().unwrap();
            assert_eq!(delivered.len(), 1);
        }

        assert_eq!(h.session.state().bank.tile_count(), 3);
    }

    #[tokio::test]
    async fn test_inbound_draw_id_raises_counter() {
        let mut h = harness();

        h.to_client
            .send(
                r#"{"message_type":"state","hand":[{"id":1,"value":"A"}],"draw_id":5}"#
                    .to_string(),
            )
            .unwrap();
        wait_state_changed(&mut h).await;

        let session = h.session.clone();
        let call = tokio::spawn(async move { session.draw().await });
        let frame = next_frame(&mut h).await;
        assert_eq!(frame["draw_id"].as_u64().unwrap(), 5);

        let id = frame["message_id"].as_u64().unwrap();
        h.to_client
            .send(format!(r#"{{"message_type":"state","reply_to":{id}}}"#))
            .unwrap();
        call.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_discard_flow_replaces_tile() {
        let mut h = harness();
        h.to_client
            .send(
                r#"{"message_type":"state","hand":[{"id":1,"value":"A"},{"id":2,"value":"B"}]}"#
                    .to_string(),
            )
            .unwrap();
        wait_state_changed(&mut h).await;

        let session = h.session.clone();
        let call = tokio::spawn(async move { session.discard(1).await });

        let frame = next_frame(&mut h).await;
        assert_eq!(frame["message_type"], "discard");
        assert_eq!(frame["tile_id"], 1);

        let id = frame["message_id"].as_u64().unwrap();
        h.to_client
            .send(format!(
                r#"{{"message_type":"state","reply_to":{id},"added":{{"hand":[{{"id":3,"value":"C"}}]}},"remaining":40}}"#
            ))
            .unwrap();

        let delivered = call.await.unwrap().unwrap();
        assert_eq!(delivered[0].id, 3);

        let state = h.session.state();
        assert_eq!(state.bank.find_letter(1), None);
        assert_eq!(state.bank.tile_count(), 2);
        drop(state);
        assert_eq!(h.session.remaining(), Some(40));
    }

    #[tokio::test]
    async fn test_play_sends_logical_coordinates() {
        let mut h = harness();
        h.to_client
            .send(r#"{"message_type":"state","hand":[{"id":1,"value":"A"}]}"#.to_string())
            .unwrap();
        wait_state_changed(&mut h).await;

        h.session.play(1, 0, 0).unwrap();
        {
            let mut state = h.session.state();
            assert_eq!(state.grid.get(0, 0).unwrap().id, 1);
            // Pad so storage and logical coordinates diverge.
            state.grid.padding((2, 2));
        }
        h.session.move_tile(1, 2, 3).unwrap();

        let play = next_frame(&mut h).await;
        assert_eq!(play["message_type"], "play");
        assert_eq!(play["x"], 0);
        assert_eq!(play["y"], 0);

        let mv = next_frame(&mut h).await;
        assert_eq!(mv["message_type"], "move");
        // Storage (2, 3) under drift (2, 2) is logical column 1, row 0.
        assert_eq!(mv["x"], 1);
        assert_eq!(mv["y"], 0);
    }

    #[tokio::test]
    async fn test_countdown_echoes_countback() {
        let mut h = harness();
        h.to_client
            .send(r#"{"message_type":"countdown","value":3}"#.to_string())
            .unwrap();

        match h.events.recv().await.unwrap() {
            SessionEvent::Countdown { value } => assert_eq!(value, 3),
            other => panic!("unexpected event {other:?}"),
        }
        let frame = next_frame(&mut h).await;
        assert_eq!(frame["message_type"], "countback");
        assert_eq!(frame["value"], 3);
    }

    #[tokio::test]
    async fn test_checked_reply_highlights_unwords() {
        let mut h = harness();
        h.to_client
            .send(r#"{"message_type":"state","hand":[{"id":1,"value":"Z"},{"id":2,"value":"X"}]}"#.to_string())
            .unwrap();
        wait_state_changed(&mut h).await;
        h.session.play(1, 0, 0).unwrap();
        h.session.play(2, 0, 1).unwrap();

        let session = h.session.clone();
        let call = tokio::spawn(async move { session.check().await });

        let frame = next_frame(&mut h).await; // play
        assert_eq!(frame["message_type"], "play");
        let _ = next_frame(&mut h).await; // second play
        let check = next_frame(&mut h).await;
        assert_eq!(check["message_type"], "check");

        let id = check["message_id"].as_u64().unwrap();
        h.to_client
            .send(format!(
                r#"{{"message_type":"checked","reply_to":{id},"unwords":["zx"]}}"#
            ))
            .unwrap();

        let unwords = call.await.unwrap().unwrap();
        assert_eq!(unwords, vec!["zx"]);
        let state = h.session.state();
        assert_eq!(state.unwords.len(), 1);
        assert_eq!(state.unwords[0].text(), "ZX");
    }

    #[tokio::test]
    async fn test_synopsis_surfaces_player_summaries() {
        let mut h = harness();
        h.to_client
            .send(
                r#"{
                    "message_type": "synopsis",
                    "players": [
                        {"user": 11, "playing": true, "in_hand": 4},
                        {"user": 12, "playing": false}
                    ],
                    "remaining": 17
                }"#
                .to_string(),
            )
            .unwrap();

        match h.events.recv().await.unwrap() {
            SessionEvent::Synopsis { players, remaining } => {
                assert_eq!(remaining, Some(17));
                assert_eq!(players.len(), 2);
                assert_eq!(players[0].user, 11);
                assert!(players[0].playing);
                assert_eq!(players[0].in_hand, Some(4));
                assert!(!players[1].playing);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(h.session.remaining(), Some(17));
    }

    #[tokio::test]
    async fn test_passive_checked_ignores_direct_replies() {
        let mut h = harness();

        // A checked frame correlated to some request must not also surface
        // through the passive path; only the uncorrelated one does.
        h.to_client
            .send(r#"{"message_type":"checked","reply_to":55,"unwords":["zx"]}"#.to_string())
            .unwrap();
        h.to_client
            .send(r#"{"message_type":"checked","unwords":["qy"]}"#.to_string())
            .unwrap();

        match h.events.recv().await.unwrap() {
            SessionEvent::WordsChecked { unwords } => assert_eq!(unwords, vec!["qy"]),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_config_from_env_overrides_and_fallback() {
        std::env::set_var("TILERUSH_REFRESH_SECS", "30");
        std::env::set_var("TILERUSH_PAD", "4");
        let config = SessionConfig::from_env();
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.grid_padding, (4, 4));

        std::env::set_var("TILERUSH_REFRESH_SECS", "soon");
        std::env::set_var("TILERUSH_PAD", "-1");
        let config = SessionConfig::from_env();
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.grid_padding, (2, 2));

        std::env::remove_var("TILERUSH_REFRESH_SECS");
        std::env::remove_var("TILERUSH_PAD");
        let config = SessionConfig::from_env();
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.grid_padding, (2, 2));
    }

    #[tokio::test]
    async fn test_results_build_per_player_snapshots() {
        let mut h = harness();
        h.to_client
            .send(
                r#"{
                    "message_type": "game-state",
                    "player_data": [
                        {"hand": [{"id": 1, "value": "A"}], "unwords": []},
                        {"hand": [], "unwords": ["QQ"]}
                    ],
                    "player_map": {"0": 31, "1": 32},
                    "winner": 31,
                    "finished": true
                }"#
                .to_string(),
            )
            .unwrap();

        match h.events.recv().await.unwrap() {
            SessionEvent::Results {
                winner,
                finished,
                players,
            } => {
                assert_eq!(winner, Some(31));
                assert!(finished);
                assert_eq!(players.len(), 2);
                assert_eq!(players[0].player, 31);
                assert_eq!(players[0].state.bank.tile_count(), 1);
                assert_eq!(players[1].player, 32);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_peeks_until_killed() {
        let mut h = harness_with(SessionConfig {
            refresh_interval: Duration::from_secs(5),
            ..SessionConfig::default()
        });

        let timer = h.session.spawn_refresh();

        tokio::time::advance(Duration::from_secs(11)).await;
        let first = next_frame(&mut h).await;
        assert_eq!(first["message_type"], "peek");
        let second = next_frame(&mut h).await;
        assert_eq!(second["message_type"], "peek");

        timer.kill();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(h.from_client.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_error_notification_surfaces() {
        let mut h = harness();
        h.to_client
            .send(r#"{"message_type":"error","error":"not your turn"}"#.to_string())
            .unwrap();

        match h.events.recv().await.unwrap() {
            SessionEvent::Error { text } => assert_eq!(text, "not your turn"),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
