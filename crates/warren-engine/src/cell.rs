//! Cell actor: sole owner of one grid position's occupancy and hazard
//! state.
//!
//! A cell is always in exactly one of three occupancy states and only
//! listens on the channels that are valid in that state:
//!
//! | State      | Listens on                                                   |
//! |------------|--------------------------------------------------------------|
//! | Empty      | mobile entry, stationary entry (unless hazardous), tick, hazard expiry |
//! | Mobile     | mobile departure, tick                                       |
//! | Stationary | stationary notices, mobile entry (eviction), tick            |
//!
//! A suitor racing a non-blocking send therefore only ever reaches a
//! cell that is prepared to answer it.

use std::time::Instant;

use crossbeam_channel::{at, bounded, never, select, tick, Receiver, Sender};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, warn};
use warren_core::{
    recv_until, send_until, AgentId, CellIndex, EventKind, Message, MessageKind, Position,
    RendezvousError,
};

use crate::board::{CellStatus, Occupancy};
use crate::config::{SpawnOutcome, SpawnRates};
use crate::context::{task_rng, SimContext};
use crate::grid::CellInbox;
use crate::mobile::MobileAgent;
use crate::population::Reservation;
use crate::stationary::StationaryAgent;

#[derive(Debug)]
enum Occupant {
    Empty,
    Mobile(AgentId),
    Stationary { evict: Sender<Message> },
}

/// What woke a cell up.
enum Wake {
    MobileEnter(Message),
    StationaryEnter(Message),
    Departure(Message),
    StationaryNotice(Message),
    Tick,
    HazardExpired,
    Closed,
}

/// One attempt at handing an eviction request to the occupant.
enum Delivery {
    Sent(bool),
    Notice(Option<Message>),
    Pending,
}

/// Result of asking a stationary occupant to make room.
#[derive(Debug, PartialEq, Eq)]
enum Eviction {
    /// The occupant is gone: it confirmed, moved away or expired.
    Vacated,
    /// The occupant could not move.
    Refused,
    /// Shutdown interrupted the exchange.
    Cancelled,
}

pub(crate) struct CellActor {
    pos: Position,
    index: CellIndex,
    occupant: Occupant,
    /// `Some` while hazardous: the instant the hazard expires.
    hazard_until: Option<Instant>,
    rates: SpawnRates,
    rng: ChaCha8Rng,
    evict_reply_tx: Sender<Message>,
    evict_reply_rx: Receiver<Message>,
    ctx: SimContext,
}

impl CellActor {
    pub(crate) fn new(pos: Position, index: CellIndex, ctx: SimContext) -> Self {
        let (evict_reply_tx, evict_reply_rx) = bounded(0);
        Self {
            pos,
            index,
            occupant: Occupant::Empty,
            hazard_until: None,
            rates: ctx.config.rates_at(pos),
            rng: task_rng(ctx.config.seed, index.0 as u64),
            evict_reply_tx,
            evict_reply_rx,
            ctx,
        }
    }

    /// Serve until cancellation.
    pub(crate) fn run(mut self, inbox: CellInbox) {
        let ticker = tick(self.ctx.config.tick_interval);
        self.publish();
        while !self.ctx.token.is_cancelled() {
            let wake = match self.occupant {
                Occupant::Empty => self.wait_empty(&inbox, &ticker),
                Occupant::Mobile(_) => Self::wait_mobile(&inbox, &ticker),
                Occupant::Stationary { .. } => Self::wait_stationary(&inbox, &ticker),
            };
            match wake {
                Wake::MobileEnter(msg) => self.on_mobile_enter(msg, &inbox),
                Wake::StationaryEnter(msg) => self.on_stationary_enter(msg),
                Wake::Departure(msg) => self.on_departure(&msg),
                Wake::StationaryNotice(msg) => {
                    self.on_stationary_notice(&msg);
                }
                Wake::Tick => self.on_tick(),
                Wake::HazardExpired => self.expire_hazard(),
                Wake::Closed => break,
            }
        }
        debug!(cell = %self.pos, "cell stopped");
    }

    // ── Waiting ─────────────────────────────────────────────────

    fn wait_empty(&self, inbox: &CellInbox, ticker: &Receiver<Instant>) -> Wake {
        // Stationary agents never settle on a hazard.
        let closed = never();
        let stationary_in = if self.hazard_until.is_some() {
            &closed
        } else {
            &inbox.stationary_in
        };
        let expiry = match self.hazard_until {
            Some(deadline) => at(deadline),
            None => never(),
        };
        select! {
            recv(inbox.mobile_in) -> msg => msg.map_or(Wake::Closed, Wake::MobileEnter),
            recv(stationary_in) -> msg => msg.map_or(Wake::Closed, Wake::StationaryEnter),
            recv(ticker) -> _ => Wake::Tick,
            recv(expiry) -> _ => Wake::HazardExpired,
        }
    }

    fn wait_mobile(inbox: &CellInbox, ticker: &Receiver<Instant>) -> Wake {
        select! {
            recv(inbox.mobile_out) -> msg => msg.map_or(Wake::Closed, Wake::Departure),
            recv(ticker) -> _ => Wake::Tick,
        }
    }

    fn wait_stationary(inbox: &CellInbox, ticker: &Receiver<Instant>) -> Wake {
        select! {
            recv(inbox.stationary_out) -> msg => msg.map_or(Wake::Closed, Wake::StationaryNotice),
            recv(inbox.mobile_in) -> msg => msg.map_or(Wake::Closed, Wake::MobileEnter),
            recv(ticker) -> _ => Wake::Tick,
        }
    }

    // ── Mobile traffic ──────────────────────────────────────────

    fn on_mobile_enter(&mut self, msg: Message, inbox: &CellInbox) {
        let reply = match (msg.kind, &msg.reply) {
            (MessageKind::Enter, Some(reply)) => reply,
            _ => return self.protocol_error(&msg),
        };
        if matches!(self.occupant, Occupant::Stationary { .. }) {
            match self.evict_occupant(inbox) {
                Eviction::Vacated => {
                    self.occupant = Occupant::Empty;
                    self.publish();
                }
                Eviction::Refused | Eviction::Cancelled => {
                    self.answer(reply, MessageKind::EnterDeny, msg.agent);
                    return;
                }
            }
        }
        self.admit(reply, msg.agent);
    }

    /// Answer an entry request while empty.
    fn admit(&mut self, reply: &Sender<Message>, agent: AgentId) {
        if self.hazard_until.is_some() {
            if self.answer(reply, MessageKind::EnterHazard, agent) {
                // Consumed by exactly this entrant.
                self.hazard_until = None;
                self.ctx
                    .emitter
                    .emit(EventKind::AgentEnteredHazard { agent, at: self.pos });
                self.publish();
            }
        } else if self.answer(reply, MessageKind::EnterConfirm, agent) {
            self.occupant = Occupant::Mobile(agent);
            self.ctx
                .emitter
                .emit(EventKind::AgentReceived { agent, at: self.pos });
            self.publish();
        }
    }

    fn on_departure(&mut self, msg: &Message) {
        match self.occupant {
            Occupant::Mobile(id) if msg.kind == MessageKind::Leave && msg.agent == id => {
                self.occupant = Occupant::Empty;
                self.ctx
                    .emitter
                    .emit(EventKind::AgentLeft { agent: id, at: self.pos });
                self.publish();
            }
            _ => self.protocol_error(msg),
        }
    }

    // ── Stationary traffic ──────────────────────────────────────

    fn on_stationary_enter(&mut self, msg: Message) {
        let (reply, evict) = match (msg.kind, &msg.reply, &msg.evict) {
            (MessageKind::StationaryEnter, Some(reply), Some(evict)) => (reply, evict),
            _ => return self.protocol_error(&msg),
        };
        if self.answer(reply, MessageKind::StationaryEnterConfirm, AgentId::NONE) {
            self.occupant = Occupant::Stationary {
                evict: evict.clone(),
            };
            self.publish();
        }
    }

    /// Returns whether the stationary occupant is gone.
    fn on_stationary_notice(&mut self, msg: &Message) -> bool {
        match msg.kind {
            MessageKind::StationaryDied | MessageKind::StationaryLeave => {
                self.occupant = Occupant::Empty;
                self.publish();
                true
            }
            _ => {
                self.protocol_error(msg);
                false
            }
        }
    }

    fn evict_occupant(&mut self, inbox: &CellInbox) -> Eviction {
        let evict = match &self.occupant {
            Occupant::Stationary { evict } => evict.clone(),
            _ => return Eviction::Vacated,
        };
        let retry = self.ctx.config.retry_interval;
        let request = Message::evict(self.evict_reply_tx.clone());

        // Phase 1: deliver the request unless the occupant moves away
        // or expires first.
        loop {
            if self.ctx.token.is_cancelled() {
                return Eviction::Cancelled;
            }
            let step = select! {
                send(evict, request.clone()) -> res => Delivery::Sent(res.is_ok()),
                recv(inbox.stationary_out) -> msg => Delivery::Notice(msg.ok()),
                default(retry) => Delivery::Pending,
            };
            match step {
                Delivery::Sent(true) => break,
                // The occupant's task is gone.
                Delivery::Sent(false) => return Eviction::Vacated,
                Delivery::Notice(Some(msg)) => {
                    if self.on_stationary_notice(&msg) {
                        return Eviction::Vacated;
                    }
                }
                Delivery::Notice(None) => return Eviction::Cancelled,
                Delivery::Pending => {}
            }
        }

        // Phase 2: the occupant answers exactly once.
        match recv_until(&self.evict_reply_rx, &self.ctx.token, retry) {
            Ok(m) if m.kind == MessageKind::EvictConfirm => Eviction::Vacated,
            Ok(m) if m.kind == MessageKind::EvictDeny => Eviction::Refused,
            Ok(m) => {
                self.protocol_error(&m);
                Eviction::Refused
            }
            Err(RendezvousError::Cancelled) => Eviction::Cancelled,
            Err(RendezvousError::Disconnected) => Eviction::Vacated,
        }
    }

    // ── Ticks ───────────────────────────────────────────────────

    fn on_tick(&mut self) {
        // Occupied or hazardous cells only wake to observe cancellation.
        if !matches!(self.occupant, Occupant::Empty) || self.hazard_until.is_some() {
            return;
        }
        let draw: f64 = self.rng.gen();
        match self.rates.choose(draw) {
            Some(SpawnOutcome::Mobile) => self.spawn_mobile(),
            Some(SpawnOutcome::Hazard) => self.raise_hazard(),
            Some(SpawnOutcome::Stationary) => self.spawn_stationary(),
            None => {}
        }
    }

    fn spawn_mobile(&mut self) {
        // At the cap: no spawn this tick.
        let Some(reservation) = Reservation::acquire(&self.ctx.population) else {
            return;
        };
        let id = reservation.id();
        let agent = MobileAgent::new(reservation, self.pos, self.ctx.clone(), self.rng.gen());
        // The agent is held until its spawn is on the stream, so none of
        // its own events can overtake it.
        let (start_tx, start_rx) = bounded(1);
        if let Err(e) = self
            .ctx
            .agents
            .spawn(format!("warren-mobile-{id}"), move || agent.run(start_rx))
        {
            error!(cell = %self.pos, error = %e, "failed to spawn mobile agent");
            return;
        }
        self.occupant = Occupant::Mobile(id);
        self.ctx
            .emitter
            .emit(EventKind::AgentSpawned { agent: id, at: self.pos });
        self.publish();
        let _ = start_tx.send(());
        debug!(cell = %self.pos, agent = %id, "mobile agent spawned");
    }

    fn raise_hazard(&mut self) {
        self.hazard_until = Some(Instant::now() + self.ctx.config.hazard_lifetime);
        self.ctx
            .emitter
            .emit(EventKind::HazardSpawned { at: self.pos });
        self.publish();
    }

    fn expire_hazard(&mut self) {
        self.hazard_until = None;
        self.ctx
            .emitter
            .emit(EventKind::HazardDisappeared { at: self.pos });
        self.publish();
    }

    fn spawn_stationary(&mut self) {
        if !self.ctx.config.stationary_enabled {
            return;
        }
        let (agent, evict) = StationaryAgent::new(self.pos, self.ctx.clone(), self.rng.gen());
        let (start_tx, start_rx) = bounded(1);
        if let Err(e) = self.ctx.agents.spawn(
            format!("warren-stationary-{}", self.index),
            move || agent.run(start_rx),
        ) {
            error!(cell = %self.pos, error = %e, "failed to spawn stationary agent");
            return;
        }
        self.occupant = Occupant::Stationary { evict };
        self.ctx
            .emitter
            .emit(EventKind::StationarySpawned { at: self.pos });
        self.publish();
        let _ = start_tx.send(());
    }

    // ── Helpers ─────────────────────────────────────────────────

    /// Send a response on a suitor's private channel. Returns whether
    /// the suitor took it.
    fn answer(&self, reply: &Sender<Message>, kind: MessageKind, agent: AgentId) -> bool {
        let retry = self.ctx.config.retry_interval;
        send_until(reply, Message::response(kind, agent), &self.ctx.token, retry).is_ok()
    }

    fn publish(&self) {
        let occupancy = match self.occupant {
            Occupant::Empty => Occupancy::Empty,
            Occupant::Mobile(id) => Occupancy::Mobile(id),
            Occupant::Stationary { .. } => Occupancy::Stationary,
        };
        self.ctx.board.publish(
            self.index,
            CellStatus {
                occupancy,
                hazardous: self.hazard_until.is_some(),
            },
        );
    }

    fn protocol_error(&self, msg: &Message) {
        warn!(
            cell = %self.pos,
            kind = ?msg.kind,
            agent = %msg.agent,
            state = ?self.occupant,
            "protocol error: message ignored"
        );
    }

    #[cfg(test)]
    fn hazardous_for(mut self, lifetime: std::time::Duration) -> Self {
        self.hazard_until = Some(Instant::now() + lifetime);
        self
    }
}
