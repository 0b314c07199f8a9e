//! Stationary agent: occupies a cell for a fixed lifetime, relocates
//! now and then, and makes room when its host asks.
//!
//! The host cell holds the sending half of the agent's private eviction
//! channel for as long as the agent lives there. Every exit path sends
//! exactly one termination notice to the current host.

use crossbeam_channel::{after, bounded, select, tick, Receiver, Sender};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};
use warren_core::{recv_until, send_until, AgentId, EventKind, Message, MessageKind, Position};

use crate::context::SimContext;
use crate::egress::{Egress, Traffic};

enum Wake {
    Tick,
    Expired,
    Evict(Message),
    Closed,
}

pub(crate) struct StationaryAgent {
    pos: Position,
    egress: Egress,
    evict_tx: Sender<Message>,
    evict_rx: Receiver<Message>,
    reply_tx: Sender<Message>,
    reply_rx: Receiver<Message>,
    rng: ChaCha8Rng,
    ctx: SimContext,
}

impl StationaryAgent {
    /// An agent settled in the cell at `pos`, plus the eviction sender
    /// the host cell keeps.
    pub(crate) fn new(pos: Position, ctx: SimContext, seed: u64) -> (Self, Sender<Message>) {
        let (evict_tx, evict_rx) = bounded(0);
        let (reply_tx, reply_rx) = bounded(0);
        let agent = Self {
            pos,
            egress: Egress::new(&ctx.grid, pos, Traffic::Stationary),
            evict_tx: evict_tx.clone(),
            evict_rx,
            reply_tx,
            reply_rx,
            rng: ChaCha8Rng::seed_from_u64(seed),
            ctx,
        };
        (agent, evict_tx)
    }

    pub(crate) fn run(mut self, start: Receiver<()>) {
        if recv_until(&start, &self.ctx.token, self.ctx.config.retry_interval).is_err() {
            self.die();
            return;
        }
        let ticker = tick(self.ctx.config.tick_interval);
        let lifetime = after(self.ctx.config.stationary_lifetime);
        while !self.ctx.token.is_cancelled() {
            let wake = select! {
                recv(self.evict_rx) -> msg => msg.map_or(Wake::Closed, Wake::Evict),
                recv(lifetime) -> _ => Wake::Expired,
                recv(ticker) -> _ => Wake::Tick,
            };
            match wake {
                Wake::Evict(msg) => self.on_evict(msg),
                Wake::Tick => self.on_tick(),
                Wake::Expired | Wake::Closed => break,
            }
        }
        self.die();
    }

    fn on_tick(&mut self) {
        if !self.rng.gen_bool(self.ctx.config.stationary_move_probability) {
            return;
        }
        if let Some(from) = self.try_move() {
            self.notify(from, Message::stationary_leave());
        }
    }

    fn on_evict(&mut self, msg: Message) {
        let reply = match (msg.kind, &msg.reply) {
            (MessageKind::Evict, Some(reply)) => reply,
            _ => {
                warn!(at = %self.pos, kind = ?msg.kind, "protocol error: message ignored");
                return;
            }
        };
        // Exactly one attempt. The host learns the outcome from the
        // reply, so no departure notice follows.
        let kind = if self.try_move().is_some() {
            MessageKind::EvictConfirm
        } else {
            MessageKind::EvictDeny
        };
        let retry = self.ctx.config.retry_interval;
        let answer = Message::response(kind, AgentId::NONE);
        if let Err(e) = send_until(reply, answer, &self.ctx.token, retry) {
            debug!(at = %self.pos, error = %e, "eviction answer not delivered");
        }
    }

    /// Attempt one move. Returns the position left behind on success.
    fn try_move(&mut self) -> Option<Position> {
        let request = Message::stationary_enter(self.reply_tx.clone(), self.evict_tx.clone());
        let (direction, target) = self.egress.race(request)?;
        let retry = self.ctx.config.retry_interval;
        let reply = recv_until(&self.reply_rx, &self.ctx.token, retry).ok()?;
        if reply.kind != MessageKind::StationaryEnterConfirm {
            warn!(at = %self.pos, kind = ?reply.kind, "protocol error: unexpected reply");
            return None;
        }
        let from = self.pos;
        self.ctx.emitter.emit(EventKind::StationaryMoved {
            from,
            to: target,
            direction,
        });
        self.pos = target;
        self.egress = Egress::new(&self.ctx.grid, target, Traffic::Stationary);
        Some(from)
    }

    /// Deliver a notice on the stationary departure channel of `host`.
    fn notify(&self, host: Position, msg: Message) {
        let Some(out) = self
            .ctx
            .grid
            .ports(host)
            .ok()
            .and_then(|p| p.stationary_out.as_ref())
        else {
            return;
        };
        if self.ctx.token.is_cancelled() {
            // The host may already have stopped.
            let _ = out.try_send(msg);
            return;
        }
        let retry = self.ctx.config.retry_interval;
        if let Err(e) = send_until(out, msg, &self.ctx.token, retry) {
            debug!(at = %host, error = %e, "notice not delivered");
        }
    }

    fn die(self) {
        self.ctx
            .emitter
            .emit(EventKind::StationaryDied { at: self.pos });
        self.notify(self.pos, Message::stationary_died());
        debug!(at = %self.pos, "stationary agent stopped");
    }
}
