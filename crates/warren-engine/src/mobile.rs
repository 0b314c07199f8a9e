//! Mobile agent: a random walker that moves by rendezvous with its
//! neighbours and dies on hazards.

use crossbeam_channel::{bounded, tick, Receiver, Sender};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};
use warren_core::{recv_until, send_until, AgentId, EventKind, Message, MessageKind, Position};

use crate::context::SimContext;
use crate::egress::{Egress, Traffic};
use crate::population::Reservation;

/// Outcome of one move attempt.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Stayed,
    Moved,
    Died,
}

pub(crate) struct MobileAgent {
    reservation: Reservation,
    pos: Position,
    egress: Egress,
    reply_tx: Sender<Message>,
    reply_rx: Receiver<Message>,
    rng: ChaCha8Rng,
    ctx: SimContext,
}

impl MobileAgent {
    /// An agent already admitted to the cell at `pos`.
    pub(crate) fn new(reservation: Reservation, pos: Position, ctx: SimContext, seed: u64) -> Self {
        let (reply_tx, reply_rx) = bounded(0);
        Self {
            reservation,
            pos,
            egress: Egress::new(&ctx.grid, pos, Traffic::Mobile),
            reply_tx,
            reply_rx,
            rng: ChaCha8Rng::seed_from_u64(seed),
            ctx,
        }
    }

    fn id(&self) -> AgentId {
        self.reservation.id()
    }

    /// Walk until death or cancellation. Nothing happens before `start`
    /// fires.
    pub(crate) fn run(mut self, start: Receiver<()>) {
        if recv_until(&start, &self.ctx.token, self.ctx.config.retry_interval).is_err() {
            return;
        }
        let ticker = tick(self.ctx.config.tick_interval);
        while ticker.recv().is_ok() {
            if self.ctx.token.is_cancelled() {
                break;
            }
            if !self.rng.gen_bool(self.ctx.config.move_probability) {
                continue;
            }
            if self.attempt_move() == Step::Died {
                break;
            }
        }
        debug!(agent = %self.id(), at = %self.pos, "mobile agent stopped");
        // Dropping the reservation returns the population slot.
    }

    fn attempt_move(&mut self) -> Step {
        let id = self.id();
        let request = Message::enter(id, self.reply_tx.clone());
        // No neighbour ready: no move this tick.
        let Some((direction, target)) = self.egress.race(request) else {
            return Step::Stayed;
        };
        let cfg = &self.ctx.config;
        // Cancellation abandons the attempt without side effects.
        let Ok(reply) = recv_until(&self.reply_rx, &self.ctx.token, cfg.retry_interval) else {
            return Step::Stayed;
        };
        match reply.kind {
            MessageKind::EnterConfirm => {
                let from = self.pos;
                self.ctx.emitter.emit(EventKind::AgentMoved {
                    agent: id,
                    from,
                    to: target,
                    direction,
                });
                // Only now, with the new cell confirmed, free the old one.
                self.leave(from);
                self.pos = target;
                self.egress = Egress::new(&self.ctx.grid, target, Traffic::Mobile);
                Step::Moved
            }
            MessageKind::EnterHazard => {
                self.ctx
                    .emitter
                    .emit(EventKind::AgentDied { agent: id, at: target });
                self.leave(self.pos);
                Step::Died
            }
            MessageKind::EnterDeny => Step::Stayed,
            other => {
                warn!(agent = %id, kind = ?other, "protocol error: unexpected reply");
                Step::Stayed
            }
        }
    }

    fn leave(&self, from: Position) {
        let port = match self.ctx.grid.ports(from) {
            Ok(ports) => &ports.mobile_out,
            Err(e) => {
                warn!(agent = %self.id(), error = %e, "no cell to leave");
                return;
            }
        };
        let retry = self.ctx.config.retry_interval;
        if let Err(e) = send_until(port, Message::leave(self.id()), &self.ctx.token, retry) {
            debug!(agent = %self.id(), at = %from, error = %e, "leave notice not delivered");
        }
    }
}
