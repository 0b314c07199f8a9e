//! Typed request/response envelopes exchanged over rendezvous channels.
//!
//! Requests that expect an answer carry the requester's private reply
//! channel. Answers are only ever sent on that channel, never on a
//! cell's shared entry channel, so concurrent suitors of the same cell
//! cannot read each other's replies.

use crossbeam_channel::Sender;

use crate::id::AgentId;

/// What a [`Message`] asks for or answers with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Mobile agent asks to enter a cell.
    Enter,
    /// Cell admits the mobile agent.
    EnterConfirm,
    /// Cell refuses the mobile agent (eviction of its stationary
    /// occupant failed).
    EnterDeny,
    /// Cell was hazardous: the entrant is destroyed and the hazard is
    /// consumed.
    EnterHazard,
    /// Mobile agent tells its previous cell it has gone.
    Leave,
    /// Cell asks its stationary occupant to make room.
    Evict,
    /// Stationary occupant moved away.
    EvictConfirm,
    /// Stationary occupant could not move.
    EvictDeny,
    /// Stationary agent asks to enter a cell.
    StationaryEnter,
    /// Cell admits the stationary agent.
    StationaryEnterConfirm,
    /// Stationary agent tells its previous cell it has relocated.
    StationaryLeave,
    /// Stationary agent tells its host cell it has expired.
    StationaryDied,
}

impl MessageKind {
    /// Whether a message of this kind must carry a reply channel.
    pub fn expects_reply(self) -> bool {
        matches!(self, Self::Enter | Self::StationaryEnter | Self::Evict)
    }
}

/// One envelope on a rendezvous channel.
#[derive(Clone, Debug)]
pub struct Message {
    /// Message kind.
    pub kind: MessageKind,
    /// Mobile agent on whose behalf the message travels, or
    /// [`AgentId::NONE`].
    pub agent: AgentId,
    /// Requester's private reply channel, set for kinds where
    /// [`MessageKind::expects_reply`] holds.
    pub reply: Option<Sender<Message>>,
    /// Stationary occupant's eviction channel; set on
    /// [`MessageKind::StationaryEnter`] only.
    pub evict: Option<Sender<Message>>,
}

impl Message {
    fn bare(kind: MessageKind, agent: AgentId) -> Self {
        Self {
            kind,
            agent,
            reply: None,
            evict: None,
        }
    }

    /// Mobile entry request.
    pub fn enter(agent: AgentId, reply: Sender<Message>) -> Self {
        Self {
            reply: Some(reply),
            ..Self::bare(MessageKind::Enter, agent)
        }
    }

    /// Mobile departure notice.
    pub fn leave(agent: AgentId) -> Self {
        Self::bare(MessageKind::Leave, agent)
    }

    /// Stationary entry request. `evict` is where the cell will send
    /// [`MessageKind::Evict`] while the agent is its occupant.
    pub fn stationary_enter(reply: Sender<Message>, evict: Sender<Message>) -> Self {
        Self {
            reply: Some(reply),
            evict: Some(evict),
            ..Self::bare(MessageKind::StationaryEnter, AgentId::NONE)
        }
    }

    /// Stationary departure notice after a voluntary move.
    pub fn stationary_leave() -> Self {
        Self::bare(MessageKind::StationaryLeave, AgentId::NONE)
    }

    /// Stationary termination notice.
    pub fn stationary_died() -> Self {
        Self::bare(MessageKind::StationaryDied, AgentId::NONE)
    }

    /// Eviction request from a host cell; the occupant answers on
    /// `reply`.
    pub fn evict(reply: Sender<Message>) -> Self {
        Self {
            reply: Some(reply),
            ..Self::bare(MessageKind::Evict, AgentId::NONE)
        }
    }

    /// A reply of `kind` addressed to `agent`.
    pub fn response(kind: MessageKind, agent: AgentId) -> Self {
        Self::bare(kind, agent)
    }
}
