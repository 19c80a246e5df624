//! Inbound frame routing.
//!
//! Classifies a `MESSAGE` frame by the channel it arrived on, decodes its
//! body and applies it to [`ChatState`]. Frames that cannot be applied are
//! reported as [`RouteError`] and leave the state untouched; the caller logs
//! them and carries on.

use lobby_proto::{Channel, Frame, OnlineUser, UserId, WireMessage};

use crate::{chat::ChatState, error::RouteError, message::ChatMessage};

/// Where a frame ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Appended to the public log.
    Public,
    /// Appended to the thread with `peer_id`.
    Private {
        /// The other participant.
        peer_id: UserId,
    },
    /// Replaced the roster.
    Presence {
        /// Users online, excluding ourselves.
        online: usize,
    },
}

/// Apply one inbound frame.
///
/// # Errors
///
/// - `RouteError::Decode` if the body is not the channel's payload
/// - `RouteError::NoCurrentUser` for private frames before sign-in
/// - `RouteError::NoPeer` if a private frame names no other participant
pub fn route(
    chat: &mut ChatState,
    channel: Channel,
    frame: &Frame,
    current_user: Option<UserId>,
) -> Result<Routed, RouteError> {
    match channel {
        Channel::Public => {
            let wire: WireMessage = frame.json()?;
            chat.receive_public(ChatMessage::from_wire(wire, current_user));
            Ok(Routed::Public)
        },
        Channel::Private => {
            let current = current_user.ok_or(RouteError::NoCurrentUser)?;
            let wire: WireMessage = frame.json()?;
            let message = ChatMessage::from_wire(wire, Some(current));
            let peer_id = message.peer_of(current).ok_or(RouteError::NoPeer)?;

            chat.receive_private(peer_id, message);
            Ok(Routed::Private { peer_id })
        },
        Channel::Presence => {
            let users: Vec<OnlineUser> = frame.json()?;
            chat.apply_presence(users, current_user);
            Ok(Routed::Presence { online: chat.presence().current().len() })
        },
    }
}
