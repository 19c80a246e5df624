//! Broker destinations.
//!
//! The broker multiplexes every logical channel over one physical connection.
//! Inbound traffic arrives on three subscriptions; outbound traffic goes to
//! application destinations under `/app`.

/// Public room broadcast.
pub const PUBLIC_TOPIC: &str = "/topic/public";

/// Per-user private inbox. The broker resolves `/user` to the authenticated
/// principal.
pub const PRIVATE_QUEUE: &str = "/user/queue/private";

/// Online roster broadcast.
pub const PRESENCE_TOPIC: &str = "/topic/users";

/// Publish to the public room.
pub const SEND_PUBLIC: &str = "/app/chat.sendMessage";

/// Publish to a single peer.
pub const SEND_PRIVATE: &str = "/app/chat.sendPrivate";

/// Session join notification, sent once after the handshake.
pub const JOIN: &str = "/app/chat.join";

/// Inbound logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Public room messages.
    Public,
    /// Private messages addressed to or echoed back to us.
    Private,
    /// Full online roster.
    Presence,
}

impl Channel {
    /// All inbound channels, in subscription order.
    pub const ALL: [Channel; 3] = [Self::Public, Self::Private, Self::Presence];

    /// Destination to subscribe to.
    pub fn destination(self) -> &'static str {
        match self {
            Self::Public => PUBLIC_TOPIC,
            Self::Private => PRIVATE_QUEUE,
            Self::Presence => PRESENCE_TOPIC,
        }
    }

    /// Subscription id we register for this channel.
    pub fn subscription_id(self) -> &'static str {
        match self {
            Self::Public => "sub-public",
            Self::Private => "sub-private",
            Self::Presence => "sub-presence",
        }
    }

    /// Channel for a subscription id we registered.
    pub fn from_subscription_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.subscription_id() == id)
    }

    /// Channel for a delivered destination.
    ///
    /// Private deliveries may carry the resolved per-session queue name
    /// (`/queue/private-user...`), so any destination ending in the private
    /// queue suffix maps to [`Channel::Private`].
    pub fn from_destination(destination: &str) -> Option<Self> {
        match destination {
            PUBLIC_TOPIC => Some(Self::Public),
            PRESENCE_TOPIC => Some(Self::Presence),
            d if d == PRIVATE_QUEUE || d.starts_with("/queue/private") => Some(Self::Private),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_ids_resolve_back() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_subscription_id(channel.subscription_id()), Some(channel));
            assert_eq!(Channel::from_destination(channel.destination()), Some(channel));
        }
    }

    #[test]
    fn resolved_private_queue_maps_to_private() {
        assert_eq!(
            Channel::from_destination("/queue/private-user3f2a"),
            Some(Channel::Private)
        );
        assert_eq!(Channel::from_destination("/topic/other"), None);
    }
}
