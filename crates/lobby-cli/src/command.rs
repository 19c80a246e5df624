//! Typed-line parsing.

use lobby_proto::UserId;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Text for the active conversation.
    Say(String),
    /// `/pm <id> <text>`: message a peer without switching to them.
    Pm {
        /// Recipient.
        peer_id: UserId,
        /// Message text.
        text: String,
    },
    /// `/open <id>`: switch to the thread with a peer.
    Open(UserId),
    /// `/close`: return to the public room.
    Close,
    /// `/history [n]`: reload the active conversation.
    History(Option<usize>),
    /// `/who`: list online users.
    Who,
    /// `/online <id>`: ask the server whether a user is online.
    Online(UserId),
    /// `/connect`: reconnect after the connection dropped.
    Connect,
    /// `/chats`: list private threads.
    Chats,
    /// `/help`: list commands.
    Help,
    /// `/quit` or `/q`.
    Quit,
    /// Malformed command, with usage to show.
    Invalid(&'static str),
}

/// Help text listing every command.
pub const HELP: &str = "\
/pm <id> <text>  message a user
/open <id>       switch to a private chat
/close           back to the public room
/history [n]     reload the last n messages
/who             list online users
/online <id>     check whether a user is online
/chats           list private chats
/connect         reconnect
/quit            leave";

impl Input {
    /// Parse one line. Lines not starting with `/` are chat text.
    pub fn parse(line: &str) -> Self {
        let Some(cmd) = line.trim_start().strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let (name, rest) = cmd.split_once(char::is_whitespace).unwrap_or((cmd, ""));
        let rest = rest.trim();

        match name {
            "pm" => {
                let (peer, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match peer.parse() {
                    Ok(peer_id) if !text.trim().is_empty() => {
                        Self::Pm { peer_id, text: text.trim().to_string() }
                    },
                    _ => Self::Invalid("Usage: /pm <user_id> <message>"),
                }
            },
            "open" => rest.parse().map_or(Self::Invalid("Usage: /open <user_id>"), Self::Open),
            "close" => Self::Close,
            "history" if rest.is_empty() => Self::History(None),
            "history" => rest
                .parse()
                .map_or(Self::Invalid("Usage: /history [count]"), |n| Self::History(Some(n))),
            "who" => Self::Who,
            "online" => {
                rest.parse().map_or(Self::Invalid("Usage: /online <user_id>"), Self::Online)
            },
            "connect" => Self::Connect,
            "chats" => Self::Chats,
            "help" | "?" => Self::Help,
            "quit" | "q" => Self::Quit,
            _ => Self::Invalid("Unknown command, try /help"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(Input::parse("hello there"), Input::Say("hello there".into()));
    }

    #[test]
    fn pm_needs_id_and_text() {
        assert_eq!(Input::parse("/pm 7 hi  there "), Input::Pm {
            peer_id: 7,
            text: "hi  there".into()
        });
        assert!(matches!(Input::parse("/pm 7"), Input::Invalid(_)));
        assert!(matches!(Input::parse("/pm bob hi"), Input::Invalid(_)));
    }

    #[test]
    fn open_and_history_parse_numbers() {
        assert_eq!(Input::parse("/open 12"), Input::Open(12));
        assert!(matches!(Input::parse("/open"), Input::Invalid(_)));
        assert_eq!(Input::parse("/history"), Input::History(None));
        assert_eq!(Input::parse("/history 50"), Input::History(Some(50)));
        assert!(matches!(Input::parse("/history lots"), Input::Invalid(_)));
        assert_eq!(Input::parse("/online 4"), Input::Online(4));
        assert!(matches!(Input::parse("/online"), Input::Invalid(_)));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(Input::parse("/close"), Input::Close);
        assert_eq!(Input::parse("/who"), Input::Who);
        assert_eq!(Input::parse("/connect"), Input::Connect);
        assert_eq!(Input::parse("/chats"), Input::Chats);
        assert_eq!(Input::parse("/q"), Input::Quit);
        assert!(matches!(Input::parse("/dance"), Input::Invalid(_)));
    }
}
