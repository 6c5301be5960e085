//! IRC Protocol Lines
//!
//! Parsing of incoming lines and formatting of the handful of commands the
//! bot sends. Message tags (`@key=value`) are accepted and ignored.

/// One parsed protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse a line without its trailing CRLF. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r).unwrap_or("");
        }
        rest = rest.trim_start();

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = r;
                Some(prefix.to_string())
            }
            None => None,
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => match rest.strip_prefix(':') {
                Some(trailing) => ("", Some(trailing)),
                None => (rest, None),
            },
        };

        let mut words = head.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Some(Self {
            prefix,
            command,
            params,
        })
    }

    /// Nickname part of the prefix
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|prefix| prefix.split(['!', '@']).next().unwrap_or(prefix))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

pub fn nick(nickname: &str) -> String {
    format!("NICK {}", nickname)
}

pub fn user(username: &str, realname: &str) -> String {
    format!("USER {} 0 * :{}", username, realname)
}

pub fn join(channel: &str) -> String {
    format!("JOIN {}", channel)
}

pub fn pong(token: &str) -> String {
    format!("PONG :{}", token)
}

pub fn privmsg(target: &str, text: &str) -> String {
    format!("PRIVMSG {} :{}", target, text)
}

pub fn cap_req(capability: &str) -> String {
    format!("CAP REQ :{}", capability)
}

pub fn cap_end() -> String {
    "CAP END".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_privmsg() {
        let msg = Message::parse(":alice!~a@host.example PRIVMSG #openstack-release :+?ptl nova\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!~a@host.example"));
        assert_eq!(msg.nick(), Some("alice"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#openstack-release", "+?ptl nova"]);
    }

    #[test]
    fn test_parse_without_prefix() {
        let msg = Message::parse("PING :irc.example.net").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.param(0), Some("irc.example.net"));
    }

    #[test]
    fn test_parse_numeric_and_cap() {
        let msg = Message::parse(":irc.example.net 001 guvnahbot :Welcome to the network").unwrap();
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["guvnahbot", "Welcome to the network"]);

        let msg = Message::parse(":irc.example.net CAP guvnahbot ACK :identify-msg").unwrap();
        assert_eq!(msg.params, vec!["guvnahbot", "ACK", "identify-msg"]);
    }

    #[test]
    fn test_parse_skips_message_tags() {
        let msg = Message::parse("@time=2024-01-01T00:00:00Z :bob PRIVMSG #c :hi").unwrap();
        assert_eq!(msg.nick(), Some("bob"));
        assert_eq!(msg.params, vec!["#c", "hi"]);
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("\r\n"), None);
    }

    #[test]
    fn test_format_commands() {
        assert_eq!(privmsg("#c", "hello there"), "PRIVMSG #c :hello there");
        assert_eq!(user("bot", "bot"), "USER bot 0 * :bot");
        assert_eq!(cap_req("identify-msg"), "CAP REQ :identify-msg");
        assert_eq!(pong("irc.example.net"), "PONG :irc.example.net");
    }
}
