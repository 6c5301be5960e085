//! Command Dispatcher
//!
//! Maps chat commands such as `?PTL nova` onto governance queries and
//! formats the answers as plain text lines, one line per message.
//! Unknown teams and repositories never fail a command; handlers fall back
//! to whatever defaults the model provides.

use crate::governance::{
    enumerate_repositories, Liaison, RepositoryFilter, TagSet, Team, TeamData, MISSING,
};
use crate::state::SharedState;
use tracing::{debug, warn};

/// Reply for malformed or unknown commands
pub const USAGE: &str = "Available actions are ?PTL|?REPOS|?CHANNEL|?MISSION|?TAGS|?WHOIS";

const REPO_INDENT: &str = "        ";

/// Supported commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ptl,
    Repos,
    Channel,
    Mission,
    Tags,
    Whois,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Ptl,
        Command::Repos,
        Command::Channel,
        Command::Mission,
        Command::Tags,
        Command::Whois,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Command::Ptl => "?PTL",
            Command::Repos => "?REPOS",
            Command::Channel => "?CHANNEL",
            Command::Mission => "?MISSION",
            Command::Tags => "?TAGS",
            Command::Whois => "?WHOIS",
        }
    }

    /// Case-insensitive match against the command vocabulary
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.token().eq_ignore_ascii_case(token))
    }
}

/// What an incoming line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Not addressed to the bot
    Ignore,
    /// Looks like a command but cannot be run
    Usage,
    Query { command: Command, argument: String },
}

impl Request {
    /// Classify a whitespace-split line. The argument is lowercased.
    pub fn parse(words: &[&str]) -> Self {
        let Some(first) = words.first() else {
            return Request::Ignore;
        };
        if !first.starts_with('?') {
            return Request::Ignore;
        }
        match (Command::parse(first), words.get(1)) {
            (Some(command), Some(argument)) => Request::Query {
                command,
                argument: argument.to_lowercase(),
            },
            _ => Request::Usage,
        }
    }
}

/// Answers commands against the current governance snapshot
#[derive(Clone)]
pub struct CommandDispatcher {
    state: SharedState,
}

impl CommandDispatcher {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Split a raw chat line and handle it
    pub async fn handle_line(&self, channel: &str, line: &str) -> Vec<String> {
        let words: Vec<&str> = line.split_whitespace().collect();
        self.handle(channel, &words).await
    }

    /// Response lines for one command. Empty when the line is not a command.
    pub async fn handle(&self, channel: &str, words: &[&str]) -> Vec<String> {
        let (command, argument) = match Request::parse(words) {
            Request::Ignore => return Vec::new(),
            Request::Usage => return vec![USAGE.to_string()],
            Request::Query { command, argument } => (command, argument),
        };

        debug!("{} {} requested in {}", command.token(), argument, channel);
        let data = self.state.snapshot().await;
        let lines = match command {
            Command::Ptl => self.ptl_liaison(&data, channel, &argument).await,
            Command::Repos => repos(&data, &argument),
            Command::Channel => vec![irc_channel(&data, &argument)],
            Command::Mission => vec![mission(&data, &argument)],
            Command::Tags => vec![tags(&data, &argument)],
            Command::Whois => vec![whois(&data, &argument)],
        };
        lines.into_iter().map(|line| single_line(&line)).collect()
    }

    /// PTL of the owning team, plus the release liaison in release channels
    async fn ptl_liaison(&self, data: &TeamData, channel: &str, token: &str) -> Vec<String> {
        let team_name = resolve_team(data, token);
        let team = Team::from_data(data, team_name);
        let title = title_case(team_name);
        let mut lines = vec![format!("{} PTL: {} ({})", title, team.ptl.name, team.ptl.irc)];

        if channel.to_lowercase().contains("release") {
            match team.liaison(self.state.liaisons()).await {
                Ok(Liaison {
                    name: Some(name),
                    irc,
                }) if !name.is_empty() => lines.push(format!(
                    "{} Liaison: {} ({})",
                    title,
                    name,
                    irc.as_deref().unwrap_or(MISSING)
                )),
                Ok(_) => {}
                Err(e) => warn!("Could not look up liaison for {}: {}", team_name, e),
            }
        }
        lines
    }
}

/// Owning team when `token` is a known repository, else the token itself
fn resolve_team<'a>(data: &'a TeamData, token: &'a str) -> &'a str {
    data.find_repo_owner(token).unwrap_or(token)
}

fn repos(data: &TeamData, team: &str) -> Vec<String> {
    let mut lines = vec![format!("{} repos:", title_case(team))];
    let filter = RepositoryFilter::new().team(team);
    match enumerate_repositories(data, &filter) {
        Ok(repositories) => {
            lines.extend(repositories.map(|entry| format!("{}{}", REPO_INDENT, entry.name())))
        }
        Err(e) => debug!("No repositories listed: {}", e),
    }
    lines
}

fn irc_channel(data: &TeamData, token: &str) -> String {
    let team_name = resolve_team(data, token);
    let team = Team::from_data(data, team_name);
    format!("{} uses IRC channel {}", title_case(team_name), team.irc_channel)
}

fn mission(data: &TeamData, team_name: &str) -> String {
    let team = Team::from_data(data, team_name);
    let mission = team.mission.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{}'s mission statement is: {}", title_case(team_name), mission)
}

fn tags(data: &TeamData, token: &str) -> String {
    let (team_name, tags) = match data.locate_repository(token) {
        Ok(location) => (
            location.team,
            data.tags_for_deliverable(location.team, &location.deliverable),
        ),
        Err(_) => match data.find_deliverable_owner(token) {
            Some(team_name) => (team_name, data.tags_for_deliverable(team_name, token)),
            None => (token, Team::from_data(data, token).tags),
        },
    };
    format!("{} asserts tags: {}", title_case(team_name), format_tags(&tags))
}

fn whois(data: &TeamData, repo_name: &str) -> String {
    match data.find_repo_owner(repo_name) {
        Ok(team_name) => format!("{} is owned by {}", repo_name, team_name),
        Err(_) => format!("Error getting whois. Is {} a repo?", repo_name),
    }
}

/// Fold CR and LF into spaces so document text cannot start a new protocol line
fn single_line(line: &str) -> String {
    line.replace(['\r', '\n'], " ")
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// `{'a', 'b'}`
fn format_tags(tags: &TagSet) -> String {
    let items: Vec<String> = tags.iter().map(|tag| format!("'{}'", tag)).collect();
    format!("{{{}}}", items.join(", "))
}
