//! Console commands standing in for the game log reader.

use std::str::FromStr;

pub const HELP: &str = "\
commands:
  join <name> [uuid]   a player joined the lobby
  who <names...>       /who listed these players
  list <names...>      the tab list shows these players
  kill <name>          you final-killed a player
  key <key>            release a hotkey
  table                print the player table
  stats                print plugin statistics
  help                 show this help
  quit                 unload plugins and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join { username: String, uuid: String },
    Who(Vec<String>),
    List(Vec<String>),
    Kill(String),
    Key(String),
    Table,
    Stats,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };
        let args: Vec<String> = words.map(str::to_string).collect();

        match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("join", [username]) => Ok(Command::Join {
                username: username.clone(),
                uuid: String::new(),
            }),
            ("join", [username, uuid]) => Ok(Command::Join {
                username: username.clone(),
                uuid: uuid.clone(),
            }),
            ("join", _) => Err(CommandError::Usage("join <name> [uuid]")),
            ("who", names) if !names.is_empty() => Ok(Command::Who(names.to_vec())),
            ("who", _) => Err(CommandError::Usage("who <names...>")),
            ("list", names) if !names.is_empty() => Ok(Command::List(names.to_vec())),
            ("list", _) => Err(CommandError::Usage("list <names...>")),
            ("kill", [name]) => Ok(Command::Kill(name.clone())),
            ("kill", _) => Err(CommandError::Usage("kill <name>")),
            ("key", [key]) => Ok(Command::Key(key.clone())),
            ("key", _) => Err(CommandError::Usage("key <key>")),
            ("table", []) => Ok(Command::Table),
            ("stats", []) => Ok(Command::Stats),
            ("help", _) => Ok(Command::Help),
            ("quit" | "exit", []) => Ok(Command::Quit),
            (other, _) => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
