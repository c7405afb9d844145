//! Line commands read by the binary.

use chess_board::NodeId;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid node id '{0}'")]
    InvalidNode(String),
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A coordinate move such as `e2e4` or `e7e8q`, resolved against the
    /// live orientation when played.
    Move(String),
    Back,
    Forward,
    Goto(NodeId),
    Trim,
    Promote,
    Flip,
    Hint,
    Stop,
    /// Block until the running search finishes.
    Wait,
    TakeBack,
    Claim,
    Restart { keep_tree: bool },
    Board,
    Tree,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let mut parts = input.split_whitespace();
        let cmd = parts.next().ok_or(CommandError::Empty)?;

        match cmd {
            "back" => Ok(Command::Back),
            "forward" => Ok(Command::Forward),
            "goto" => {
                let arg = parts.next().ok_or(CommandError::MissingArgument("goto"))?;
                arg.parse::<u32>()
                    .map(|raw| Command::Goto(NodeId::new(raw)))
                    .map_err(|_| CommandError::InvalidNode(arg.to_string()))
            }
            "trim" => Ok(Command::Trim),
            "promote" => Ok(Command::Promote),
            "flip" => Ok(Command::Flip),
            "hint" => Ok(Command::Hint),
            "stop" => Ok(Command::Stop),
            "wait" => Ok(Command::Wait),
            "takeback" => Ok(Command::TakeBack),
            "claim" => Ok(Command::Claim),
            "restart" => Ok(Command::Restart {
                keep_tree: parts.next() == Some("keep"),
            }),
            "board" => Ok(Command::Board),
            "tree" => Ok(Command::Tree),
            "quit" | "exit" => Ok(Command::Quit),
            mv if looks_like_move(mv) => Ok(Command::Move(mv.to_string())),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn looks_like_move(s: &str) -> bool {
    let b = s.as_bytes();
    let square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && b"nbrq".contains(&b[4]),
        _ => false,
    }
}
