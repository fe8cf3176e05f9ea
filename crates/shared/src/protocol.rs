//! Command envelope exchanged between clients and the server
//!
//! Every message on the wire is one [`Command`]: a [`CommandKind`] tag plus a
//! handful of optional fields whose presence depends on the kind. The JSON
//! field names are fixed:
//!
//! ```json
//! {"CMD": "NewMove", "MoveDetails": {...}, "AssignedTeam": null,
//!  "GameIdentifier": 7, "Name": null, "Message": null, "OpponentName": null}
//! ```
//!
//! # Required Fields
//!
//! | Kind                | Required                       |
//! |---------------------|--------------------------------|
//! | `NewMove`           | `MoveDetails`                  |
//! | `StartGameInstance` | `AssignedTeam`, `OpponentName` |
//! | `RegisterUser`      | non-empty `Name`               |
//! | `ServerFull`        | `Message`                      |
//!
//! The named constructors enforce this when a command is built, and
//! [`Command::validate`] enforces it again on every decoded payload.

use chess_engine::{MoveDescriptor, Team};
use serde::{Deserialize, Serialize};

/// Server-assigned identifier of a tracked game
pub type GameId = u64;

/// Errors raised when a command lacks what its kind requires
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("{kind:?} requires the {field} field")]
    MissingField {
        kind: CommandKind,
        field: &'static str,
    },

    #[error("{kind:?} requires a non-empty {field}")]
    EmptyField {
        kind: CommandKind,
        field: &'static str,
    },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Tag naming what a [`Command`] means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    ClientDisconnecting,
    NewMove,
    OpponentClientDisconnected,
    StartGameInstance,
    LookingForGame,
    ServerIsShuttingDown,
    DeclareWin,
    DeclareLoss,
    DeclareStalemate,
    RegisterUser,
    WelcomeToServer,
    ServerFull,
    InvalidMove,
}

impl CommandKind {
    /// Whether the kind ends a game when a participant sends it
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            CommandKind::DeclareWin | CommandKind::DeclareLoss | CommandKind::DeclareStalemate
        )
    }
}

/// One protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "CMD")]
    pub kind: CommandKind,

    #[serde(rename = "MoveDetails", default)]
    pub move_details: Option<MoveDescriptor>,

    #[serde(rename = "AssignedTeam", default)]
    pub assigned_team: Option<Team>,

    #[serde(rename = "GameIdentifier", default)]
    pub game_id: GameId,

    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    #[serde(rename = "Message", default)]
    pub message: Option<String>,

    #[serde(rename = "OpponentName", default)]
    pub opponent_name: Option<String>,
}

impl Command {
    /// Envelope with only the kind set
    ///
    /// Fine for kinds without a payload. For the others, [`Command::validate`]
    /// reports what is missing.
    pub fn bare(kind: CommandKind) -> Self {
        Command {
            kind,
            move_details: None,
            assigned_team: None,
            game_id: 0,
            name: None,
            message: None,
            opponent_name: None,
        }
    }

    fn for_game(kind: CommandKind, game_id: GameId) -> Self {
        Command {
            game_id,
            ..Command::bare(kind)
        }
    }

    pub fn client_disconnecting() -> Self {
        Command::bare(CommandKind::ClientDisconnecting)
    }

    pub fn looking_for_game() -> Self {
        Command::bare(CommandKind::LookingForGame)
    }

    pub fn server_is_shutting_down() -> Self {
        Command::bare(CommandKind::ServerIsShuttingDown)
    }

    pub fn opponent_client_disconnected(game_id: GameId) -> Self {
        Command::for_game(CommandKind::OpponentClientDisconnected, game_id)
    }

    pub fn declare_win(game_id: GameId) -> Self {
        Command::for_game(CommandKind::DeclareWin, game_id)
    }

    pub fn declare_loss(game_id: GameId) -> Self {
        Command::for_game(CommandKind::DeclareLoss, game_id)
    }

    pub fn declare_stalemate(game_id: GameId) -> Self {
        Command::for_game(CommandKind::DeclareStalemate, game_id)
    }

    /// Relay a move within a game
    pub fn new_move(game_id: GameId, mv: MoveDescriptor) -> Self {
        Command {
            move_details: Some(mv),
            ..Command::for_game(CommandKind::NewMove, game_id)
        }
    }

    /// Rejection of a move or a command; the offending move is echoed when known
    pub fn invalid_move(
        game_id: GameId,
        mv: Option<MoveDescriptor>,
        message: impl Into<String>,
    ) -> Self {
        Command {
            move_details: mv,
            message: Some(message.into()),
            ..Command::for_game(CommandKind::InvalidMove, game_id)
        }
    }

    /// Tell one side of a freshly paired game who it plays and as which team
    ///
    /// # Errors
    ///
    /// [`ProtocolError::EmptyField`] if `opponent_name` is empty.
    pub fn start_game_instance(
        game_id: GameId,
        team: Team,
        opponent_name: impl Into<String>,
    ) -> ProtocolResult<Self> {
        let command = Command {
            assigned_team: Some(team),
            opponent_name: Some(opponent_name.into()),
            ..Command::for_game(CommandKind::StartGameInstance, game_id)
        };
        command.validate()?;
        Ok(command)
    }

    /// # Errors
    ///
    /// [`ProtocolError::EmptyField`] if `name` is empty or whitespace.
    pub fn register_user(name: impl Into<String>) -> ProtocolResult<Self> {
        let command = Command {
            name: Some(name.into()),
            ..Command::bare(CommandKind::RegisterUser)
        };
        command.validate()?;
        Ok(command)
    }

    pub fn welcome_to_server(message: impl Into<String>) -> Self {
        Command {
            message: Some(message.into()),
            ..Command::bare(CommandKind::WelcomeToServer)
        }
    }

    pub fn server_full(message: impl Into<String>) -> Self {
        Command {
            message: Some(message.into()),
            ..Command::bare(CommandKind::ServerFull)
        }
    }

    /// Check that every field the kind requires is present
    pub fn validate(&self) -> ProtocolResult<()> {
        let kind = self.kind;
        let missing = |field| ProtocolError::MissingField { kind, field };
        let empty = |field| ProtocolError::EmptyField { kind, field };

        match kind {
            CommandKind::NewMove if self.move_details.is_none() => Err(missing("MoveDetails")),
            CommandKind::StartGameInstance => {
                if self.assigned_team.is_none() {
                    return Err(missing("AssignedTeam"));
                }
                match self.opponent_name.as_deref() {
                    None => Err(missing("OpponentName")),
                    Some(name) if name.trim().is_empty() => Err(empty("OpponentName")),
                    Some(_) => Ok(()),
                }
            }
            CommandKind::RegisterUser => match self.name.as_deref() {
                None => Err(missing("Name")),
                Some(name) if name.trim().is_empty() => Err(empty("Name")),
                Some(_) => Ok(()),
            },
            CommandKind::ServerFull if self.message.is_none() => Err(missing("Message")),
            _ => Ok(()),
        }
    }
}
