/// Core error type for the bot.
///
/// Store and command errors are all recoverable: the command handler converts
/// each of them into a user-facing reply. The adapter crate maps transport
/// failures into `External`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("list already exists: {0}")]
    DuplicateList(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unrecognized command: {0}")]
    UnrecognizedCommand(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
