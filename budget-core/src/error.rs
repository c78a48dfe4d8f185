use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Bot error: {0}")]
    Bot(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure raised by a handler action. The dispatcher logs it and moves on to the next event.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Failed to send reply: {0}")]
    Bot(String),

    #[error("Budget service error: {0}")]
    Service(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("State error: {0}")]
    State(String),
}

impl From<BotError> for HandlerError {
    fn from(e: BotError) -> Self {
        match e {
            BotError::Handler(inner) => inner,
            other => HandlerError::Bot(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_error_into_handler_error() {
        let e: HandlerError = BotError::Bot("timeout".to_string()).into();
        assert!(matches!(e, HandlerError::Bot(ref m) if m.contains("timeout")));

        let e: HandlerError = BotError::Handler(HandlerError::State("x".to_string())).into();
        assert!(matches!(e, HandlerError::State(_)));
    }
}
