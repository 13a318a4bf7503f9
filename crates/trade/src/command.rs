//! Command language
//!
//! One command per line, tokens separated by whitespace:
//! `bal`, `reload`, `buy <amount>`, `sell <amount>`.

use thiserror::Error;

/// A well-formed client command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Report the current balance
    Balance,
    /// Reset the balance to its opening value
    Reload,
    /// Add coins
    Buy(i64),
    /// Remove coins, if covered
    Sell(i64),
}

/// A line that is not a valid command.
///
/// The `Display` text is the reply sent back to the client.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid command.")]
    InvalidCommand,

    #[error("second parameter must be a number.")]
    NotANumber,

    #[error("too many parameters.")]
    TooManyParameters,
}

impl Command {
    /// Parse one line, with or without its line terminator
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            ["bal"] => Ok(Command::Balance),
            ["reload"] => Ok(Command::Reload),
            [_] => Err(ProtocolError::InvalidCommand),
            [verb, amount] => {
                // The amount is parsed before the verb is looked at.
                let amount = amount
                    .parse::<i64>()
                    .map_err(|_| ProtocolError::NotANumber)?;
                match *verb {
                    "buy" => Ok(Command::Buy(amount)),
                    "sell" => Ok(Command::Sell(amount)),
                    _ => Err(ProtocolError::InvalidCommand),
                }
            }
            _ => Err(ProtocolError::TooManyParameters),
        }
    }
}
