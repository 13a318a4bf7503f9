//! Command processor - one line in, one reply out
//!
//! Owns the account, so every balance mutation happens on whichever task
//! drives the processor. The balance is published on a watch channel after
//! each change for display refreshers.

use crate::account::{Account, AccountError};
use crate::command::{Command, ProtocolError};
use crate::events::{EventSink, Severity};
use tokio::sync::watch;

pub struct CommandProcessor<S> {
    account: Account,
    sink: S,
    balance_tx: watch::Sender<i64>,
}

impl<S: EventSink> CommandProcessor<S> {
    pub fn new(opening_balance: i64, sink: S) -> Self {
        let (balance_tx, _) = watch::channel(opening_balance);
        Self {
            account: Account::new(opening_balance),
            sink,
            balance_tx,
        }
    }

    /// Current balance
    pub fn balance(&self) -> i64 {
        self.account.balance()
    }

    /// Observe balance changes
    pub fn subscribe_balance(&self) -> watch::Receiver<i64> {
        self.balance_tx.subscribe()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Interpret one received line and return the reply, newline included.
    pub fn handle_line(&mut self, line: &str) -> String {
        let reply = match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(e) => e.to_string(),
        };
        format!("{}\n", reply)
    }

    fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Balance => format!("current balance: {}.", self.account.balance()),
            Command::Reload => {
                self.account.reload();
                self.publish();
                self.sink.emit("reload.".to_string(), Severity::Info);
                "account reloaded.".to_string()
            }
            Command::Buy(amount) => match self.account.buy(amount) {
                Ok(_) => {
                    self.publish();
                    self.sink
                        .emit(format!("buy order: {} IC.", amount), Severity::Info);
                    format!("bought: {} coins.", amount)
                }
                Err(_) => ProtocolError::NotANumber.to_string(),
            },
            Command::Sell(amount) => match self.account.sell(amount) {
                Ok(_) => {
                    self.publish();
                    self.sink
                        .emit(format!("sell order: {} IC.", amount), Severity::Info);
                    format!("sold: {} coins.", amount)
                }
                Err(AccountError::InsufficientFunds { .. }) => {
                    self.sink.emit(
                        format!("sell order: {} IC: BLOCKED!", amount),
                        Severity::Alert,
                    );
                    "insufficient funds!".to_string()
                }
                Err(AccountError::Overflow) => ProtocolError::NotANumber.to_string(),
            },
        }
    }

    fn publish(&self) {
        self.balance_tx.send_replace(self.account.balance());
    }
}
