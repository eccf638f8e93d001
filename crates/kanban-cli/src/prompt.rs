//! Interactive command prompt.

use std::future::Future;
use std::io::Write as _;
use std::ops::Range;
use std::str::FromStr;

use anyhow::Result;
use kanban_controller::display::OperatorDisplay;
use kanban_controller::{BatchRun, LogLevel, Operator, SessionController};
use kanban_hardware::AnyCardSession;
use kanban_hardware::mock::{MockReaderHandle, Presentation};
use owo_colors::OwoColorize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

use crate::interrupt::Interrupts;
use crate::terminal::TerminalDisplay;

pub type Controller = SessionController<AnyCardSession, TerminalDisplay>;

const HELP: &str = "\
Commands:
  write <t1> <t2>          Write two thread codes to one card
  write-n <t1> <t2> [n]    Write the same codes to n cards
  bypass                   Write a BYPASS card
  read                     Read one card
  clear                    Erase one card
  read-loop                Read cards until stopped
  clear-loop               Erase cards until stopped
  status                   Show reader and card status
  help                     Show this help
  quit                     Exit

Ctrl-C stops a running read or clear loop. Anywhere else it exits, once
the card operation in progress has finished.";

const SIMULATOR_HELP: &str = "\
Simulated reader:
  present <uid-hex>        Place a card on the reader
  remove                   Take the card off the reader
  queue <n>                Queue n fresh cards, each leaving after use";

/// Highest card number [`queued_uid`] can encode.
const MAX_QUEUED_UID: u32 = 0x00FF_FFFF;

/// One parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Write { thread1: String, thread2: String },
    WriteMany { thread1: String, thread2: String, count: Option<u32> },
    Bypass,
    Read,
    Clear,
    ReadLoop,
    ClearLoop,
    Status,
    Help,
    Quit,
    Present(Vec<u8>),
    Remove,
    Queue(u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid UID '{0}': expected hex bytes like 04A1B2C3")]
    InvalidUid(String),

    #[error("Can queue 1-{max} cards at a time")]
    QueueSize { max: u32 },

    #[error("No simulated card UIDs left to queue")]
    QueueExhausted,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (name.as_str(), args.as_slice()) {
            ("write", [t1, t2]) => Self::Write {
                thread1: t1.to_string(),
                thread2: t2.to_string(),
            },
            ("write", _) => return Err(CommandError::Usage("write <t1> <t2>")),
            ("write-n", [t1, t2, rest @ ..]) if rest.len() <= 1 => Self::WriteMany {
                thread1: t1.to_string(),
                thread2: t2.to_string(),
                count: rest.first().map(|n| parse_count(n)).transpose()?,
            },
            ("write-n", _) => return Err(CommandError::Usage("write-n <t1> <t2> [n]")),
            ("bypass", []) => Self::Bypass,
            ("read", []) => Self::Read,
            ("clear", []) => Self::Clear,
            ("read-loop", []) => Self::ReadLoop,
            ("clear-loop", []) => Self::ClearLoop,
            ("status", []) => Self::Status,
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            ("present", []) => return Err(CommandError::Usage("present <uid-hex>")),
            ("present", hex) => Self::Present(parse_uid(&hex.concat())?),
            ("remove", []) => Self::Remove,
            ("queue", [n]) => Self::Queue(parse_count(n)?),
            ("queue", _) => return Err(CommandError::Usage("queue <n>")),
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };
        Ok(command)
    }
}

fn parse_count(text: &str) -> Result<u32, CommandError> {
    text.trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber(text.trim().to_string()))
}

/// Parse `04A1B2C3` or `04:A1:B2:C3` into UID bytes.
pub fn parse_uid(text: &str) -> Result<Vec<u8>, CommandError> {
    let hex: String = text.chars().filter(|c| *c != ':').collect();
    let invalid = || CommandError::InvalidUid(text.to_string());

    if hex.is_empty() || hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(invalid());
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid()))
        .collect()
}

/// Line-oriented front end bound to one controller.
pub struct Prompt<'a> {
    operator: Operator<'a, AnyCardSession, TerminalDisplay>,
    simulator: Option<MockReaderHandle>,
    lines: Lines<BufReader<Stdin>>,
    interrupts: Interrupts,
    quit_requested: bool,
    next_queued_uid: u32,
}

impl<'a> Prompt<'a> {
    pub fn new(
        controller: &'a Controller,
        simulator: Option<MockReaderHandle>,
        interrupts: Interrupts,
    ) -> Self {
        Self {
            operator: Operator::new(controller),
            simulator,
            lines: BufReader::new(tokio::io::stdin()).lines(),
            interrupts,
            quit_requested: false,
            next_queued_uid: 1,
        }
    }

    fn display(&self) -> &TerminalDisplay {
        self.operator.controller().display()
    }

    fn print_help(&self) {
        println!("{}", HELP);
        if self.simulator.is_some() {
            println!("{}", SIMULATOR_HELP);
        }
    }

    /// Read and run commands until `quit`, end of input or Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        self.print_help();

        loop {
            print!("{} ", ">".cyan().bold());
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = self.lines.next_line() => line?,
                () = self.interrupts.recv() => None,
            };
            let Some(line) = line else {
                println!();
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(Command::Quit) => return Ok(()),
                Ok(command) => self.execute(command).await?,
                Err(e) => println!("{}", e.red()),
            }

            if self.quit_requested || self.interrupts.take_pending() {
                println!("{}", "Interrupted".yellow());
                return Ok(());
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Write { thread1, thread2 } => {
                if let Err(e) = self.operator.write_one(&thread1, &thread2).await {
                    debug!("Write rejected: {}", e);
                }
            }
            Command::WriteMany {
                thread1,
                thread2,
                count,
            } => {
                let count = match count {
                    Some(count) => count,
                    None => match self.ask_count().await? {
                        Some(count) => count,
                        None => return Ok(()),
                    },
                };
                if let Err(e) = self.operator.write_many(&thread1, &thread2, count).await {
                    debug!("Batch write rejected: {}", e);
                }
            }
            Command::Bypass => {
                if self
                    .confirm("Write a BYPASS card? It will bypass all verification.")
                    .await?
                {
                    self.operator.write_bypass().await;
                }
            }
            Command::Read => {
                self.operator.read_one().await;
            }
            Command::Clear => {
                if self.confirm("Erase both thread codes on the next card?").await? {
                    self.operator.clear_one().await;
                }
            }
            Command::ReadLoop => {
                let run = stop_on_input(
                    &mut self.lines,
                    &mut self.interrupts,
                    self.operator.controller().display(),
                    self.operator.read_continuous(),
                )
                .await?;
                debug!("Read loop finished after {} cards", run.summary.attempted());
            }
            Command::ClearLoop => {
                if self
                    .confirm("Erase every card presented until stopped?")
                    .await?
                {
                    let run = stop_on_input(
                        &mut self.lines,
                        &mut self.interrupts,
                        self.operator.controller().display(),
                        self.operator.clear_continuous(),
                    )
                    .await?;
                    debug!("Clear loop finished after {} cards", run.summary.attempted());
                }
            }
            Command::Status => {
                self.display()
                    .print_status(self.operator.controller().is_busy());
            }
            Command::Help => self.print_help(),
            Command::Quit => {}
            Command::Present(uid) => {
                if let Some(handle) = self.simulator() {
                    handle.present_card(uid);
                }
            }
            Command::Remove => {
                if let Some(handle) = self.simulator() {
                    handle.remove_card();
                }
            }
            Command::Queue(count) => {
                let max = self.operator.controller().config().max_batch_size;
                let Some(handle) = self.simulator() else {
                    return Ok(());
                };
                match queue_range(self.next_queued_uid, count, max) {
                    Ok(numbers) => {
                        handle.set_auto_remove(true);
                        handle.script(numbers.clone().map(|n| Presentation::Card(queued_uid(n))));
                        println!("Queued {} cards", count);
                        self.next_queued_uid = numbers.end;
                    }
                    Err(e) => println!("{}", e.red()),
                }
            }
        }
        Ok(())
    }

    fn simulator(&self) -> Option<&MockReaderHandle> {
        if self.simulator.is_none() {
            println!("{}", "Only available with the simulated reader".yellow());
        }
        self.simulator.as_ref()
    }

    /// Ask a question; Ctrl-C answers nothing and ends the session.
    async fn read_answer(&mut self, question: &str) -> Result<Option<String>> {
        print!("{} ", question);
        std::io::stdout().flush()?;

        let answer = tokio::select! {
            line = self.lines.next_line() => Some(line?),
            () = self.interrupts.recv() => None,
        };
        Ok(answer.unwrap_or_else(|| {
            println!();
            self.quit_requested = true;
            None
        }))
    }

    async fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.read_answer(&format!("{} [y/N]", question)).await?;
        Ok(answer.is_some_and(|a| matches!(a.trim(), "y" | "Y" | "yes")))
    }

    async fn ask_count(&mut self) -> Result<Option<u32>> {
        let max = self.operator.controller().config().max_batch_size;
        let Some(answer) = self
            .read_answer(&format!("How many cards to write? (1-{})", max))
            .await?
        else {
            return Ok(None);
        };

        match parse_count(&answer) {
            Ok(count) => Ok(Some(count)),
            Err(_) => {
                self.display()
                    .show_error("Invalid Input", "Please enter a valid number.");
                Ok(None)
            }
        }
    }
}

/// Card numbers for the next `count` queued cards, starting at `next`.
fn queue_range(next: u32, count: u32, max: u32) -> Result<Range<u32>, CommandError> {
    if count == 0 || count > max {
        return Err(CommandError::QueueSize { max });
    }
    match next.checked_add(count) {
        Some(end) if end <= MAX_QUEUED_UID + 1 => Ok(next..end),
        _ => Err(CommandError::QueueExhausted),
    }
}

/// UID of the n-th queued simulator card.
fn queued_uid(n: u32) -> Vec<u8> {
    let [_, a, b, c] = n.to_be_bytes();
    vec![0x04, a, b, c]
}

/// Drive a continuous batch while watching stdin and Ctrl-C for Stop.
///
/// The batch itself is never dropped early; Stop only raises the cancel
/// signal and the batch ends at its next check.
async fn stop_on_input<F>(
    lines: &mut Lines<BufReader<Stdin>>,
    interrupts: &mut Interrupts,
    display: &TerminalDisplay,
    run: F,
) -> Result<BatchRun>
where
    F: Future<Output = BatchRun>,
{
    tokio::pin!(run);
    let mut stopping = false;

    loop {
        tokio::select! {
            run = &mut run => return Ok(run),
            line = lines.next_line(), if !stopping => {
                line?;
                stopping = display.press_stop();
            }
            () = interrupts.recv(), if !stopping => {
                stopping = display.press_stop();
            }
        }

        if stopping {
            display.log("Stopping...", LogLevel::Warning);
        }
    }
}
