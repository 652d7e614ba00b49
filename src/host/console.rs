//! Terminal implementations of the progress and dialog capabilities

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::host::{Dialogs, ProgressReporter};

/// Progress printed to stderr; Ctrl-C requests cancellation
#[derive(Default)]
pub struct ConsoleProgress {
    cancelled: AtomicBool,
}

impl ConsoleProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Flip the cancel flag on the first Ctrl-C
    pub fn watch_ctrl_c(self: &Arc<Self>) {
        let progress = Arc::clone(self);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested, stopping after the current source");
                progress.cancel();
            }
        });
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl ProgressReporter for ConsoleProgress {
    fn update(&self, percent: u8, message: &str) {
        eprintln!("[{percent:>3}%] {message}");
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn close(&self) {
        debug!("Progress closed");
    }
}

/// Dialogs on stdin/stderr
///
/// In non-interactive mode selections and confirmations resolve to "no
/// answer" without reading stdin.
pub struct ConsoleDialogs {
    interactive: bool,
}

impl ConsoleDialogs {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    async fn read_line() -> Option<String> {
        read_answer(&mut BufReader::new(tokio::io::stdin())).await
    }
}

/// One trimmed line; `None` at end of input
async fn read_answer<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// 1-based menu answer to an option index
fn choice_index(answer: &str, options: usize) -> Option<usize> {
    let choice: usize = answer.parse().ok()?;
    (1..=options).contains(&choice).then(|| choice - 1)
}

#[async_trait]
impl Dialogs for ConsoleDialogs {
    fn ok(&self, heading: &str, message: &str) {
        eprintln!("{heading}: {message}");
    }

    fn notify(&self, message: &str) {
        info!("{}", message);
    }

    async fn select(&self, heading: &str, options: &[String]) -> Option<usize> {
        if !self.interactive || options.is_empty() {
            return None;
        }

        eprintln!("{heading}");
        for (index, option) in options.iter().enumerate() {
            eprintln!("  {}) {}", index + 1, option);
        }
        eprint!("Choice: ");

        let answer = Self::read_line().await?;
        choice_index(&answer, options.len())
    }

    async fn yes_no(&self, heading: &str, message: &str) -> bool {
        if !self.interactive {
            return false;
        }

        eprint!("{heading}: {message} [y/N] ");
        matches!(
            Self::read_line().await.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y") | Some("yes")
        )
    }
}
