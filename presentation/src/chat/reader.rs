//! Line editor on its own thread
//!
//! `rustyline` blocks the calling thread. The editor lives on a dedicated
//! thread so the async runtime keeps supervising servers while the user types.
//!
//! A reader dropped mid-prompt (the scope dropped the REPL on a signal)
//! cannot wake the blocked editor. It restores the terminal modes captured at
//! spawn instead and leaves the thread behind.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Outcome of one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Line(String),
    /// Ctrl-C at the prompt
    Interrupted,
    /// Ctrl-D or closed input
    Eof,
    Failed(String),
}

pub struct LineReader {
    prompts: Option<std_mpsc::Sender<String>>,
    lines: mpsc::UnboundedReceiver<ReadEvent>,
    thread: Option<JoinHandle<()>>,
    /// A prompt was sent and its answer not yet received
    pending: bool,
    terminal: TerminalModes,
}

impl LineReader {
    /// Start the editor thread, loading and later saving `history`.
    pub fn spawn(history: Option<PathBuf>) -> std::io::Result<Self> {
        let (prompt_tx, prompt_rx) = std_mpsc::channel::<String>();
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let terminal = TerminalModes::capture();

        let thread = std::thread::Builder::new()
            .name("toolrouter-readline".to_string())
            .spawn(move || editor_thread(history, prompt_rx, line_tx))?;

        Ok(Self {
            prompts: Some(prompt_tx),
            lines: line_rx,
            thread: Some(thread),
            pending: false,
            terminal,
        })
    }

    pub async fn read_line(&mut self, prompt: &str) -> ReadEvent {
        let Some(prompts) = &self.prompts else {
            return ReadEvent::Eof;
        };
        // A dead editor thread may still have left its failure in the channel
        let _ = prompts.send(prompt.to_string());
        self.pending = true;
        let event = self.lines.recv().await.unwrap_or(ReadEvent::Eof);
        self.pending = false;
        event
    }

    /// Stop the editor thread and wait for it to save history.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.prompts.take();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.pending {
            debug!("Prompt abandoned, restoring terminal and detaching readline thread");
            self.terminal.restore();
            return;
        }
        if thread.join().is_err() {
            warn!("Readline thread panicked");
        }
    }
}

/// Terminal attributes of stdin as they were before the editor went raw.
#[cfg(unix)]
struct TerminalModes(Option<libc::termios>);

#[cfg(unix)]
impl TerminalModes {
    fn capture() -> Self {
        let mut termios = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr initializes `termios` when it returns 0
        let captured = unsafe {
            (libc::tcgetattr(libc::STDIN_FILENO, termios.as_mut_ptr()) == 0)
                .then(|| termios.assume_init())
        };
        Self(captured)
    }

    fn restore(&self) {
        if let Some(termios) = &self.0 {
            // SAFETY: `termios` came from tcgetattr on the same descriptor
            let rc = unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, termios) };
            if rc != 0 {
                warn!(
                    "Could not restore terminal modes: {}",
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

#[cfg(not(unix))]
struct TerminalModes;

#[cfg(not(unix))]
impl TerminalModes {
    fn capture() -> Self {
        TerminalModes
    }

    fn restore(&self) {}
}

fn editor_thread(
    history: Option<PathBuf>,
    prompts: std_mpsc::Receiver<String>,
    lines: mpsc::UnboundedSender<ReadEvent>,
) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            let _ = lines.send(ReadEvent::Failed(e.to_string()));
            return;
        }
    };

    if let Some(path) = &history {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if editor.load_history(path).is_err() {
            debug!("No readline history at {}", path.display());
        }
    }

    while let Ok(prompt) = prompts.recv() {
        let event = match editor.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.trim());
                }
                ReadEvent::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadEvent::Interrupted,
            Err(ReadlineError::Eof) => ReadEvent::Eof,
            Err(e) => ReadEvent::Failed(e.to_string()),
        };
        if lines.send(event).is_err() {
            break;
        }
    }

    if let Some(path) = &history
        && let Err(e) = editor.save_history(path)
    {
        warn!("Could not save history to {}: {}", path.display(), e);
    }
}
