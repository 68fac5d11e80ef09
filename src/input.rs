/// Terminal Input Module
///
/// The session reads through the [`LineSource`] trait and never assumes
/// which strategy sits behind it: a raw byte-at-a-time reader that does its
/// own echo and erase, or a full line editor with history.

use crate::core::Result;
use reedline::{
    FileBackedHistory, Prompt, PromptEditMode, PromptHistorySearch, Reedline, Signal,
};
use std::borrow::Cow;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::warn;

/// Result of a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// The user abandoned the current input (Ctrl-C)
    Interrupted,
    EndOfInput,
}

/// A source of input lines.
pub trait LineSource {
    /// Blocks until a line, an interrupt or end of input is available.
    fn read_line(&mut self) -> Result<ReadOutcome>;

    /// Prompt shown for the next read. Advisory only.
    fn set_prompt(&mut self, prompt: &str);
}

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const BACKSPACE: u8 = 0x08;
const TAB: u8 = 0x09;
const DELETE: u8 = 0x7f;

/// Byte-at-a-time reader.
///
/// Prompts and keystroke echo are written to `output` independently:
/// a raw terminal wants both, a cooked terminal (which echoes by itself)
/// wants only the prompt, and piped input wants neither.
pub struct RawLineSource<R: Read, W: Write> {
    input: R,
    output: W,
    show_prompt: bool,
    echo: bool,
    prompt: String,
    /// Set after a CR so an immediately following LF is not read as an empty line
    swallow_lf: bool,
}

impl<R: Read, W: Write> RawLineSource<R, W> {
    /// A silent reader: no prompt, no echo.
    pub fn new(input: R, output: W) -> Self {
        RawLineSource {
            input,
            output,
            show_prompt: false,
            echo: false,
            prompt: String::new(),
            swallow_lf: false,
        }
    }

    pub fn with_prompt(mut self, on: bool) -> Self {
        self.show_prompt = on;
        self
    }

    /// Echo typed characters and erase them again on backspace.
    pub fn with_echo(mut self, on: bool) -> Self {
        self.echo = on;
        self
    }

    fn write_out(&mut self, bytes: &[u8]) -> Result<()> {
        self.output.write_all(bytes)?;
        self.output.flush()?;
        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        if self.echo {
            self.write_out(bytes)?;
        }
        Ok(())
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Removes the last UTF-8 character from a byte buffer.
fn pop_char(line: &mut Vec<u8>) {
    while let Some(byte) = line.pop() {
        if byte & 0b1100_0000 != 0b1000_0000 {
            break;
        }
    }
}

impl<R: Read, W: Write> LineSource for RawLineSource<R, W> {
    fn read_line(&mut self) -> Result<ReadOutcome> {
        if self.show_prompt {
            let prompt = std::mem::take(&mut self.prompt);
            let written = self.write_out(prompt.as_bytes());
            self.prompt = prompt;
            written?;
        }

        let mut line: Vec<u8> = Vec::new();
        loop {
            let Some(byte) = self.next_byte()? else {
                if line.is_empty() {
                    return Ok(ReadOutcome::EndOfInput);
                }
                return Ok(ReadOutcome::Line(String::from_utf8_lossy(&line).into_owned()));
            };

            let after_cr = std::mem::replace(&mut self.swallow_lf, false);
            match byte {
                b'\n' if after_cr => continue,
                b'\n' | b'\r' => {
                    self.swallow_lf = byte == b'\r';
                    self.emit(b"\r\n")?;
                    return Ok(ReadOutcome::Line(String::from_utf8_lossy(&line).into_owned()));
                }
                BACKSPACE | DELETE => {
                    if !line.is_empty() {
                        pop_char(&mut line);
                        self.emit(b"\x08 \x08")?;
                    }
                }
                CTRL_C => {
                    self.emit(b"^C\r\n")?;
                    return Ok(ReadOutcome::Interrupted);
                }
                CTRL_D if line.is_empty() => return Ok(ReadOutcome::EndOfInput),
                TAB | 0x20..=0x7e => {
                    line.push(byte);
                    self.emit(&[byte])?;
                }
                0x80..=0xff => {
                    line.push(byte);
                    self.emit(&[byte])?;
                }
                _ => {}
            }
        }
    }

    fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }
}

/// Prompt adapter for reedline: the whole prompt is the left segment.
#[derive(Debug, Clone, Default)]
pub struct SessionPrompt {
    text: String,
}

impl Prompt for SessionPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        Cow::Owned(format!("(history search: {}) ", history_search.term))
    }
}

/// Line editor backed by reedline, with optional file-backed history.
pub struct ReedlineSource {
    editor: Reedline,
    prompt: SessionPrompt,
}

impl ReedlineSource {
    pub fn new(history_file: Option<PathBuf>, history_size: usize) -> Self {
        let mut editor = Reedline::create();
        if let Some(path) = history_file {
            match FileBackedHistory::with_file(history_size, path.clone()) {
                Ok(history) => editor = editor.with_history(Box::new(history)),
                Err(e) => warn!(path = %path.display(), error = %e, "history disabled"),
            }
        }
        ReedlineSource {
            editor,
            prompt: SessionPrompt::default(),
        }
    }
}

impl LineSource for ReedlineSource {
    fn read_line(&mut self) -> Result<ReadOutcome> {
        match self.editor.read_line(&self.prompt)? {
            Signal::Success(line) => Ok(ReadOutcome::Line(line)),
            Signal::CtrlC => Ok(ReadOutcome::Interrupted),
            Signal::CtrlD => Ok(ReadOutcome::EndOfInput),
            #[allow(unreachable_patterns)]
            _ => Ok(ReadOutcome::Interrupted),
        }
    }

    fn set_prompt(&mut self, prompt: &str) {
        self.prompt.text = prompt.to_string();
    }
}
