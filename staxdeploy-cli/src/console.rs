//! Terminal prompting and upload progress display.

use std::io;

use console::Term;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use staxdeploy::deployer::{ProgressEvent, ProgressSink};
use staxdeploy::identity::InputProvider;

/// Prompts on the terminal through dialoguer.
pub struct ConsoleInput {
    term: Term,
}

impl ConsoleInput {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for ConsoleInput {
    fn default() -> Self {
        Self::new()
    }
}

/// dialoguer appends its own `: ` separator.
fn prompt_label(message: &str) -> &str {
    message.trim_end().trim_end_matches(':')
}

impl InputProvider for ConsoleInput {
    fn prompt(&mut self, message: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt_label(message))
            .allow_empty(true)
            .interact_text_on(&self.term)
            .map_err(io::Error::from)
    }

    fn prompt_secret(&mut self, message: &str) -> io::Result<String> {
        Password::new()
            .with_prompt(prompt_label(message))
            .allow_empty_password(true)
            .interact_on(&self.term)
            .map_err(io::Error::from)
    }
}

/// Upload progress bar, created on the first event.
#[derive(Default)]
pub struct ProgressBarSink {
    bar: Option<ProgressBar>,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_bar(total: u64) -> ProgressBar {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} Uploading [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar
    }

    /// Remove the bar from the terminal.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressSink for ProgressBarSink {
    fn bytes_written(&mut self, event: ProgressEvent) {
        let bar = self
            .bar
            .get_or_insert_with(|| Self::create_bar(event.expected_total_bytes));
        // Multipart framing pushes the written total past the file bytes.
        bar.set_position(event.total_bytes_written.min(event.expected_total_bytes));
    }
}
