//! Labelled operator output.
//!
//! Diagnostics go through `log`; these helpers are for the lines an operator
//! is meant to read regardless of verbosity.

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Error,
    Warn,
    Success,
}

pub fn error(message: impl AsRef<str>) {
    println!("{}", line(Label::Error, message.as_ref()));
}

pub fn warn(message: impl AsRef<str>) {
    println!("{}", line(Label::Warn, message.as_ref()));
}

pub fn success(message: impl AsRef<str>) {
    println!("{}", line(Label::Success, message.as_ref()));
}

/// Blank separator printed before a root operation's final verdict.
pub fn separator() {
    println!();
}

fn line(label: Label, message: &str) -> String {
    let label = match label {
        Label::Error => "ERROR".white().on_red().bold(),
        Label::Warn => "WARN".white().on_magenta().bold(),
        Label::Success => "SUCCESS".white().on_green().bold(),
    };
    format!("{} {}", label, message)
}
