use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use colored::*;
use relayscan_core::stats::RunSummary;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;
use crate::terminal::logging::PRINT_TARGET;

pub const TOTAL_WIDTH: usize = 64;
const KEY_WIDTH: usize = 11;
const TREE_KEY_WIDTH: usize = 13;

pub trait WithDefaultColor {
    fn with_default(self, default_color: Color) -> ColoredString;
}

impl WithDefaultColor for &str {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for String {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for ColoredString {
    fn with_default(self, _default_color: Color) -> ColoredString {
        self
    }
}

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

const BANNER: &[&str] = &[
    r"          _                                  ",
    r" _ __ ___| | __ _ _   _ ___  ___ __ _ _ __   ",
    r"| '__/ _ \ |/ _` | | | / __|/ __/ _` | '_ \  ",
    r"| | |  __/ | (_| | |_| \__ \ (_| (_| | | | | ",
    r"|_|  \___|_|\__,_|\__, |___/\___\__,_|_| |_| ",
    r"                  |___/                      ",
];

pub fn banner(quiet: bool) {
    if quiet {
        return;
    }

    let text_content: String = format!("⟦ RELAYSCAN v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2).bright_black();
    let output: String = format!("{}{}{}", sep, text, sep);

    print(&output);
    for line in BANNER {
        centerln(&line.color(colors::PRIMARY).to_string());
    }
}

pub fn header(msg: &str, quiet: bool) {
    if quiet {
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn aligned_line<V>(key: &str, value: V)
where
    V: Display + WithDefaultColor,
{
    let whitespace: String = ".".repeat((KEY_WIDTH + 1).saturating_sub(key.len()));
    let colon: String = format!(
        "{}{}",
        whitespace.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    );
    let value: ColoredString = value.with_default(colors::TEXT_DEFAULT);
    print_status(format!("{}{} {}", key.color(colors::PRIMARY), colon, value));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    let message: String = format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT));
    print(&message);
}

pub fn tree_head(idx: usize, name: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    let output: String = format!(
        "{} {}",
        idx_str.color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    );
    print(&output);
}

pub fn as_tree_one_level(key_value_pair: Vec<(String, ColoredString)>) {
    for (i, (key, value)) in key_value_pair.iter().enumerate() {
        let last: bool = i + 1 == key_value_pair.len();
        let branch: ColoredString = if !last {
            "├─".bright_black()
        } else {
            "└─".bright_black()
        };
        let dots: String = ".".repeat(TREE_KEY_WIDTH.saturating_sub(key.len()));
        let output: String = format!(
            " {} {}{}{} {}",
            branch,
            key.color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        );
        print(&output);
    }
}

/// Colors a failure counter only when something actually failed.
fn count(value: u64, bad: bool) -> ColoredString {
    let text: String = value.to_string();
    if bad && value > 0 {
        text.color(colors::FAILURE).bold()
    } else if bad {
        text.color(colors::SEPARATOR)
    } else {
        text.color(colors::SUCCESS).bold()
    }
}

pub fn run_summary(summary: &RunSummary, output: &Path, elapsed: Duration) {
    tree_head(1, "targets");
    as_tree_one_level(vec![
        ("queued".to_string(), count(summary.targets_queued, false)),
        ("rejected".to_string(), count(summary.targets_rejected, true)),
    ]);

    tree_head(2, "discovery");
    as_tree_one_level(vec![
        ("scanned".to_string(), count(summary.discovery_ok, false)),
        ("failed".to_string(), count(summary.discovery_failed, true)),
        ("jobs".to_string(), count(summary.jobs_queued, false)),
    ]);

    tree_head(3, "fingerprint");
    as_tree_one_level(vec![
        ("fingerprinted".to_string(), count(summary.fingerprint_ok, false)),
        ("failed".to_string(), count(summary.fingerprint_failed, true)),
        (
            "no ports".to_string(),
            summary.empty_jobs.to_string().color(colors::MUTED),
        ),
        ("parse errors".to_string(), count(summary.parse_errors, true)),
    ]);

    tree_head(4, "results");
    as_tree_one_level(vec![
        ("written".to_string(), count(summary.records_written, false)),
        ("failed".to_string(), count(summary.write_failures, true)),
        (
            "file".to_string(),
            output.display().to_string().color(colors::ACCENT),
        ),
        (
            "elapsed".to_string(),
            format!("{:.1}s", elapsed.as_secs_f64()).color(colors::TEXT_DEFAULT),
        ),
    ]);
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{}{}", space, msg));
}

pub fn no_results() {
    centerln(&format!("{}", "no services identified".red().bold()));
}

pub fn end_of_program() {
    print(&format!(
        "{}",
        "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR)
    ));
}
