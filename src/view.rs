//! Plain-text rendering of the conversation for the terminal front end.

use crate::rate_limit::{Remaining, minutes_until};
use crate::types::{Message, Origin};
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

pub const FAILURE_NOTICE: &str = "Failed to generate a response. Please try again.";

pub const HELP: &str = "\
Commands:
  /attach <path>     attach a photo of your ticket
  /clear             discard the attached photo
  /analyze [prompt]  ask for a read-out of the attached photo
  /remaining         show how many messages are left this hour
  /help              show this help
  /quit              leave";

pub fn format_message_timestamp(timestamp: OffsetDateTime) -> Option<String> {
    let mut datetime = timestamp;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    datetime.format(MESSAGE_TIME_FORMAT).ok()
}

fn speaker(origin: Origin) -> &'static str {
    match origin {
        Origin::User => "You",
        Origin::Assistant => "Assistant",
    }
}

pub fn render_message(message: &Message) -> String {
    let time = format_message_timestamp(message.sent_at()).unwrap_or_default();
    format!("[{time}] {}: {}", speaker(message.origin()), message.content())
}

pub fn render_remaining(remaining: &Remaining, now_ms: i64) -> String {
    if remaining.reset_time == 0 {
        return format!("{} messages left this hour.", remaining.count);
    }
    let minutes = minutes_until(remaining.reset_time, now_ms);
    format!("{} messages left; the counter resets in {minutes} minutes.", remaining.count)
}

/// Shown once the hourly quota is used up.
pub fn render_limit_notice(remaining: &Remaining, now_ms: i64) -> Option<String> {
    if remaining.count > 0 || remaining.reset_time == 0 {
        return None;
    }
    let minutes = minutes_until(remaining.reset_time, now_ms);
    Some(format!("Rate limit reached. You can send more messages in {minutes} minutes."))
}

/// A line of user input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Attach(&'a str),
    Clear,
    Analyze(Option<&'a str>),
    Remaining,
    Help,
    Quit,
    Say(&'a str),
}

pub fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };
    match head {
        "/attach" => Command::Attach(rest),
        "/clear" => Command::Clear,
        "/analyze" => Command::Analyze((!rest.is_empty()).then_some(rest)),
        "/remaining" => Command::Remaining,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Say(trimmed),
    }
}
