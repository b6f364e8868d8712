//! View models: the state a screen shows and the actions it dispatches,
//! with no rendering attached.

pub mod community;
pub mod post_card;
pub mod profile;
pub mod settings;

use std::sync::OnceLock;

use chrono::{Duration, NaiveDateTime, Utc};
use regex::Regex;

use crate::models::parse_timestamp;

pub use self::community::{CommunityDetail, CommunityEntry, CommunityList};
pub use self::post_card::PostCard;
pub use self::profile::ProfileView;
pub use self::settings::{SettingsError, SettingsView};

/// Result of an action that needs a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<T> {
    Done(T),
    /// Nothing was sent, e.g. the same action is already in flight.
    Ignored,
    /// Not signed in; send the user to this login URL.
    NeedsLogin(String),
}

/// `/login?redirect=<encoded target>`.
pub fn login_redirect(target: &str) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", target)
        .finish();
    format!("/login?{}", query)
}

/// A run of post content: plain text or a `#hashtag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Hashtag(String),
}

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#[a-zA-Z0-9_]+").expect("static hashtag regex"))
}

/// Split content into text and hashtag runs, in order. Empty text runs
/// are dropped.
pub fn segments(content: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in hashtag_regex().find_iter(content) {
        if m.start() > last {
            out.push(Segment::Text(content[last..m.start()].to_string()));
        }
        out.push(Segment::Hashtag(m.as_str().to_string()));
        last = m.end();
    }
    if last < content.len() {
        out.push(Segment::Text(content[last..].to_string()));
    }
    out
}

/// Route for a hashtag page, with or without the leading `#`.
pub fn hashtag_route(tag: &str) -> String {
    format!("/hashtag/{}", tag.strip_prefix('#').unwrap_or(tag))
}

/// Age of a post relative to `now`: `just now`, `5m ago`, `3h ago`, `2d ago`,
/// then the calendar date once it is a week old. A timestamp more than a
/// minute in the future (server clock ahead of ours) also shows the date.
pub fn relative_label(posted: NaiveDateTime, now: NaiveDateTime) -> String {
    let age = now.signed_duration_since(posted);
    let date = || posted.format("%b %-d, %Y").to_string();

    if age < -Duration::minutes(1) {
        return date();
    }
    if age < Duration::minutes(1) {
        return "just now".to_string();
    }
    if age < Duration::hours(1) {
        return format!("{}m ago", age.num_minutes());
    }
    if age < Duration::days(1) {
        return format!("{}h ago", age.num_hours());
    }
    if age < Duration::weeks(1) {
        return format!("{}d ago", age.num_days());
    }
    date()
}

/// Relative label for a backend timestamp; unparseable input comes back
/// unchanged.
pub fn parse_and_format_time(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| relative_label(dt, Utc::now().naive_utc()))
        .unwrap_or_else(|| raw.to_string())
}
