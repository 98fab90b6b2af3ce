//! Date layout language used by website configurations
//!
//! A layout is free text with `{TOKEN}` placeholders, e.g.
//! `{MONTH_NAME} {DAY_NUM}, {YEAR_LONG}`. Layouts are translated once into a
//! chrono format string and then used to parse the date text of every article.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Placeholder tokens and the chrono items they stand for.
/// The flag marks tokens carrying a time of day.
const TOKENS: &[(&str, &str, bool)] = &[
    ("DAY_NUM", "%d", false),
    ("DAY_NAME", "%A", false),
    ("DAY_NAME_SHORT", "%a", false),
    ("MONTH_NUM", "%m", false),
    ("MONTH_NAME", "%B", false),
    ("MONTH_NAME_SHORT", "%b", false),
    ("YEAR_LONG", "%Y", false),
    ("YEAR_SHORT", "%y", false),
    ("HOUR", "%H", true),
    ("HOUR_12", "%I", true),
    ("AM_PM", "%p", true),
    ("MINUTE", "%M", true),
    ("SECOND", "%S", true),
];

/// Errors raised while compiling a date layout
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateFormatError {
    #[error("unknown placeholder {{{0}}}")]
    UnknownToken(String),

    #[error("unterminated placeholder in '{0}'")]
    Unterminated(String),
}

/// A compiled date layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    layout: String,
    has_time: bool,
}

impl DateFormat {
    /// Compiles a `{TOKEN}` layout into a chrono format
    ///
    /// # Examples
    ///
    /// ```
    /// use newswire::config::DateFormat;
    ///
    /// let format = DateFormat::new("{MONTH_NUM}-{DAY_NUM}-{YEAR_LONG}").unwrap();
    /// let date = format.parse("03-04-2021").unwrap();
    /// assert_eq!(date.date().to_string(), "2021-03-04");
    /// ```
    pub fn new(pattern: &str) -> Result<Self, DateFormatError> {
        let mut layout = String::with_capacity(pattern.len());
        let mut has_time = false;
        let mut rest = pattern;

        while let Some(start) = rest.find(['{', '%']) {
            let (literal, tail) = rest.split_at(start);
            layout.push_str(literal);

            if let Some(after) = tail.strip_prefix('%') {
                layout.push_str("%%");
                rest = after;
                continue;
            }

            let end = tail
                .find('}')
                .ok_or_else(|| DateFormatError::Unterminated(pattern.to_string()))?;
            let name = &tail[1..end];
            let (_, item, is_time) = TOKENS
                .iter()
                .find(|(token, _, _)| *token == name)
                .ok_or_else(|| DateFormatError::UnknownToken(name.to_string()))?;

            layout.push_str(item);
            has_time |= *is_time;
            rest = &tail[end + 1..];
        }
        layout.push_str(rest);

        Ok(Self {
            pattern: pattern.to_string(),
            layout,
            has_time,
        })
    }

    /// The layout as written in the configuration
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The translated chrono format string
    pub fn chrono_format(&self) -> &str {
        &self.layout
    }

    /// Parses date text; layouts without a time of day yield midnight
    pub fn parse(&self, text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        if self.has_time {
            NaiveDateTime::parse_from_str(text, &self.layout)
        } else {
            NaiveDate::parse_from_str(text, &self.layout).map(|d| d.and_time(NaiveTime::MIN))
        }
    }
}
