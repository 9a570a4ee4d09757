//! Layout compiler
//!
//! A layout is literal text interleaved with `%` directives:
//!
//! ```text
//! %[-][width]keyword
//! ```
//!
//! | keyword                    | renders                          |
//! |----------------------------|----------------------------------|
//! | `c`, `lo`, `logger`        | logger name                      |
//! | `d{fmt}`, `date{fmt}`      | event timestamp                  |
//! | `L`, `line`                | `file:line` of the call site     |
//! | `p`, `le`, `level`         | level                            |
//! | `m`, `msg`, `message`      | formatted message                |
//! | `n`                        | newline                          |
//!
//! `-` left-aligns, otherwise text is right-aligned; the width pads or
//! truncates to exactly that many code points. Anything outside this
//! vocabulary fails compilation.
//!
//! Spellings are matched longest first, so `%level` is the level and not
//! `%le` followed by the literal `vel`.

use super::converter::{Alignment, Converter, ConverterKind};
use super::error::{LoggerError, Result};
use super::logging_event::LoggingEvent;
use super::timestamp::TimestampFormat;

const DIRECTIVE: char = '%';
const LEFT_ALIGN: char = '-';
const SUB_PATTERN_START: char = '{';
const SUB_PATTERN_STOP: char = '}';

/// Layout used when an appender is built without one
pub const DEFAULT_LAYOUT: &str = "%d{%Y-%m-%d %H:%M:%S%.3f} [%p] %m%n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    LoggerName,
    Date,
    Location,
    Level,
    Message,
    Newline,
}

// Longer spellings come first so that `%date` is not read as `%d` + "ate".
const KEYWORDS: &[(Keyword, &[&str])] = &[
    (Keyword::LoggerName, &["logger", "lo", "c"]),
    (Keyword::Date, &["date", "d"]),
    (Keyword::Location, &["line", "L"]),
    (Keyword::Level, &["level", "le", "p"]),
    (Keyword::Message, &["message", "msg", "m"]),
    (Keyword::Newline, &["n"]),
];

/// A compiled layout.
///
/// # Examples
///
/// ```
/// use hierlog::core::{LogLevel, LoggingEvent, PatternEncoder};
///
/// let encoder = PatternEncoder::compile("[%-5p] %c: %m%n").unwrap();
/// let event = LoggingEvent::new("db", LogLevel::Info, "connected in {}ms", &[&12]);
/// assert_eq!(encoder.encode_to_string(&event), "[INFO ] db: connected in 12ms\n");
///
/// assert!(PatternEncoder::compile("%x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEncoder {
    layout: String,
    chain: Vec<Converter>,
}

impl PatternEncoder {
    /// Compile `layout` into a converter chain.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidLayout`] for an unknown keyword, a dangling
    /// `%`, an oversized width, or a missing/unterminated/invalid `{...}`
    /// timestamp sub-pattern.
    pub fn compile(layout: &str) -> Result<Self> {
        let chain = Compiler::new(layout).run()?;
        Ok(Self {
            layout: layout.to_string(),
            chain,
        })
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    pub fn converters(&self) -> &[Converter] {
        &self.chain
    }

    /// Render `event` by walking the chain once.
    pub fn encode(&self, event: &LoggingEvent<'_>) -> Vec<u8> {
        self.encode_to_string(event).into_bytes()
    }

    pub fn encode_to_string(&self, event: &LoggingEvent<'_>) -> String {
        let mut out = String::with_capacity(self.layout.len() + 64);
        for converter in &self.chain {
            converter.render_into(event, &mut out);
        }
        out
    }
}

struct Compiler<'a> {
    layout: &'a str,
    chars: Vec<char>,
    pos: usize,
    chain: Vec<Converter>,
}

impl<'a> Compiler<'a> {
    fn new(layout: &'a str) -> Self {
        Self {
            layout,
            chars: layout.chars().collect(),
            pos: 0,
            chain: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Converter>> {
        while self.pos < self.chars.len() {
            if self.chars[self.pos] == DIRECTIVE {
                self.directive()?;
            } else {
                self.literal();
            }
        }
        Ok(self.chain)
    }

    fn literal(&mut self) {
        let start = self.pos;
        while self.pos < self.chars.len() && self.chars[self.pos] != DIRECTIVE {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.chain.push(Converter::literal(text));
    }

    fn directive(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;

        let alignment = if self.peek() == Some(LEFT_ALIGN) {
            self.pos += 1;
            Alignment::Left
        } else {
            Alignment::Right
        };
        let width = self.width()?;

        let keyword = self
            .keyword()
            .ok_or_else(|| self.error(format!("unsupported directive at offset {}", start)))?;

        let kind = match keyword {
            Keyword::LoggerName => ConverterKind::LoggerName,
            Keyword::Date => ConverterKind::Date(self.timestamp_format()?),
            Keyword::Location => ConverterKind::Location,
            Keyword::Level => ConverterKind::Level,
            Keyword::Message => ConverterKind::Message,
            Keyword::Newline => ConverterKind::Newline,
        };

        self.chain.push(Converter::new(kind).aligned(alignment, width));
        Ok(())
    }

    fn width(&mut self) -> Result<Option<usize>> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(None);
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse::<usize>()
            .map(Some)
            .map_err(|_| self.error(format!("width '{}' is out of range", digits)))
    }

    fn keyword(&mut self) -> Option<Keyword> {
        for (keyword, spellings) in KEYWORDS {
            for spelling in *spellings {
                if self.matches_word(spelling) {
                    self.pos += spelling.chars().count();
                    return Some(*keyword);
                }
            }
        }
        None
    }

    fn matches_word(&self, word: &str) -> bool {
        let mut pos = self.pos;
        for expected in word.chars() {
            if self.chars.get(pos) != Some(&expected) {
                return false;
            }
            pos += 1;
        }
        true
    }

    fn timestamp_format(&mut self) -> Result<TimestampFormat> {
        if self.peek() != Some(SUB_PATTERN_START) {
            return Err(self.error("date directive requires a {...} format"));
        }
        self.pos += 1;

        let start = self.pos;
        while self.pos < self.chars.len() && self.chars[self.pos] != SUB_PATTERN_STOP {
            self.pos += 1;
        }
        if self.pos >= self.chars.len() {
            return Err(self.error("unterminated date format"));
        }

        let pattern: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1;

        TimestampFormat::parse(&pattern)
            .map_err(|_| self.error(format!("invalid date format '{}'", pattern)))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> LoggerError {
        LoggerError::layout(self.layout, message)
    }
}
