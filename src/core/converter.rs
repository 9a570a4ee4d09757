//! Converter nodes produced by the layout compiler

use super::logging_event::LoggingEvent;
use super::timestamp::TimestampFormat;
use std::borrow::Cow;
use std::path::Path;

/// Side on which rendered text is anchored when it is padded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// `%-10p`: text first, spaces after
    Left,
    /// `%10p`: spaces first, text after
    #[default]
    Right,
}

/// What a converter renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterKind {
    Literal(String),
    Level,
    LoggerName,
    Date(TimestampFormat),
    /// `file:line` of the call site, file reduced to its base name
    Location,
    Message,
    Newline,
}

/// One step of a compiled layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    pub kind: ConverterKind,
    pub alignment: Alignment,
    pub width: Option<usize>,
}

impl Converter {
    pub fn new(kind: ConverterKind) -> Self {
        Self {
            kind,
            alignment: Alignment::default(),
            width: None,
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(ConverterKind::Literal(text.into()))
    }

    #[must_use]
    pub fn aligned(mut self, alignment: Alignment, width: Option<usize>) -> Self {
        self.alignment = alignment;
        self.width = width;
        self
    }

    /// Append this node's rendering of `event` to `out`
    pub fn render_into(&self, event: &LoggingEvent<'_>, out: &mut String) {
        match &self.kind {
            ConverterKind::Literal(text) => out.push_str(text),
            ConverterKind::Newline => out.push('\n'),
            ConverterKind::Level => self.push_fitted(event.level().to_str(), out),
            ConverterKind::LoggerName => self.push_fitted(event.logger_name(), out),
            ConverterKind::Date(format) => {
                self.push_fitted(&format.format(event.timestamp()), out)
            }
            ConverterKind::Location => {
                let file = Path::new(event.file())
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(event.file());
                self.push_fitted(&format!("{}:{}", file, event.line()), out)
            }
            ConverterKind::Message => self.push_fitted(event.formatted_message(), out),
        }
    }

    fn push_fitted(&self, text: &str, out: &mut String) {
        out.push_str(&fit(text, self.alignment, self.width));
    }
}

/// Pad or truncate `text` to exactly `width` code points.
///
/// Text that is already at least `width` long is cut to its first `width`
/// code points. Without a width the text passes through unchanged.
pub fn fit(text: &str, alignment: Alignment, width: Option<usize>) -> Cow<'_, str> {
    let Some(width) = width else {
        return Cow::Borrowed(text);
    };

    let len = text.chars().count();
    if len >= width {
        return match text.char_indices().nth(width) {
            Some((cut, _)) => Cow::Owned(text[..cut].to_string()),
            None => Cow::Borrowed(text),
        };
    }

    let padding = " ".repeat(width - len);
    let padded = match alignment {
        Alignment::Left => format!("{}{}", text, padding),
        Alignment::Right => format!("{}{}", padding, text),
    };
    Cow::Owned(padded)
}
