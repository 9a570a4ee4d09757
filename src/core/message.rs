//! Positional `{}` message templates
//!
//! Each unescaped `{}` pair is replaced by the next argument. A backslash
//! directly before a brace disables substitution for that pair; the backslash
//! itself is kept in the output. Placeholders left over once the arguments run
//! out are emitted verbatim, and surplus arguments are ignored.

use std::fmt::{self, Write};

const PLACEHOLDER_START: char = '{';
const PLACEHOLDER_STOP: char = '}';
const ESCAPE: char = '\\';

/// Render `template` against `args`.
///
/// # Examples
///
/// ```
/// use hierlog::core::format_message;
///
/// assert_eq!(format_message("{}; {}", &[&"a", &1]), "a; 1");
/// assert_eq!(format_message("{}; {}", &[&"a"]), "a; {}");
/// assert_eq!(format_message("\\{}", &[&"a"]), "\\{}");
/// ```
pub fn format_message(template: &str, args: &[&dyn fmt::Display]) -> String {
    if args.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut next_arg = 0;
    let mut prev_escape = false;
    let mut prev_start = false;

    for c in template.chars() {
        let mut cur_escape = false;
        let mut cur_start = false;
        let mut keep = true;

        match c {
            PLACEHOLDER_START => cur_start = !prev_escape,
            PLACEHOLDER_STOP => {
                if prev_start && next_arg < args.len() {
                    out.pop();
                    let _ = write!(out, "{}", args[next_arg]);
                    next_arg += 1;
                    keep = false;
                }
            }
            ESCAPE => cur_escape = !prev_escape,
            _ => {}
        }

        if keep {
            out.push(c);
        }
        prev_escape = cur_escape;
        prev_start = cur_start;
    }

    out
}
