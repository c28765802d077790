//! Cleans lines captured from the external CLI before they are parsed or shown.
//!
//! The CLI colours its tables when it thinks it is talking to a terminal, and
//! some versions emit OSC title sequences. Both would break the row patterns,
//! so every captured line passes through [`clean_line`].

/// Upper bound on the characters kept from a single line.
pub const MAX_LINE_CHARS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    Plain,
    Start,
    Csi,
    Osc,
    OscMaybeEnd,
    String,
    StringMaybeEnd,
}

impl Escape {
    /// Advance the escape state by one char. Returns true if `c` is visible text.
    fn step(&mut self, c: char) -> bool {
        *self = match (*self, c) {
            (Escape::Plain, '\x1b') => Escape::Start,
            (Escape::Plain, _) => return true,

            (Escape::Start, '[') => Escape::Csi,
            (Escape::Start, ']') => Escape::Osc,
            (Escape::Start, 'P' | 'X' | '^' | '_') => Escape::String,
            (Escape::Start, _) => Escape::Plain,

            (Escape::Csi, '@'..='~') => Escape::Plain,
            (Escape::Csi, _) => Escape::Csi,

            (Escape::Osc, '\x07') => Escape::Plain,
            (Escape::Osc, '\x1b') => Escape::OscMaybeEnd,
            (Escape::Osc, _) => Escape::Osc,
            (Escape::OscMaybeEnd, '\\') => Escape::Plain,
            (Escape::OscMaybeEnd, '\x1b') => Escape::OscMaybeEnd,
            (Escape::OscMaybeEnd, _) => Escape::Osc,

            (Escape::String, '\x1b') => Escape::StringMaybeEnd,
            (Escape::String, _) => Escape::String,
            (Escape::StringMaybeEnd, '\\') => Escape::Plain,
            (Escape::StringMaybeEnd, '\x1b') => Escape::StringMaybeEnd,
            (Escape::StringMaybeEnd, _) => Escape::String,
        };
        false
    }
}

/// Strip ANSI/OSC/DCS sequences, control chars and bidi overrides from one line.
/// Tabs become a single space so column splitting keeps working.
pub fn clean_line(input: &str) -> String {
    let mut state = Escape::Plain;
    let mut out = String::with_capacity(input.len().min(MAX_LINE_CHARS));
    let mut kept = 0usize;

    for c in input.chars() {
        if !state.step(c) {
            continue;
        }
        let c = match c {
            '\t' => ' ',
            c if c.is_control() || is_bidi_control(c) => continue,
            c => c,
        };
        out.push(c);
        kept += 1;
        if kept >= MAX_LINE_CHARS {
            out.push_str(" ...[truncated]");
            break;
        }
    }
    out
}

fn is_bidi_control(c: char) -> bool {
    matches!(c, '\u{061C}' | '\u{200E}' | '\u{200F}')
        || ('\u{202A}'..='\u{202E}').contains(&c)
        || ('\u{2066}'..='\u{2069}').contains(&c)
}
