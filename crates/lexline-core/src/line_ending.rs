//! Line terminators.
//!
//! Documents keep the terminator of every line so `Document::text` reproduces the input
//! exactly and absolute indices account for `"\r\n"` as two characters.

/// The terminator that ends a stored line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LineEnding {
    /// No terminator (the last line of a document).
    #[default]
    None,
    /// Unix-style LF (`'\n'`).
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// Width of the terminator in characters.
    pub const fn width(self) -> usize {
        match self {
            Self::None => 0,
            Self::Lf => 1,
            Self::Crlf => 2,
        }
    }

    /// The terminator text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

/// Split text into `(line_text, terminator)` pairs.
///
/// The final element always has [`LineEnding::None`] (it is empty when `text` ends with a
/// terminator), so the result is never empty.
pub fn split_lines(text: &str) -> Vec<(&str, LineEnding)> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find('\n') {
        let (line, ending) = match rest[..pos].strip_suffix('\r') {
            Some(stripped) => (stripped, LineEnding::Crlf),
            None => (&rest[..pos], LineEnding::Lf),
        };
        out.push((line, ending));
        rest = &rest[pos + 1..];
    }
    out.push((rest, LineEnding::None));
    out
}
