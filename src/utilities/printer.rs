//! Console printer with ANSI color support.

use serde::{Deserialize, Serialize};

/// Colors used for verbose agent output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterColor {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    BoldGreen,
    BoldYellow,
    BoldMagenta,
}

impl PrinterColor {
    /// ANSI escape code for this color.
    fn ansi_code(&self) -> &'static str {
        match self {
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Blue => "\x1b[34m",
            Self::Magenta => "\x1b[35m",
            Self::Cyan => "\x1b[36m",
            Self::BoldGreen => "\x1b[1;32m",
            Self::BoldYellow => "\x1b[1;33m",
            Self::BoldMagenta => "\x1b[1;35m",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Printer for console output with color support.
#[derive(Debug, Clone, Default)]
pub struct Printer;

impl Printer {
    pub fn new() -> Self {
        Self
    }

    /// Wrap `content` in the escape codes for `color`.
    pub fn paint(&self, content: &str, color: PrinterColor) -> String {
        format!("{}{}{}", color.ansi_code(), content, RESET)
    }

    /// Print a message with the specified color.
    pub fn print(&self, content: &str, color: PrinterColor) {
        println!("{}", self.paint(content, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_wraps_in_escape_codes() {
        let painted = Printer::new().paint("Thought", PrinterColor::Magenta);
        assert_eq!(painted, "\x1b[35mThought\x1b[0m");
    }
}
