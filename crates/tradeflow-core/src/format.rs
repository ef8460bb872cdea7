//! Rendering of enriched output lines.

use std::fmt::Write as _;

use crate::domain::{ResolvedName, TradeRecord};

/// First line of every enriched output.
pub const HEADER: &str = "date,productName,currency,price\n";

/// Terminator appended to every output line.
pub const LINE_TERMINATOR: char = '\n';

/// Render `date,productName,currency,price` plus the line terminator.
pub fn format_line(record: &TradeRecord, name: &ResolvedName) -> String {
    let mut line = String::with_capacity(32 + record.currency().len() + name.as_str().len());
    // Writing into a String cannot fail.
    let _ = write!(
        line,
        "{},{},{},{}{}",
        record.date(),
        name,
        record.currency(),
        record.price(),
        LINE_TERMINATOR
    );
    line
}
