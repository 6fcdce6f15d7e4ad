//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::{ColoredString, Colorize};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Text on an `#rrggbb` background; plain text if the color does not parse.
pub fn swatch(text: &str, html: &str) -> ColoredString {
    let channel = |i: usize| {
        html.get(i..i + 2)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
    };
    match (html.len(), channel(1), channel(3), channel(5)) {
        (7, Some(r), Some(g), Some(b)) => text.black().on_truecolor(r, g, b),
        _ => text.normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_bad_color_when_making_swatch_then_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(swatch("85%", "red").to_string(), "85%");
        assert_eq!(swatch("85%", "#B6E1CC").to_string(), "85%");
        colored::control::unset_override();
    }
}
