//! Formatted output utilities.

use console::style;

/// Print a success message with checkmark.
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message with X.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    println!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header/section title.
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair.
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).bold(), value);
}

/// Print an enabled/disabled flag as a key-value pair.
pub fn flag(key: &str, enabled: bool) {
    let value = if enabled {
        style("enabled").green()
    } else {
        style("disabled").dim()
    };
    println!("  {}: {}", style(key).bold(), value);
}

/// Print the Memoreal banner.
pub fn banner() {
    println!(
        "{}",
        style(
            r"
  __  __                                  _
 |  \/  | ___ _ __ ___   ___  _ __ ___  __ _| |
 | |\/| |/ _ \ '_ ` _ \ / _ \| '__/ _ \/ _` | |
 | |  | |  __/ | | | | | (_) | | |  __/ (_| | |
 |_|  |_|\___|_| |_| |_|\___/|_|  \___|\__,_|_|
"
        )
        .cyan()
    );
}
