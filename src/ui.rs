use colored::Colorize;
use reconcile::ActionOutcome;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Symbol for an outcome: changed or already converged
pub fn outcome_symbol(outcome: &ActionOutcome) -> &'static str {
    if outcome.changed { "✓" } else { "○" }
}

/// Print one applied operation
pub fn outcome(id: &str, outcome: &ActionOutcome) {
    let symbol = outcome_symbol(outcome);
    let symbol = if outcome.changed {
        symbol.green()
    } else {
        symbol.dimmed()
    };
    println!(
        "  {} {} {} {}",
        symbol,
        format!("[{}]", outcome.host).dimmed(),
        format!("{}:{}", outcome.kind, id).bold(),
        outcome.detail
    );
}

/// Print one failed operation
pub fn failure(kind: &str, id: &str, msg: &str) {
    eprintln!("  {} {} {}", "✗".red(), format!("{kind}:{id}").bold(), msg.red());
}
