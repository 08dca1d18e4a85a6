//! Colorful console output for the dashboard server.

use chrono::Utc;
use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::domain::OptimizationRecord;

/// Inner width of the summary box, in characters.
const BOX_WIDTH: usize = 58;

/// ASCII art banner for server startup.
pub fn print_banner() {
    let banner = r#"
  _                _     _   _
 | |    ___   __ _(_)___| |_(_) ___ ___
 | |   / _ \ / _` | / __| __| |/ __/ __|
 | |__| (_) | (_| | \__ \ |_| | (__\__ \
 |_____\___/ \__, |_|___/\__|_|\___|___/
             |___/
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Logistics Dashboard".bright_cyan()
    );
}

/// Prints record counts held by the store.
pub fn print_store_summary(shops: usize, drivers: usize, routes: usize, targets: usize) {
    println!(
        "{} {} {} Store: shops ({}), drivers ({}), routes ({}), targets ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Store]".bright_cyan(),
        shops.to_formatted_string(&Locale::en).bright_yellow(),
        drivers.to_formatted_string(&Locale::en).bright_yellow(),
        routes.to_formatted_string(&Locale::en).bright_yellow(),
        targets.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints a failed optimization run.
pub fn print_optimization_failed(route_id: u64, elapsed: Duration) {
    println!(
        "{} {} {} Route {} optimization failed after {}",
        timestamp().bright_black(),
        "WARN".bright_red(),
        "[Optimizer]".bright_cyan(),
        route_id.to_formatted_string(&Locale::en).bright_yellow(),
        format_duration(elapsed).yellow()
    );
}

/// Prints a completed optimization run with a summary box.
pub fn print_optimization_ended(route_name: &str, record: &OptimizationRecord, elapsed: Duration) {
    let result = &record.result;
    let improved = result.optimized_distance < result.original_distance;

    println!(
        "{} {} {} Route {} optimized: time spent ({}), stops ({}), distance ({} → {})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Optimizer]".bright_cyan(),
        record.route_id.to_formatted_string(&Locale::en).bright_yellow(),
        format_duration(elapsed).yellow(),
        result.optimized_order.len().to_formatted_string(&Locale::en).white(),
        format_km(result.original_distance).white(),
        format_km(result.optimized_distance).bright_magenta().bold()
    );

    println!();
    println!("{}", format!("╔{}╗", "═".repeat(BOX_WIDTH)).bright_cyan());

    let status_text = if improved {
        "✓ SHORTER ROUTE FOUND"
    } else {
        "= ROUTE ALREADY OPTIMAL"
    };
    let status_colored = if improved {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_yellow().bold().to_string()
    };
    let status_padding = BOX_WIDTH.saturating_sub(status_text.chars().count());
    let left_pad = status_padding / 2;
    let right_pad = status_padding - left_pad;
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    );

    println!("{}", format!("╠{}╣", "═".repeat(BOX_WIDTH)).bright_cyan());

    let name = truncate(route_name, 36);
    print_row("Route:", &name);
    print_row(
        "Distance Saved:",
        &format_km(result.original_distance - result.optimized_distance),
    );
    print_row("Time Saved:", &format!("{:.1} min", result.time_saved));
    print_row("Fuel Saved:", &format!("{:.2} L", result.fuel_saved));

    println!("{}", format!("╚{}╝", "═".repeat(BOX_WIDTH)).bright_cyan());
    println!();
}

fn print_row(label: &str, value: &str) {
    println!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        label,
        value,
        "║".bright_cyan()
    );
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Formats a distance in kilometres.
fn format_km(km: f64) -> String {
    format!("{km:.2} km")
}

/// Formats a duration nicely.
fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Returns a wall-clock timestamp string.
fn timestamp() -> String {
    Utc::now().format("%H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Westlands loop", 36), "Westlands loop");
        let long = "x".repeat(40);
        let short = truncate(&long, 10);
        assert_eq!(short.chars().count(), 10);
        assert!(short.ends_with('…'));
    }
}
