use crate::error::Result;
use crate::migrate::MigrationSummary;
use crate::model::Light;
use clap::ValueEnum;
use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() > max_len {
        let truncated: String = name.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    } else {
        name.to_string()
    }
}

pub fn print_lights(lights: &[&Light], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(lights)?),
        Format::Pretty => {
            for light in lights {
                println!("[{}] {}", light.legacy_id, light.name.bold());
                match &light.guid {
                    Some(guid) => println!("  v2 id: {}", guid),
                    None => println!("  v2 id: {}", "none".yellow()),
                }
                if let Some(ref mode) = light.startup_mode {
                    println!("  startup: {}", mode);
                }
            }
        }
        Format::Minimal => {
            println!("{:>4} {:20} {:36} STARTUP", "ID", "NAME", "V2 ID");
            println!("{}", "-".repeat(72));
            for light in lights {
                println!(
                    "{:>4} {:20} {:36} {}",
                    light.legacy_id,
                    truncate_name(&light.name, 20),
                    light.guid.as_deref().unwrap_or("-"),
                    light.startup_mode.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

pub fn print_summary(summary: &MigrationSummary, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        Format::Pretty => {
            let heading = if summary.dry_run {
                "Migration summary (dry run)"
            } else {
                "Migration summary"
            };
            println!("{}", heading.bold());
            println!(
                "  {} \"{}\" -> {} \"{}\" ({})",
                summary.old.legacy_id,
                summary.old.name,
                summary.new.legacy_id,
                summary.new.name,
                summary.mode
            );
            for (label, counts) in summary.rows() {
                let failed = if counts.failed > 0 {
                    counts.failed.to_string().red().bold().to_string()
                } else {
                    counts.failed.to_string()
                };
                println!(
                    "  {:20} {} updated, {} skipped, {} failed",
                    label,
                    counts.updated.to_string().green(),
                    counts.skipped,
                    failed
                );
            }
            if summary.scenes_unreadable > 0 {
                println!(
                    "  {:20} {}",
                    "unreadable scenes",
                    summary.scenes_unreadable.to_string().yellow()
                );
            }
            println!(
                "  {} warnings, {} errors",
                summary.warnings.to_string().yellow(),
                summary.errors
            );
            println!(
                "{}",
                "This lists what was attempted; check groups, scenes and automations in the app."
                    .dimmed()
            );
        }
        Format::Minimal => {
            for (label, counts) in summary.rows() {
                println!(
                    "{}\t{}\t{}\t{}",
                    label, counts.updated, counts.skipped, counts.failed
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_name_adds_ellipsis_only_when_needed() {
        assert_eq!(truncate_name("Lamp", 20), "Lamp");
        assert_eq!(truncate_name("Living room ceiling spot", 10), "Living ...");
    }
}
