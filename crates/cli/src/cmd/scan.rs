//! One-shot folder statistics

use anyhow::{Context, Result};
use cli_lib::ScanStats;
use owo_colors::OwoColorize;
use rts_core::{traverse_folder, LocalFs, PathResolver};

pub async fn run(dir: &str, follow_symlinks: bool) -> Result<()> {
    // 1. Resolve the folder phrase
    let root = PathResolver::default()
        .resolve(dir)
        .with_context(|| format!("Cannot resolve \"{}\"", dir))?;
    if root.is_empty() {
        anyhow::bail!("No folder given");
    }

    // 2. Walk it off the async runtime
    let path = root.clone().into_path_buf();
    let stats = tokio::task::spawn_blocking(move || {
        let mut stats = ScanStats::new(follow_symlinks);
        traverse_folder(&LocalFs, &path, &mut stats);
        stats
    })
    .await
    .context("Scan task failed")?;

    // 3. Report
    println!("{} {}", "Scanned".bold(), root.to_string().cyan());
    println!("  Files:       {}", stats.files);
    println!("  Folders:     {}", stats.dirs);
    println!("  Symlinks:    {}", stats.symlinks);
    println!("  Total size:  {}", format_size(stats.total_bytes));

    if !stats.errors.is_empty() {
        println!();
        println!("{} {} error(s)", "✗".red(), stats.errors.len());
        for err in &stats.errors {
            println!("  {}", err.red());
        }
    }

    Ok(())
}

/// Format byte count as human-readable size
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}
