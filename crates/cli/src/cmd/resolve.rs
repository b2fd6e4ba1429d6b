//! Show how folder phrases resolve

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rts_core::PathResolver;

pub async fn run(phrases: &[String]) -> Result<()> {
    let resolver = PathResolver::default();

    for phrase in phrases {
        let resolved = resolver
            .resolve(phrase)
            .with_context(|| format!("Cannot resolve \"{}\"", phrase))?;

        if resolved.is_empty() {
            println!("{} {}", phrase.yellow(), "(empty)".dimmed());
            continue;
        }
        println!("{} → {}", phrase.yellow(), resolved.to_string().cyan());

        for alias in resolver.aliases(phrase) {
            println!("  {} {}", "alias".dimmed(), alias);
        }
    }

    Ok(())
}
