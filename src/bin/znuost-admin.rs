use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use reqwest::Url;
use std::sync::Arc;
use znuost::config::Config;
use znuost::models::ClickEvent;
use znuost::storage::{self, LinkStore, StorageError};

const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const CODE_LENGTH: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 8;

#[derive(Parser)]
#[command(name = "znuost-admin")]
#[command(about = "znuost link management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a short link
    Create {
        /// Destination URL
        destination: String,
        /// Short code (generated when omitted)
        #[arg(long)]
        code: Option<String>,
        /// Human-readable title
        #[arg(long)]
        title: Option<String>,
    },
    /// List links, newest first
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
    /// Flip a link between active and inactive
    Toggle {
        /// Short code
        code: String,
    },
    /// Show click breakdowns for a link
    Stats {
        /// Short code
        code: String,
    },
}

fn generate_short_code() -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rand::random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

async fn create(
    store: &Arc<dyn LinkStore>,
    destination: &str,
    code: Option<String>,
    title: Option<&str>,
) -> Result<()> {
    if destination.trim().is_empty() {
        bail!("destination URL cannot be empty");
    }

    let link = match code {
        Some(code) => match store.create_link(&code, destination, title).await {
            Err(StorageError::Conflict) => bail!("short code '{code}' already exists"),
            other => other?,
        },
        None => {
            let mut attempts = 0;
            loop {
                attempts += 1;
                match store
                    .create_link(&generate_short_code(), destination, title)
                    .await
                {
                    Err(StorageError::Conflict) if attempts < MAX_CODE_ATTEMPTS => continue,
                    Err(StorageError::Conflict) => {
                        bail!("could not find a free short code after {attempts} attempts")
                    }
                    other => break other?,
                }
            }
        }
    };

    println!("✓ Created /l/{} -> {}", link.short_code, link.destination_url);
    Ok(())
}

async fn toggle(store: &Arc<dyn LinkStore>, code: &str) -> Result<()> {
    let link = store
        .get_by_code(code)
        .await?
        .with_context(|| format!("no link with short code '{code}'"))?;

    let active = !link.active;
    store.set_active(link.id, active).await?;
    println!(
        "✓ /l/{} is now {}",
        link.short_code,
        if active { "active" } else { "inactive" }
    );
    Ok(())
}

fn breakdown<F>(clicks: &[ClickEvent], label: F) -> Vec<(String, usize)>
where
    F: Fn(&ClickEvent) -> String,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for click in clicks {
        *counts.entry(label(click)).or_insert(0) += 1;
    }

    let mut rows: Vec<(String, usize)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

/// Referrers are grouped by host; `direct` visits show as "Direct"
fn referrer_label(referrer: &str) -> String {
    if referrer == "direct" {
        return "Direct".to_string();
    }

    Url::parse(referrer)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| referrer.to_string())
}

async fn stats(store: &Arc<dyn LinkStore>, code: &str) -> Result<()> {
    let link = store
        .get_by_code(code)
        .await?
        .with_context(|| format!("no link with short code '{code}'"))?;
    let clicks = store.list_clicks(link.id, i64::MAX).await?;

    println!("/l/{} -> {}", link.short_code, link.destination_url);
    println!("Counter: {}  Recorded clicks: {}", link.total_clicks, clicks.len());

    let sections: [(&str, fn(&ClickEvent) -> String); 6] = [
        ("Device", |c| c.device_type.clone()),
        ("Browser", |c| c.browser.clone()),
        ("OS", |c| c.os.clone()),
        ("Referrer", |c| referrer_label(&c.referrer)),
        ("Country", |c| c.country.clone()),
        ("City", |c| c.city.clone()),
    ];

    for (title, field) in sections {
        println!();
        println!("{title}");
        println!("{}", "-".repeat(40));
        for (label, count) in breakdown(&clicks, field) {
            println!("{:<30} {:>9}", label, count);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = storage::connect(&config.database).await?;

    match cli.command {
        Commands::Create {
            destination,
            code,
            title,
        } => create(&store, &destination, code, title.as_deref()).await?,
        Commands::List { limit, offset } => {
            let links = store.list_links(limit, offset).await?;
            if links.is_empty() {
                println!("No links found.");
            } else {
                println!("{:<12} {:<8} {:>8}  {}", "Code", "Status", "Clicks", "Destination");
                println!("{}", "-".repeat(80));
                for link in links {
                    println!(
                        "{:<12} {:<8} {:>8}  {}",
                        link.short_code,
                        if link.active { "active" } else { "off" },
                        link.total_clicks,
                        link.destination_url
                    );
                }
            }
        }
        Commands::Toggle { code } => toggle(&store, &code).await?,
        Commands::Stats { code } => stats(&store, &code).await?,
    }

    Ok(())
}
