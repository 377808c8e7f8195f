// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use podstash::{
    Health, Item, NoopReporter, ProgressEvent, ProgressReporter, RESERVED_NAME, ReqwestClient,
    SharedProgressReporter, Subscription, SubscriptionStore, add_subscription,
    check_subscriptions, default_store_path, diagnose, is_url, materialize, refresh_snapshot,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Manage podcast subscriptions and fetch new episodes
#[derive(Parser, Debug)]
#[command(name = "podstash")]
#[command(about = "Manage podcast subscriptions and fetch new episodes")]
#[command(version)]
struct Args {
    /// Path of the subscription store (defaults to the user config directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Seconds a download may stall before it is abandoned
    #[arg(long, global = true, default_value = "60")]
    timeout: u64,

    /// Log pipeline details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a podcast and fetch its feed
    Add {
        /// Name under which the podcast is managed
        #[arg(short, long)]
        name: String,

        /// URL of the podcast feed
        #[arg(short = 'u', long)]
        feed_url: String,

        /// Directory where episodes are stored
        #[arg(short, long)]
        storage: PathBuf,
    },

    /// List managed podcasts
    List,

    /// Show a managed podcast
    Show {
        /// Name of the podcast
        name: String,
    },

    /// Fetch the feeds of the given podcasts and download new episodes
    Update {
        /// Podcast names, or "all" for every managed podcast
        #[arg(required = true)]
        names: Vec<String>,

        /// Download new episodes without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Check every podcast's storage and offer to repair it
    Doctor,
}

/// Progress reporter using indicatif for terminal output
struct IndicatifReporter {
    multi: MultiProgress,
    item_bar: Mutex<Option<ProgressBar>>,
    main_bar: ProgressBar,
}

impl IndicatifReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let main_bar = multi.add(ProgressBar::new_spinner());
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            item_bar: Mutex::new(None),
            main_bar,
        }
    }

    fn get_or_create_item_bar(&self) -> ProgressBar {
        let mut slot = self.item_bar.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(bar) = slot.as_ref() {
            return bar.clone();
        }

        let style = ProgressStyle::default_bar()
            .template(&format!(
                "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");

        let bar = self.multi.add(ProgressBar::new(0));
        bar.set_style(style);
        *slot = Some(bar.clone());
        bar
    }

    fn finish_item_bar(&self) {
        let mut slot = self.item_bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }
    }

    fn finish(&self) {
        self.finish_item_bar();
        self.main_bar.finish_and_clear();
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { subscription, url } => {
                self.main_bar.set_message(format!(
                    "{SEARCH}{}: fetching {}",
                    subscription.bold(),
                    url.cyan()
                ));
            }

            ProgressEvent::SnapshotStored {
                subscription,
                bytes,
            } => {
                self.main_bar.set_message(format!(
                    "{SEARCH}{}: stored feed ({})",
                    subscription.bold(),
                    HumanBytes(bytes)
                ));
            }

            ProgressEvent::NewItemsFound {
                subscription,
                total_items,
                new_items,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} episodes total, {} new",
                    subscription.bold().green(),
                    total_items.to_string().cyan(),
                    new_items.to_string().yellow()
                ));
            }

            ProgressEvent::ItemStarting {
                item_title,
                item_index,
                total_items,
                content_length,
            } => {
                let bar = self.get_or_create_item_bar();
                bar.set_length(content_length.unwrap_or(0));
                bar.set_position(0);
                bar.set_message(format!(
                    "[{}/{}] {}",
                    (item_index + 1).to_string().cyan(),
                    total_items.to_string().cyan(),
                    truncate_title(&item_title, 40)
                ));
            }

            ProgressEvent::ItemProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                let bar = self.get_or_create_item_bar();
                if let Some(total) = total_bytes {
                    bar.set_length(total);
                }
                bar.set_position(bytes_downloaded);
            }

            ProgressEvent::ItemCompleted {
                item_title,
                bytes_downloaded,
            } => {
                self.finish_item_bar();
                let _ = self.multi.println(format!(
                    "  {SUCCESS}{} ({})",
                    truncate_title(&item_title, 50).green(),
                    HumanBytes(bytes_downloaded)
                ));
            }

            ProgressEvent::ItemFailed { item_title, error } => {
                self.finish_item_bar();
                let _ = self.multi.println(format!(
                    "  {FAILURE}{} - {}",
                    truncate_title(&item_title, 30).red(),
                    error.red()
                ));
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Ask a yes/no question on stdin; anything but "y" or "yes" means no
fn confirm(question: &str) -> bool {
    print!("{question} (yes/no) ");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }

    matches!(answer.trim(), "y" | "yes")
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn reporter_for(quiet: bool) -> (SharedProgressReporter, Option<Arc<IndicatifReporter>>) {
    if quiet {
        return (NoopReporter::shared(), None);
    }
    let display = Arc::new(IndicatifReporter::new());
    let reporter: SharedProgressReporter = display.clone();
    (reporter, Some(display))
}

fn select_subscriptions(store: &SubscriptionStore, names: &[String]) -> Result<Vec<Subscription>> {
    if names.iter().any(|name| name == RESERVED_NAME) {
        return Ok(store.list().into_iter().cloned().collect());
    }

    names
        .iter()
        .map(|name| -> Result<Subscription> { Ok(store.get(name)?.clone()) })
        .collect()
}

fn print_new_items(subscription: &Subscription, items: &[Item]) {
    println!("\n{}", subscription.name.bold());
    println!("{}", "-".repeat(subscription.name.chars().count().max(18)));
    for item in items {
        let size = if item.payload.size_bytes > 0 {
            HumanBytes(item.payload.size_bytes).to_string()
        } else {
            "unknown size".to_string()
        };
        println!("  {} {}", item.title, format!("({size})").dimmed());
    }
}

async fn run_update(
    store: &SubscriptionStore,
    client: &ReqwestClient,
    names: &[String],
    yes: bool,
    quiet: bool,
) -> Result<()> {
    let subscriptions = select_subscriptions(store, names)?;

    let (reporter, display) = reporter_for(quiet);
    let checks = check_subscriptions(client, subscriptions, reporter.clone()).await;
    if let Some(display) = &display {
        display.main_bar.finish_and_clear();
    }

    let mut failures = Vec::new();
    let mut downloaded_count = 0;
    let mut downloaded_bytes = 0;

    for check in checks {
        let subscription = check.subscription;
        let items = match check.result {
            Ok(items) => items,
            Err(e) => {
                failures.push((subscription.name.clone(), e.to_string()));
                continue;
            }
        };

        if items.is_empty() {
            if !quiet {
                println!("{}: {}", subscription.name.bold(), "up to date".green());
            }
            continue;
        }

        print_new_items(&subscription, &items);
        if !yes && !confirm("Download these episodes?") {
            continue;
        }

        match materialize(client, &subscription, items, &reporter).await {
            Ok(done) => {
                downloaded_count += done.len();
                downloaded_bytes += done
                    .iter()
                    .filter_map(|item| item.downloaded_bytes)
                    .sum::<u64>();
            }
            Err(e) => failures.push((subscription.name.clone(), e.to_string())),
        }
    }

    if let Some(display) = &display {
        display.finish();
    }

    if !quiet {
        println!(
            "\n{PARTY}{} {} episodes downloaded ({}), {} failed",
            "Update complete:".bold().green(),
            downloaded_count.to_string().green().bold(),
            HumanBytes(downloaded_bytes),
            if failures.is_empty() {
                "0".green()
            } else {
                failures.len().to_string().red().bold()
            }
        );
    }

    if !failures.is_empty() {
        eprintln!("\n{}", "Failed podcasts:".red().bold());
        for (name, error) in &failures {
            eprintln!("  {}{} - {}", CROSS, name.yellow(), error.dimmed());
        }
        bail!("{} podcast(s) could not be updated", failures.len());
    }

    Ok(())
}

async fn run_doctor(store: &SubscriptionStore, client: &ReqwestClient) -> Result<()> {
    let mut subscriptions = store.list();
    subscriptions.sort_by(|a, b| a.name.cmp(&b.name));

    let mut problems = 0;

    for subscription in subscriptions {
        let health = diagnose(subscription);
        let description = match &health {
            Health::Healthy => continue,
            Health::MissingStorage => format!(
                "storage directory {} does not exist",
                subscription.local_store.display()
            ),
            Health::StorageNotDirectory => format!(
                "{} is not a directory",
                subscription.local_store.display()
            ),
            Health::MissingSnapshot => "feed file is missing".to_string(),
            Health::SnapshotNotFile => "feed file is a directory".to_string(),
            Health::Unreadable(reason) => format!("storage cannot be read: {reason}"),
        };

        eprintln!("{}{}: {}", FAILURE, subscription.name.bold(), description);

        let repaired = health.is_repairable()
            && confirm("Create the storage and fetch the feed?")
            && match refresh_snapshot(client, subscription, &NoopReporter::shared()).await {
                Ok(_) => true,
                Err(e) => {
                    eprintln!("  {}{}", CROSS, e.to_string().red());
                    false
                }
            };

        if !repaired {
            problems += 1;
        }
    }

    if problems > 0 {
        bail!("{problems} podcast(s) need attention");
    }

    println!("{SUCCESS}All podcasts look healthy");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let store_path = args.store.clone().unwrap_or_else(default_store_path);
    let mut store = SubscriptionStore::open(&store_path).with_context(|| {
        format!(
            "Failed to open subscription store {}",
            store_path.display()
        )
    })?;

    let client = ReqwestClient::with_read_timeout(Duration::from_secs(args.timeout))
        .context("Failed to set up the HTTP client")?;

    match args.command {
        Command::Add {
            name,
            feed_url,
            storage,
        } => {
            if !is_url(&feed_url) {
                bail!("Feed URL must start with http:// or https://: {feed_url}");
            }

            if !args.quiet {
                println!(
                    "\n{}{} {}\n",
                    MICROPHONE,
                    "podstash".bold().magenta(),
                    "- adding podcast".dimmed()
                );
            }

            let (reporter, display) = reporter_for(args.quiet);
            let added = add_subscription(&mut store, &client, &name, &feed_url, storage, &reporter)
                .await;
            if let Some(display) = &display {
                display.finish();
            }
            let subscription = added.context("Failed to add podcast")?;

            if !args.quiet {
                println!(
                    "{SUCCESS}{} added, episodes go to {}",
                    subscription.name.bold().green(),
                    subscription.local_store.display().to_string().cyan()
                );
            }
        }

        Command::List => {
            let mut subscriptions = store.list();
            subscriptions.sort_by(|a, b| a.name.cmp(&b.name));
            for subscription in subscriptions {
                println!("{}", subscription.name);
            }
        }

        Command::Show { name } => {
            let subscription = store.get(&name)?;
            println!("{:>20}  {}", "Name".bold(), subscription.name);
            println!("{:>20}  {}", "Feed URL".bold(), subscription.feed_url);
            println!(
                "{:>20}  {}",
                "Episodes directory".bold(),
                subscription.local_store.display()
            );
        }

        Command::Update { names, yes } => {
            run_update(&store, &client, &names, yes, args.quiet).await?;
        }

        Command::Doctor => {
            run_doctor(&store, &client).await?;
        }
    }

    Ok(())
}
