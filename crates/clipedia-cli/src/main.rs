use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use clipedia_core::bridge::encode_items;
use clipedia_core::{
    FilterCriteria, Item, ItemKind, LocalBridge, SearchMatcher, SearchMode, Slot, Store,
    StoreImpl, TagInfo, TypeFilter, WindowedCollection, WireItem,
};
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod logging;

type Collection = WindowedCollection<LocalBridge<StoreImpl>>;

#[derive(Parser)]
#[command(name = "clipedia", version, about = "Clipedia clipboard collection CLI")]
struct Cli {
    /// Optional database path (overrides settings)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Debug logging for clipedia crates (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    InitDb,
    /// Capture a new entry (reads STDIN when TEXT is omitted)
    Add {
        text: Option<String>,
        /// text | image | file
        #[arg(long, default_value = "text")]
        kind: ItemKind,
        /// Application the entry was copied from
        #[arg(long)]
        source: Option<String>,
    },
    /// Print the number of stored entries
    Count,
    /// Render a window of the collection through the page cache
    View {
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Last index to show (default: one page starting at --start)
        #[arg(long)]
        stop: Option<usize>,
        /// Filter the cached window by text
        #[arg(long)]
        query: Option<String>,
        /// Treat --query as a case-insensitive regular expression
        #[arg(long)]
        regex: bool,
        /// Keep entries carrying any of these tags
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// all | text | code | links
        #[arg(long = "type", default_value = "all")]
        kind: TypeFilter,
        #[arg(long)]
        json: bool,
    },
    /// Search the whole collection, not just the cached window
    Search {
        #[arg(required_unless_present = "tag")]
        pattern: Option<String>,
        /// Only entries carrying this tag
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        json: bool,
    },
    Pin { id: String },
    Unpin { id: String },
    /// Flip the pinned flag of an entry
    Toggle { id: String },
    /// Remove an entry, or everything when ID is omitted
    Delete { id: Option<String> },
    /// Edit item tags and custom tag definitions
    Tag {
        #[command(subcommand)]
        action: TagCmd,
    },
    /// List tags in use plus custom tags
    Tags {
        #[arg(long)]
        json: bool,
    },
    /// Show effective settings and paths
    Config {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TagCmd {
    Add { id: String, tag: String },
    Remove { id: String, tag: String },
    Create {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    Color { name: String, color: String },
    Delete { name: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let settings = config::load_settings();

    if let Commands::Config { json } = cli.command {
        return print_config(&settings, cli.db, json);
    }

    let db_path = settings.db_path(cli.db);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let store = Arc::new(StoreImpl::new_with(&db_path, true)?);
    store.init()?;
    tracing::debug!(db = %db_path.display(), "store ready");
    let collection = WindowedCollection::new(
        LocalBridge::new(Arc::clone(&store)),
        settings.window_config(),
    );

    match cli.command {
        Commands::InitDb => {
            println!("database initialized at {}", db_path.display());
        }
        Commands::Add { text, kind, source } => {
            let text = match text {
                Some(t) => t,
                None => {
                    use std::io::{self, Read};
                    let mut buf = String::new();
                    io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            if text.trim().is_empty() {
                bail!("nothing to add");
            }
            let item = store.capture(&text, kind, source.as_deref())?;
            println!("added {}", item.id);
        }
        Commands::Count => {
            let n = collection
                .refresh_count()
                .await
                .ok_or_else(|| anyhow!("could not count entries"))?;
            println!("{n}");
        }
        Commands::View {
            start,
            stop,
            query,
            regex,
            tags,
            kind,
            json,
        } => {
            let criteria = FilterCriteria {
                query: query.unwrap_or_default(),
                mode: SearchMode::from_regex_flag(regex),
                tags,
                kind,
            };
            let page_size = settings.window_config().page_size;
            let stop = stop.unwrap_or_else(|| start.saturating_add(page_size - 1));
            view(&collection, start, stop, &criteria, json).await?;
        }
        Commands::Search {
            pattern,
            tag,
            regex,
            json,
        } => {
            let items = match (tag, pattern) {
                (Some(tag), pattern) => {
                    let mut items = collection.items_by_tag(&tag).await?;
                    if let Some(pattern) = pattern {
                        let matcher =
                            SearchMatcher::new(&pattern, SearchMode::from_regex_flag(regex));
                        items.retain(|item| matcher.matches(item));
                    }
                    items
                }
                (None, Some(pattern)) => collection.search_full_collection(&pattern, regex).await?,
                (None, None) => bail!("give a pattern or --tag"),
            };
            print_items(&items, json)?;
        }
        Commands::Pin { id } => {
            require_item(&store, &id)?;
            collection.set_pinned(&id, true).await;
            println!("pinned {id}");
        }
        Commands::Unpin { id } => {
            require_item(&store, &id)?;
            collection.set_pinned(&id, false).await;
            println!("unpinned {id}");
        }
        Commands::Toggle { id } => {
            let desired = !require_item(&store, &id)?.pinned;
            collection.set_pinned(&id, desired).await;
            println!("{} {id}", if desired { "pinned" } else { "unpinned" });
        }
        Commands::Delete { id: Some(id) } => {
            require_item(&store, &id)?;
            collection.delete(&id).await;
            println!("deleted {id}");
        }
        Commands::Delete { id: None } => {
            collection.delete_all().await;
            println!("cleared all entries");
        }
        Commands::Tag { action } => tag_command(&store, action)?,
        Commands::Tags { json } => {
            let tags = collection.list_all_tags().await?;
            print_tags(&tags, json)?;
        }
        // printed before the store is opened
        Commands::Config { .. } => {}
    }
    Ok(())
}

fn require_item(store: &StoreImpl, id: &str) -> Result<Item> {
    store
        .get(id)?
        .ok_or_else(|| anyhow!("no entry with id {id}"))
}

fn tag_command(store: &StoreImpl, action: TagCmd) -> Result<()> {
    match action {
        TagCmd::Add { id, tag } => {
            require_item(store, &id)?;
            store.add_tag(&id, &tag)?;
            println!("tagged {id} with {tag}");
        }
        TagCmd::Remove { id, tag } => {
            require_item(store, &id)?;
            store.remove_tag(&id, &tag)?;
            println!("removed {tag} from {id}");
        }
        TagCmd::Create { name, color } => {
            store.create_custom_tag(&name, color.as_deref())?;
            println!("created tag {name}");
        }
        TagCmd::Color { name, color } => {
            store.update_tag_color(&name, &color)?;
            println!("set {name} color to {color}");
        }
        TagCmd::Delete { name } => {
            store.delete_custom_tag(&name)?;
            println!("deleted tag {name}");
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct SlotRow {
    index: usize,
    item: Option<WireItem>,
}

#[derive(serde::Serialize)]
struct ViewOutput {
    total: usize,
    slots: Vec<SlotRow>,
    /// Filtered display list over every cached entry
    items: Vec<WireItem>,
}

async fn view(
    collection: &Collection,
    start: usize,
    stop: usize,
    criteria: &FilterCriteria,
    json: bool,
) -> Result<()> {
    collection.load_initial().await;
    let report = collection.on_viewport(start, stop).await;
    if !report.failed.is_empty() {
        tracing::warn!(pages = ?report.failed, "some pages could not be loaded");
    }
    let slots = collection.slots(start, stop);
    let filtered = collection.display_list(criteria);

    if json {
        let out = ViewOutput {
            total: collection.total_count(),
            slots: slots
                .into_iter()
                .map(|(index, slot)| SlotRow {
                    index,
                    item: match slot {
                        Slot::Loaded(item) => Some(WireItem::from(&item)),
                        Slot::Placeholder => None,
                    },
                })
                .collect(),
            items: encode_items(&filtered),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if criteria.is_empty() {
        for (index, slot) in slots {
            match slot {
                Slot::Loaded(item) => println!("{index}\t{}", row(&item)),
                Slot::Placeholder => println!("{index}\t..."),
            }
        }
    } else {
        for item in &filtered {
            println!("{}", row(item));
        }
    }
    Ok(())
}

fn print_items(items: &[Item], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&encode_items(items))?);
    } else {
        for item in items {
            println!("{}", row(item));
        }
    }
    Ok(())
}

fn print_tags(tags: &[TagInfo], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tags)?);
    } else {
        for t in tags {
            println!(
                "{}\t{}\t{}",
                t.name,
                t.color.as_deref().unwrap_or("-"),
                if t.system { "system" } else { "custom" }
            );
        }
    }
    Ok(())
}

fn row(item: &Item) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        item.id,
        if item.pinned { "*" } else { " " },
        item.captured_at.format("%Y-%m-%d %H:%M"),
        preview(&item.content)
    )
}

fn preview(s: &str) -> String {
    let first = s.lines().next().unwrap_or("");
    let mut out: String = first.chars().take(60).collect();
    if first.chars().count() > 60 || s.lines().nth(1).is_some() {
        out.push_str("...");
    }
    out
}

fn print_config(settings: &config::Settings, cli_db: Option<PathBuf>, json: bool) -> Result<()> {
    let db_path = settings.db_path(cli_db);
    let window = settings.window_config();
    if json {
        let v = serde_json::json!({
            "config_dir": config::config_dir(),
            "settings_path": config::settings_path(),
            "db_path": db_path,
            "storage": settings.storage,
            "view": window,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("config_dir: {}", config::config_dir().display());
        println!("settings: {}", config::settings_path().display());
        println!("db_path: {}", db_path.display());
        println!("page_size: {}", window.page_size);
        println!("threshold: {}", window.threshold);
    }
    Ok(())
}
