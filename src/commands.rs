//! Command-line surface over the core coordinators.

use anyhow::{Context, Result, anyhow, bail};
use mangahub_core::catalog::{CatalogClient, CatalogClientConfig, CatalogQuery, CatalogSource, Taxonomy};
use mangahub_core::config::AppConfig;
use mangahub_core::library::filter_by_title;
use mangahub_core::membership::MembershipCoordinator;
use mangahub_core::model::{Title, TitleId, UserTitle};
use mangahub_core::pagination::{FeedSnapshot, LoadOutcome, Paginator};
use mangahub_core::search::{SearchCoordinator, SearchStatus};
use mangahub_core::shelves::CategoryShelves;
use mangahub_core::store::{ListName, ListStore};
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) const USAGE: &str = "Usage: mangahub <command>
  browse <all|best|genre NAME|theme NAME|demographic NAME|author ID> [pages]
  search <text> [pages]
  taxonomy <genres|themes|demographics|authors>
  shelves <genres|themes|demographics>
  list <collection|bucket> [filter]
  add <collection|bucket> <search text> <id>
  remove <collection|bucket> <id>
  read <id> <volume>
  own <id> <volume>
  status <id>";

/// Pages of search results scanned when looking up a title to add.
const ADD_LOOKUP_PAGES: u32 = 5;
const SHELF_PREVIEW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Listing {
    Names(Taxonomy),
    Authors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Browse { query: CatalogQuery, pages: u32 },
    Search { text: String, pages: u32 },
    Taxonomy(Listing),
    Shelves(Taxonomy),
    List { list: ListName, filter: String },
    Add { list: ListName, search: String, id: TitleId },
    Remove { list: ListName, id: TitleId },
    Read { id: TitleId, volume: u32 },
    Own { id: TitleId, volume: u32 },
    Status { id: TitleId },
}

pub(crate) fn parse_command(args: &[String]) -> Result<Command> {
    let mut args = args.iter().map(String::as_str);
    let name = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;
    let rest: Vec<&str> = args.collect();

    let command = match (name, rest.as_slice()) {
        ("browse", [kind, tail @ ..]) => parse_browse(kind, tail)?,
        ("search", [text]) => Command::Search {
            text: text.to_string(),
            pages: 1,
        },
        ("search", [text, pages]) => Command::Search {
            text: text.to_string(),
            pages: parse_number(pages, "pages")?,
        },
        ("taxonomy", [kind]) => Command::Taxonomy(match *kind {
            "authors" => Listing::Authors,
            other => Listing::Names(parse_taxonomy(other)?),
        }),
        ("shelves", [kind]) => Command::Shelves(parse_taxonomy(kind)?),
        ("list", [list]) => Command::List {
            list: parse_list(list)?,
            filter: String::new(),
        },
        ("list", [list, filter]) => Command::List {
            list: parse_list(list)?,
            filter: filter.to_string(),
        },
        ("add", [list, search, id]) => Command::Add {
            list: parse_list(list)?,
            search: search.to_string(),
            id: parse_number(id, "id")?,
        },
        ("remove", [list, id]) => Command::Remove {
            list: parse_list(list)?,
            id: parse_number(id, "id")?,
        },
        ("read", [id, volume]) => Command::Read {
            id: parse_number(id, "id")?,
            volume: parse_number(volume, "volume")?,
        },
        ("own", [id, volume]) => Command::Own {
            id: parse_number(id, "id")?,
            volume: parse_number(volume, "volume")?,
        },
        ("status", [id]) => Command::Status {
            id: parse_number(id, "id")?,
        },
        _ => bail!("{USAGE}"),
    };
    Ok(command)
}

fn parse_browse(kind: &str, tail: &[&str]) -> Result<Command> {
    let (query, tail) = match (kind, tail) {
        ("all", tail) => (CatalogQuery::AllTitles, tail),
        ("best", tail) => (CatalogQuery::BestRanked, tail),
        ("genre", [name, tail @ ..]) => (CatalogQuery::ByGenre(name.to_string()), tail),
        ("theme", [name, tail @ ..]) => (CatalogQuery::ByTheme(name.to_string()), tail),
        ("demographic", [name, tail @ ..]) => (CatalogQuery::ByDemographic(name.to_string()), tail),
        ("author", [id, tail @ ..]) => (CatalogQuery::ByAuthor(id.to_string()), tail),
        _ => bail!("{USAGE}"),
    };
    let pages = match tail {
        [] => 1,
        [pages] => parse_number(pages, "pages")?,
        _ => bail!("{USAGE}"),
    };
    Ok(Command::Browse { query, pages })
}

fn parse_taxonomy(label: &str) -> Result<Taxonomy> {
    Taxonomy::parse(label).ok_or_else(|| anyhow!("Unknown category kind: {label}"))
}

fn parse_list(label: &str) -> Result<ListName> {
    ListName::parse(label).ok_or_else(|| anyhow!("Unknown list: {label} (expected collection or bucket)"))
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| anyhow!("Invalid {what}: {raw}"))
}

pub(crate) async fn run_command(command: Command, config: &AppConfig) -> Result<()> {
    debug!(?command, "Running command");
    match command {
        Command::Browse { query, pages } => {
            let feed = Paginator::new(catalog(config)?, query.clone(), config.page_size);
            feed.reset(query).await.context("Failed to load the first page")?;
            load_more(&feed, pages).await?;
            print_feed(&feed.snapshot());
        }
        Command::Search { text, pages } => {
            let feed = Arc::new(Paginator::new(catalog(config)?, CatalogQuery::AllTitles, config.page_size));
            let search = SearchCoordinator::new(feed.clone(), config.search_debounce());
            search.on_query_text_changed(&text).await?;
            search.settle().await;
            let snapshot = search.snapshot();
            match snapshot.status {
                SearchStatus::Failed => {
                    let alert = snapshot.alert.map(|alert| alert.message).unwrap_or_default();
                    bail!("{alert}");
                }
                SearchStatus::NoResults => println!("No titles match \"{text}\""),
                _ => {
                    load_more(&feed, pages).await?;
                    print_feed(&feed.snapshot());
                }
            }
        }
        Command::Taxonomy(Listing::Names(taxonomy)) => {
            let names = catalog(config)?
                .fetch_taxonomy(taxonomy)
                .await
                .with_context(|| format!("Failed to list {taxonomy}"))?;
            for name in names {
                println!("{name}");
            }
        }
        Command::Taxonomy(Listing::Authors) => {
            let authors = catalog(config)?
                .fetch_authors()
                .await
                .context("Failed to list authors")?;
            for author in authors {
                println!("{}\t{}\t{}", author.id, author.display_name(), author.role);
            }
        }
        Command::Shelves(taxonomy) => {
            let shelves = CategoryShelves::new(catalog(config)?, config.page_size);
            shelves.load(taxonomy).await?;
            for (name, snapshot) in shelves.snapshots() {
                let preview: Vec<&str> = snapshot
                    .items
                    .iter()
                    .take(SHELF_PREVIEW)
                    .map(|title| title.title.as_str())
                    .collect();
                match snapshot.alert {
                    Some(alert) => println!("{name}: {}", alert.message),
                    None => println!("{name} ({}): {}", snapshot.items.len(), preview.join(", ")),
                }
            }
        }
        Command::List { list, filter } => {
            let items = lists(config).load_list(list)?;
            let filtered = filter_by_title(&items, &filter);
            if !filtered.search_succeeded {
                println!("Nothing in your {list} matches \"{filter}\"");
            }
            for entry in &filtered.items {
                print_entry(entry);
            }
        }
        Command::Add { list, search, id } => {
            let title = find_title(config, &search, id).await?;
            let lists = lists(config);
            let outcome = match list {
                ListName::Collection => lists.add_to_collection(&title)?,
                ListName::BucketList => lists.add_to_bucket_list(&title)?,
            };
            if outcome.removed_from_other {
                println!("Moved \"{}\" from your {}", title.title, list.other());
            }
            if outcome.added {
                println!("Added \"{}\" to your {list}", title.title);
            } else {
                println!("\"{}\" is already in your {list}", title.title);
            }
        }
        Command::Remove { list, id } => {
            if lists(config).remove(list, id)? {
                println!("Removed {id} from your {list}");
            } else {
                println!("{id} is not in your {list}");
            }
        }
        Command::Read { id, volume } => {
            let entry = lists(config).set_reading_volume(id, volume)?;
            print_entry(&entry);
        }
        Command::Own { id, volume } => {
            let entry = lists(config).toggle_owned_volume(id, volume)?;
            print_entry(&entry);
        }
        Command::Status { id } => {
            let lists = lists(config);
            let membership = lists.check_membership(id)?;
            println!(
                "collection: {}  bucket list: {}",
                membership.in_collection, membership.in_bucket_list
            );
            if membership.in_collection {
                let items = lists.load_list(ListName::Collection)?;
                if let Some(entry) = items.iter().find(|entry| entry.id() == id) {
                    print_entry(entry);
                }
            }
        }
    }
    Ok(())
}

fn catalog(config: &AppConfig) -> Result<Arc<CatalogClient>> {
    let client = CatalogClient::new(&CatalogClientConfig::from(config))
        .context("Failed to set up the catalog client")?;
    info!(base_url = %client.base_url(), "Catalog client ready");
    Ok(Arc::new(client))
}

fn lists(config: &AppConfig) -> MembershipCoordinator {
    MembershipCoordinator::new(ListStore::from_config(config))
}

async fn load_more<C: CatalogSource + ?Sized>(feed: &Paginator<C>, pages: u32) -> Result<()> {
    for _ in 1..pages {
        let Some(last) = feed.snapshot().items.last().map(|title| title.id) else {
            break;
        };
        match feed.on_item_appeared(last).await? {
            LoadOutcome::Loaded { .. } => {}
            _ => break,
        }
    }
    Ok(())
}

async fn find_title(config: &AppConfig, search: &str, id: TitleId) -> Result<Title> {
    let catalog = catalog(config)?;
    let query = CatalogQuery::SearchText(search.to_string());
    for page in 1..=ADD_LOOKUP_PAGES {
        let titles = catalog
            .fetch_page(&query, page, config.page_size)
            .await
            .with_context(|| format!("Failed to search for \"{search}\""))?;
        if titles.is_empty() {
            break;
        }
        if let Some(title) = titles.into_iter().find(|title| title.id == id) {
            return Ok(title);
        }
    }
    bail!("No title with id {id} found when searching for \"{search}\"")
}

fn print_feed(snapshot: &FeedSnapshot) {
    for title in &snapshot.items {
        let score = if title.is_scored() {
            format!("{:.2}", title.score)
        } else {
            "-".to_string()
        };
        println!("{}\t{}\t{}", title.id, score, title.title);
    }
    println!(
        "-- {} titles, page {}{}",
        snapshot.items.len(),
        snapshot.page,
        if snapshot.exhausted { ", end of list" } else { "" }
    );
}

fn print_entry(entry: &UserTitle) {
    let total = entry
        .title
        .volumes
        .map(|volumes| volumes.to_string())
        .unwrap_or_else(|| "?".to_string());
    let gauge = entry
        .owned_fraction()
        .map(|fraction| format!(" ({:.0}%)", fraction * 100.0))
        .unwrap_or_default();
    println!(
        "{}\t{}\treading {}/{}\towned {}/{}{}{}",
        entry.id(),
        entry.title.title,
        entry.reading_volume,
        total,
        entry.owned_volumes.len(),
        total,
        gauge,
        if entry.is_completed { "\tcomplete" } else { "" }
    );
}
