use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::analytics::{ANALYTICS_FILE, AnalyticsLog};
use crate::config::get_config;
use crate::debounce;
use crate::engine::{MessageContext, SearchEngine};
use crate::export::{ExportFormat, export_results};
use crate::models::{MessageKind, SearchFilter, SearchQuery, SearchResult, SortOrder, SearchType};
use crate::session::SearchSession;
use crate::store::FileStore;

#[derive(Parser)]
#[command(name = "pip-search")]
#[command(about = "Search project chat transcripts")]
pub struct Cli {
    /// Increase logging verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Transcript directory (overrides config)
    #[arg(long, global = true)]
    pub transcripts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one search over the loaded transcripts
    Search {
        /// Search query
        query: String,
        /// Only messages from these agents
        #[arg(long)]
        agent: Vec<String>,
        /// Only messages of these kinds (user, agent, system)
        #[arg(long)]
        kind: Vec<MessageKind>,
        /// Only messages at or after this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        after: Option<String>,
        /// Only messages at or before this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        before: Option<String>,
        /// Only messages with attachments
        #[arg(long)]
        with_attachments: bool,
        /// Results limit
        #[arg(long)]
        limit: Option<usize>,
        /// Sort order (relevance, date-desc, date-asc)
        #[arg(long)]
        sort: Option<SortOrder>,
        /// Save this query and filters under a name
        #[arg(long)]
        save: Option<String>,
        /// Export results (csv, json, markdown)
        #[arg(long)]
        export: Option<ExportFormat>,
        /// Export file path (defaults to results.<ext>)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Show N surrounding messages per result
        #[arg(long)]
        context: Option<usize>,
    },
    /// Read queries from stdin, debounced, and run the latest
    Live,
    /// Manage saved searches
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Show or clear recent queries
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Search analytics summary
    Stats,
    /// Print a message by id with surrounding conversation turns
    Show {
        /// Message id
        id: String,
        /// Surrounding messages on each side
        #[arg(long, default_value_t = 2)]
        context: usize,
    },
}

#[derive(Subcommand)]
pub enum SavedAction {
    /// List saved searches
    List,
    /// Re-run a saved search by name
    Run { name: String },
    /// Delete a saved search by name
    Delete { name: String },
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut session = build_session(cli.transcripts.as_deref())?;

    match cli.command {
        Commands::Search {
            query,
            agent,
            kind,
            after,
            before,
            with_attachments,
            limit,
            sort,
            save,
            export,
            output,
            context,
        } => {
            let filter = SearchFilter {
                after: after.as_deref().map(|s| parse_date(s, false)).transpose()?,
                before: before.as_deref().map(|s| parse_date(s, true)).transpose()?,
                agents: agent,
                kinds: kind,
                has_attachments: with_attachments.then_some(true),
            };
            let query = SearchQuery {
                text: query,
                filter,
                limit: limit.unwrap_or(get_config().search.limit),
                sort_by: sort.unwrap_or_default(),
            };

            let results = session.execute(&query, SearchType::Manual)?;
            render_results(&results);

            if let Some(n) = context {
                render_result_contexts(&session, &results, n);
            }

            if let Some(name) = save
                && let Some(saved) = session.save_search(&name, &query)?
            {
                println!("Saved search '{}'.", saved.name);
            }

            if let Some(format) = export {
                let path = output.unwrap_or_else(|| PathBuf::from(format.default_file_name()));
                if export_results(&results, format, &path)? {
                    println!("Exported {} results to {}", results.len(), path.display());
                } else {
                    println!("No results to export.");
                }
            }
        }
        Commands::Live => run_live(&mut session).await?,
        Commands::Saved { action } => match action {
            SavedAction::List => {
                let searches = session.saved_searches();
                if searches.is_empty() {
                    println!("No saved searches.");
                }
                for search in searches {
                    let last_used = search
                        .last_used
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "never".to_string());
                    let filtered = if search.filter.is_empty() {
                        ""
                    } else {
                        " [filtered]"
                    };
                    println!(
                        "{} - {:?}{} (used {} times, last: {})",
                        search.name, search.query, filtered, search.use_count, last_used
                    );
                }
            }
            SavedAction::Run { name } => match session.run_saved(&name, get_config().search.limit)? {
                Some((saved, results)) => {
                    println!("Running '{}' ({:?}):\n", saved.name, saved.query);
                    render_results(&results);
                }
                None => println!("No saved search named '{}'.", name),
            },
            SavedAction::Delete { name } => {
                if session.delete_saved(&name)? {
                    println!("Deleted '{}'.", name);
                } else {
                    println!("No saved search named '{}'.", name);
                }
            }
        },
        Commands::History { clear } => {
            if clear {
                session.clear_history()?;
                println!("History cleared.");
            } else if session.history().is_empty() {
                println!("No search history.");
            } else {
                for (i, query) in session.history().iter().enumerate() {
                    println!("{}. {}", i + 1, query);
                }
            }
        }
        Commands::Stats => {
            let summary = session.analytics_summary();
            println!("Search Analytics:");
            println!("  Total searches: {}", summary.total_searches);
            println!("  Average results: {:.1}", summary.avg_results);
            println!("  Average latency: {:.1} ms", summary.avg_search_time_ms);
        }
        Commands::Show { id, context } => {
            match session.engine().context(&id, context, context) {
                Some(ctx) => render_context(&ctx),
                None => println!("No message with id '{}'.", id),
            }
        }
    }

    Ok(())
}

fn build_session(transcripts_override: Option<&Path>) -> Result<SearchSession> {
    let config = get_config();

    let transcripts_dir = match transcripts_override {
        Some(dir) => dir.to_path_buf(),
        None => config.get_transcripts_dir()?,
    };
    let engine = SearchEngine::from_dir(&transcripts_dir, config.search.threshold)?;
    info!(
        "Loaded {} messages from {}",
        engine.len(),
        transcripts_dir.display()
    );

    let data_dir = config.get_data_dir()?;
    let store = FileStore::open(&data_dir)?;
    let analytics = AnalyticsLog::open(data_dir.join(ANALYTICS_FILE), config.analytics.max_entries)?;

    Ok(SearchSession::new(engine, Box::new(store), analytics))
}

async fn run_live(session: &mut SearchSession) -> Result<()> {
    let config = get_config();
    let delay = Duration::from_millis(config.search.debounce_ms);
    let (debouncer, mut queries) = debounce::channel::<String>(delay);

    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if debouncer.submit(line).is_err() {
                break;
            }
        }
        // Dropping the debouncer flushes the last pending query
    });

    println!("Type a query and press Enter; Ctrl-D exits.");
    while let Some(text) = queries.recv().await {
        if text.trim().is_empty() {
            continue;
        }
        let query = SearchQuery {
            text,
            limit: config.search.limit,
            ..Default::default()
        };
        let results = session.execute(&query, SearchType::Live)?;
        render_results(&results);
    }

    Ok(())
}

fn render_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    println!("Found {} results:\n", results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{}] {} | {} | score: {:.2}",
            i + 1,
            result.agent,
            result.kind,
            result.timestamp.format("%Y-%m-%d %H:%M"),
            result.score
        );

        let mut tags = Vec::new();
        if !result.highlights.is_empty() {
            tags.push(format!("matched: {}", result.highlights.join(", ")));
        }
        if result.attachment_count > 0 {
            tags.push(format!("attachments: {}", result.attachment_count));
        }
        if !tags.is_empty() {
            println!("   {}", tags.join(" | "));
        }

        println!("   id: {}", result.id);
        println!("   {}\n", result.snippet);
    }
}

fn render_result_contexts(session: &SearchSession, results: &[SearchResult], n: usize) {
    for result in results {
        if let Some(ctx) = session.select(result, n, n) {
            render_context(&ctx);
            println!();
        }
    }
}

fn render_context(ctx: &MessageContext<'_>) {
    for (i, message) in ctx.messages.iter().enumerate() {
        let prefix = if i == ctx.match_index { ">> " } else { "   " };
        println!(
            "{}{} ({}): {}",
            prefix,
            message.kind.short_name(),
            message.agent,
            preview(&message.content, 300)
        );
    }
}

/// Collapse whitespace and truncate at a character boundary for dense output.
fn preview(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let truncated: String = collapsed.chars().take(max_chars - 1).collect();
        format!("{}…", truncated)
    }
}

/// Accept RFC 3339 or bare dates; bare `--before` dates extend to end of day.
fn parse_date(s: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow!("unrecognized date: {s} (expected YYYY-MM-DD or RFC 3339)"))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| anyhow!("unrecognized date: {s}"))
}
