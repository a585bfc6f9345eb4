use std::{process::ExitCode, sync::Arc, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use shoal_core::{CommandId, Credentials, Endpoint, ItemId, ItemSort, ItemType, QueueType};
use shoal_session::{ops, PollerConfig, QueueMonitor, Session, SessionConfig, SessionError};
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Parser)]
#[command(name = "shoal", about = "Session CLI for a shoal media server")]
struct Cli {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 7007)]
    port: u16,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect, authenticate and print the session status.
    Status,
    /// Run a library query and print matching items.
    Library {
        #[arg(long, value_enum, default_value_t = ItemKindArg::Gallery)]
        kind: ItemKindArg,
        #[arg(long, default_value_t = 25)]
        limit: u64,
        #[arg(long)]
        search: Option<String>,
        /// Return results in random order.
        #[arg(long)]
        random: bool,
    },
    /// Fetch one item by id and print it as JSON.
    Item {
        #[arg(long, value_enum, default_value_t = ItemKindArg::Gallery)]
        kind: ItemKindArg,
        id: i64,
    },
    /// Query the lifecycle state of server commands.
    CommandState {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },
    /// Watch queue activity with adaptive polling until interrupted.
    Watch {
        /// Poll interval while a queue is busy, in milliseconds.
        #[arg(long, default_value_t = 10_000)]
        fast_ms: u64,
        /// Poll interval while queues are idle, in milliseconds.
        #[arg(long, default_value_t = 25_000)]
        slow_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ItemKindArg {
    Gallery,
    Collection,
    Grouping,
    Artist,
    Page,
}

impl From<ItemKindArg> for ItemType {
    fn from(kind: ItemKindArg) -> ItemType {
        match kind {
            ItemKindArg::Gallery => ItemType::Gallery,
            ItemKindArg::Collection => ItemType::Collection,
            ItemKindArg::Grouping => ItemType::Grouping,
            ItemKindArg::Artist => ItemType::Artist,
            ItemKindArg::Page => ItemType::Page,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let session = Arc::new(Session::new(SessionConfig {
        endpoint: Endpoint {
            host: cli.host.clone(),
            port: cli.port,
        },
        ..SessionConfig::default()
    }));

    let credentials = match (&cli.user, &cli.password) {
        (Some(user), Some(password)) => Credentials::new(user.clone(), password.clone()),
        _ => Credentials::guest(),
    };
    session.login(credentials, None).await?;

    match cli.command {
        Command::Status => {
            let status = session.status();
            println!(
                "connected: {}, logged in: {}",
                status.connected, status.logged_in
            );
            Ok(())
        }
        Command::Library {
            kind,
            limit,
            search,
            random,
        } => {
            let result = session
                .library(ops::LibraryView {
                    item_type: kind.into(),
                    fields: Some(vec!["id".to_string(), "title".to_string()]),
                    page: None,
                    limit: Some(limit),
                    metatags: None,
                    filter_id: None,
                    sort_by: random.then_some(ItemSort::GalleryRandom),
                    sort_desc: None,
                    search_query: search,
                })
                .await?;

            println!("{} of {} items:", result.items.len(), result.count);
            for item in result.items {
                println!("{item}");
            }
            Ok(())
        }
        Command::Item { kind, id } => {
            let item = session
                .item(ops::GetItem {
                    item_type: kind.into(),
                    item_id: ItemId(id),
                    fields: None,
                })
                .await?;
            println!("{item:#}");
            Ok(())
        }
        Command::CommandState { ids } => {
            let states = session
                .command_state(ops::GetCommandState {
                    command_ids: ids.into_iter().map(CommandId).collect(),
                })
                .await?;
            for (id, state) in states {
                println!("{id}: {state:?}");
            }
            Ok(())
        }
        Command::Watch { fast_ms, slow_ms } => {
            watch_queues(session, fast_ms, slow_ms).await
        }
    }
}

async fn watch_queues(session: Arc<Session>, fast_ms: u64, slow_ms: u64) -> Result<(), CliError> {
    let monitor = QueueMonitor::subscribe(
        &session,
        &[QueueType::Metadata, QueueType::Download],
        PollerConfig {
            fast: Duration::from_millis(fast_ms),
            slow: Duration::from_millis(slow_ms),
        },
    );

    let mut last = None;
    loop {
        let totals = monitor.totals();
        if last != Some(totals) {
            println!(
                "pending: {}, running: {}",
                totals.size,
                if totals.any_running { "yes" } else { "no" }
            );
            last = Some(totals);
        }

        tokio::select! {
            _ = sleep(Duration::from_millis(500)) => {}
            _ = tokio::signal::ctrl_c() => {
                monitor.unsubscribe_all();
                return Ok(());
            }
        }
    }
}
