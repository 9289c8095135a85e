use clap::Parser;
use sqlmeta::db::{drivers, registry};
use sqlmeta::logging::init_logging;
use sqlmeta::metacmd::interrupt::InterruptScope;
use sqlmeta::{dispatch, Config, Session};
use std::io::IsTerminal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sqlmeta", version, about = "Multi-backend SQL client with backslash meta-commands")]
struct Args {
    /// Connection URL, e.g. `sqlite:/tmp/app.db`
    #[arg(default_value = "sqlite::memory:")]
    url: String,

    /// Pager for help output, overrides the config file and PAGER
    #[arg(long)]
    pager: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sqlmeta: {}", e);
            Config::default()
        }
    };
    init_logging(&config.log_config());

    if let Err(e) = run(args, config).await {
        error!("{}", e);
        eprintln!("sqlmeta: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = registry::init(drivers::all())?;
    let interactive = std::io::stdin().is_terminal();
    let mut session = Session::open(registry, &args.url)?
        .with_interactive(interactive)
        .with_pager(args.pager.or(config.pager));
    info!(drivers = ?registry.supported_names(), "ready");

    let root = CancellationToken::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed == "\\q" {
            break;
        }
        if trimmed.starts_with('\\') {
            match dispatch(&mut session, trimmed, &root).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => eprintln!("cancelled"),
                Err(e) => eprintln!("{}", e),
            }
            continue;
        }
        let Some(stmt) = session.push_line(&line) else {
            continue;
        };
        let scope = InterruptScope::new(&root);
        let token = scope.token();
        match scope.run(session.execute(&stmt, &token)).await {
            Ok(result) => session.write_result(&result)?,
            Err(e) if e.is_cancelled() => eprintln!("cancelled"),
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}
