use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use server::acceptor::{serve, ServerContext};
use server::pool::MatchmakingPool;
use server::session::Agent;
use shared::policy::{GreedyPolicy, RandomPolicy};
use shared::rules::ruleset_by_name;

/// Main-method of the server executable.
/// Parses command-line arguments, builds the shared matchmaking pool, and
/// accepts agent connections until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "7878")]
        port: u16,
        /// Game variant to referee (siege or blast)
        #[clap(short, long, default_value = "blast")]
        game: String,
        /// Directory for per-session game logs
        #[clap(long, default_value = "logs")]
        log_dir: PathBuf,
        /// Seconds an agent may take over one action before being dropped
        #[clap(long)]
        action_timeout: Option<u64>,
    }

    env_logger::init();
    let args = Args::parse();

    let rules = ruleset_by_name(&args.game)
        .ok_or_else(|| format!("unknown game variant {:?}", args.game))?;

    // Lone agents on these channels play server-controlled opponents.
    let mut pool = MatchmakingPool::new(rules.sides().len());
    pool.register_special(
        "random",
        Box::new(|| Agent::builtin(Box::new(RandomPolicy::new()), "random_bot")),
    );
    pool.register_special(
        "greedy",
        Box::new(|| Agent::builtin(Box::new(GreedyPolicy::new()), "greedy_bot")),
    );

    let context = Arc::new(ServerContext {
        pool,
        game: args.game,
        log_dir: Some(args.log_dir),
        action_timeout: args.action_timeout.map(Duration::from_secs),
    });

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    tokio::select! {
        result = serve(listener, context) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
