use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use server::session::{Agent, SessionConfig, SessionCoordinator, SessionEnd};
use shared::policy::policy_by_name;
use shared::rules::ruleset_by_name;

/// Plays one local game between built-in agents, without any networking.
/// Exits 0 on a clean win or draw, non-zero if the game was invalidated.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Built-in agents to play, one per side (e.g. random greedy)
    #[clap(required = true, num_args = 2..)]
    agents: Vec<String>,
    /// Game variant to referee (siege or blast)
    #[clap(short, long, default_value = "blast")]
    game: String,
    /// Milliseconds to wait between turns
    #[clap(short, long, default_value = "0")]
    delay: u64,
    /// Write a structured game log to this path
    #[clap(short, long)]
    logfile: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let rules = ruleset_by_name(&args.game)
        .ok_or_else(|| format!("unknown game variant {:?}", args.game))?;
    if args.agents.len() != rules.sides().len() {
        return Err(format!(
            "{} takes exactly {} agents",
            args.game,
            rules.sides().len()
        )
        .into());
    }

    let mut cohort = Vec::with_capacity(args.agents.len());
    for (index, name) in args.agents.iter().enumerate() {
        let policy =
            policy_by_name(name).ok_or_else(|| format!("unknown agent {:?}", name))?;
        cohort.push(Agent::builtin(policy, format!("{}-{}", name, index + 1)));
    }

    let config = SessionConfig {
        log_path: args.logfile,
        action_timeout: None,
        turn_delay: (args.delay > 0).then(|| Duration::from_millis(args.delay)),
    };

    match SessionCoordinator::new(cohort, rules, config).run().await {
        SessionEnd::Finished(result) => {
            println!("{}", result);
            Ok(())
        }
        SessionEnd::Invalidated(side) => {
            eprintln!("game error: illegal action by {}", side);
            std::process::exit(1);
        }
        SessionEnd::Aborted(reason) => {
            eprintln!("game error: {}", reason);
            std::process::exit(1);
        }
        SessionEnd::ResourceLimit(reason) => {
            eprintln!("game error: resource limit exceeded: {}", reason);
            std::process::exit(1);
        }
    }
}
