use clap::Parser;
use log::info;

use shared::policy::policy_by_name;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:7878")]
    server: String,

    /// Display name to play under
    #[arg(short, long)]
    name: String,

    /// Matchmaking channel (empty for the open channel)
    #[arg(short, long, default_value = "")]
    channel: String,

    /// Built-in agent making the decisions (random or greedy)
    #[arg(short, long, default_value = "random")]
    agent: String,

    /// Game variant the server is refereeing (siege or blast)
    #[arg(short, long, default_value = "blast")]
    game: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let policy =
        policy_by_name(&args.agent).ok_or_else(|| format!("unknown agent {:?}", args.agent))?;
    let (host, port) = match args.server.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse::<u16>()?),
        None => return Err(format!("invalid server address {:?}", args.server).into()),
    };

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let result = client::network::connect_and_play(
        policy,
        &args.name,
        &args.channel,
        &host,
        port,
        &args.game,
    )
    .await?;

    println!("{}", result);
    Ok(())
}
