use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use roomcast::{Config, Identity, Room};

#[tokio::main]
async fn main() {
    // Load configuration
    let (config, load_error) = Config::load_or_default("config.toml");
    if let Some(e) = load_error {
        eprintln!("Failed to load config.toml: {e}");
        eprintln!("Using default configuration.");
    }

    // Initialize logging
    if let Err(e) = roomcast::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        roomcast::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Run a room with a single local member reading stdin and writing stdout.
async fn run(config: Config) -> roomcast::Result<()> {
    let room = Room::new(config.room);
    let server = room.clone();
    let serve = tokio::spawn(async move { server.serve().await });

    let name = std::env::var("USER")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "console".to_string());
    let member = room.join(Identity::new(&name)?, tokio::io::stdout()).await?;
    let delivery = tokio::spawn(member.deliver());
    info!(member = %name, "console joined");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        room.send_input(&name, &line).await?;
    }

    room.leave(&name).await?;
    room.close();

    match delivery.await {
        Ok(result) => result?,
        Err(e) => error!("delivery task failed: {e}"),
    }
    match serve.await {
        Ok(result) => result?,
        Err(e) => error!("serve task failed: {e}"),
    }
    Ok(())
}
