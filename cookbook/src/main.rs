use std::path::Path;

use clap::Parser;
use cookbook::api::rate_limiting::setup_reaper;
use cookbook::app_state::AppState;
use cookbook::http::setup_http_server;
use cookbook::init_telemetry;
use cookbook::settings::config::Settings;
use tokio::time::sleep;
use tracing::info;

#[derive(Parser)]
#[command(name = "cookbook")]
#[command(about = "A small recipe manager with an adaptively rate limited API")]
#[clap(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser)]
enum Commands {
    /// Show current configuration and exit
    Config,
    /// Start the cookbook server (default)
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env.local wins over .env, real environment variables win over both
    dotenvy::from_path(Path::new(".env.local")).ok();
    dotenvy::from_path(Path::new(".env")).ok();

    let cli = Cli::parse();

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Config => {
            let settings = Settings::new()?;
            println!("{:#?}", &settings);
            return Ok(());
        }
        Commands::Run => {}
    }

    let app_state = AppState::new().await?;
    init_telemetry::init_tracing(app_state.settings.api.log_format)?;

    let mut handles = vec![];

    {
        let handle =
            setup_http_server(app_state.clone(), &app_state.settings.api.bind_address).await?;
        handles.push(handle);
    }

    if let Some(security) = &app_state.security {
        let handle = setup_reaper(security.clone(), app_state.stop_flag.clone());
        handles.push(handle);
    }

    sleep(std::time::Duration::from_millis(100)).await;

    loop {
        handles.retain(|handle| !handle.is_finished());

        if handles.is_empty() {
            info!("All tasks are done");
            break;
        }

        sleep(std::time::Duration::from_millis(200)).await;
    }

    Ok(())
}
