use clap::Parser;
use rocket::{error, info, warn};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Serves the fleet API: workspaces, environments, equipment, time routines,
/// occupancy automations, alerts and energy reports.
#[derive(Parser)]
#[command(name = "hvac-api", version, about = "HVAC fleet management API server")]
struct Cli {
    /// Print build details (commit, profile, compiler) and exit
    #[arg(long)]
    version_info: bool,
}

fn build_summary() -> String {
    let commit = built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown commit");
    let dirty = if built_info::GIT_DIRTY == Some(true) { "+dirty" } else { "" };
    format!(
        "{}{} {} build for {}, {}",
        commit,
        dirty,
        built_info::PROFILE,
        built_info::TARGET,
        built_info::RUSTC_VERSION
    )
}

#[rocket::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version_info {
        println!("hvac-api {}", built_info::PKG_VERSION);
        println!("{}", build_summary());
        println!("Built at {}", built_info::BUILT_TIME_UTC);
        return;
    }

    info!("hvac-api {} ({})", built_info::PKG_VERSION, build_summary());
    dotenvy::dotenv().ok();
    if std::env::var("HVAC_DEFAULT_PASSWORD").is_err() {
        warn!("HVAC_DEFAULT_PASSWORD is not set; the bootstrap admin gets the stock password");
    }

    if let Err(e) = hvac_api::rocket().launch().await {
        error!("hvac-api stopped: {}", e);
        std::process::exit(1);
    }
}
