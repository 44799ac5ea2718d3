use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use contracts::{ActorRef, ActorRole, MarketConfig};
use guild_api::{serve, MarketApi};
use guild_core::MissionDraft;

fn print_usage() {
    println!("guild-cli <command>");
    println!("commands:");
    println!("  status [market_id] [sqlite_path]");
    println!("    prints the status of a persisted market");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  scenario <market_id> [sqlite_path]");
    println!("    runs the escrow/negotiation/debt walkthrough and persists it to sqlite");
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn default_sqlite_path() -> String {
    std::env::var("GUILD_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "guild_market.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

fn show_status(args: &[String]) -> Result<(), String> {
    let market_id = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| MarketConfig::default().market_id);
    let sqlite_path = parse_sqlite_path(args.get(3));
    let api = MarketApi::load_from_store(PathBuf::from(&sqlite_path), &market_id)
        .map_err(|err| format!("failed to load market: {err}"))?;
    println!("{}", api.status());
    Ok(())
}

fn run_scenario(args: &[String]) -> Result<(), String> {
    let market_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing market_id".to_string())?;
    let sqlite_path = parse_sqlite_path(args.get(3));

    let mut config = MarketConfig::default();
    config.market_id = market_id.clone();

    let mut api = MarketApi::from_config(config);
    api.attach_sqlite_store(PathBuf::from(&sqlite_path))
        .map_err(|err| format!("failed to attach sqlite store: {err}"))?;
    api.initialize_market_storage(true)
        .map_err(|err| format!("failed to initialize market storage: {err}"))?;

    let carla = ActorRef::new("carla", ActorRole::Contractor);
    let vex = ActorRef::new("vex", ActorRole::Assassin);

    let run = |api: &mut MarketApi| -> Result<(), guild_core::MarketError> {
        api.register_user("carla")?;
        api.register_user("vex")?;
        api.purchase_coins(&carla, 1000)?;

        let (mission, change) = api.create_mission(
            &carla,
            MissionDraft {
                title: "the big one".to_string(),
                description: "quiet, clean, deniable".to_string(),
                reward: 300,
                is_private: false,
                target_assassin_id: None,
            },
        )?;
        println!(
            "mission {} open, contractor balance {}",
            mission.mission_id,
            change.balance_after
        );

        let negotiation = api.propose_negotiation(&vex, &mission.mission_id, 400)?;
        let (_, mission, change) = api.accept_negotiation(&carla, &negotiation.negotiation_id)?;
        println!(
            "negotiation accepted, reward {}, contractor balance {}",
            mission.reward,
            change.map(|c| c.balance_after).unwrap_or_default()
        );

        let (mission, change) = api.complete_mission(&vex, &mission.mission_id)?;
        println!(
            "mission {} completed, assassin balance {}",
            mission.mission_id, change.balance_after
        );

        let debt = api.create_favor_request(&vex, "carla", "covered my tracks once")?;
        api.accept_debt(&carla, &debt.debt_id)?;
        api.request_payment(&carla, &debt.debt_id, "drive the getaway car")?;
        let (debt, mark) = api.reject_payment(&vex, &debt.debt_id)?;
        println!(
            "debt {} payment refused, {} marked as target ({})",
            debt.debt_id, mark.target_user_id, mark.target_id
        );
        Ok(())
    };
    run(&mut api).map_err(|err| format!("scenario failed: {err}"))?;

    if let Some(error) = api.last_persistence_error() {
        return Err(format!("persistence error after scenario: {error}"));
    }

    println!(
        "scenario complete market_id={} sqlite={} {}",
        market_id,
        sqlite_path,
        api.status()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("status") => {
            if let Err(err) = show_status(&args) {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        }
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                println!("serving api on http://{addr}");
                if let Err(err) = serve(addr).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {}", err);
                print_usage();
                std::process::exit(2);
            }
        },
        Some("scenario") => {
            if let Err(err) = run_scenario(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
