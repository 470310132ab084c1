use std::{sync::Arc, time::Duration};

use clap::Parser;
use darshan_logic::{
    AppLifecycle, CompassSession, Coordinate, DisplayState, SessionSettings, SessionSnapshot,
    TurnDirection, format_distance,
};
use darshan_sim_shared::*;
use darshan_store::HttpTargetStore;
use log::{error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

type Session = CompassSession<SimLocation, SimHeading, SimStore, LogHaptics, NotifySender>;

#[derive(Parser)]
/// Run a compass session against simulated sensors, printing what the compass screen would show.
///
/// While running, type `close`, `reset`, `bg`, `fg`, `show` or `quit` followed by enter.
struct Cli {
    /// Latitude of the simulated user
    #[arg(long, default_value_t = 12.2958, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude of the simulated user
    #[arg(long, default_value_t = 76.6394, allow_negative_numbers = true)]
    long: f64,
    /// Scatter each position fix up to this many meters
    #[arg(long, default_value_t = 0.0)]
    jitter: f64,
    /// Heading the user starts out facing
    #[arg(long, default_value_t = 0.0)]
    start: f64,
    /// Degrees per second the user turns, negative turns left
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    rate: f64,
    /// Base URL of a location server to read the target from, uses the built-in default
    /// target when left out
    #[arg(long)]
    server: Option<String>,
    /// Simulate the user refusing location permission
    #[arg(long)]
    deny_permission: bool,
    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,
    /// Minimum milliseconds between printed snapshots
    #[arg(long, default_value_t = 500)]
    print_ms: u64,
}

fn describe(snapshot: &SessionSnapshot) -> String {
    match snapshot.display_state() {
        DisplayState::Loading => "Loading...".to_string(),
        DisplayState::Error => format!(
            "Error: {}",
            snapshot.error.as_deref().unwrap_or("unknown")
        ),
        DisplayState::WaitingForData => "Waiting for location data".to_string(),
        DisplayState::Ready => {
            let bearing = snapshot
                .bearing_data
                .as_ref()
                .map(|b| b.bearing_degrees)
                .unwrap_or_default();
            let mut line = format!(
                "heading {:>5.1}  bearing {:>5.1}  {}",
                snapshot.heading,
                bearing,
                format_distance(snapshot.distance_km)
            );

            if let Some(alignment) = snapshot.alignment {
                match alignment.turn_direction {
                    None => line.push_str("  ALIGNED"),
                    Some(TurnDirection::Left) => line.push_str(&format!(
                        "  turn left {:.0}",
                        alignment.turn_angle_degrees
                    )),
                    Some(TurnDirection::Right) => line.push_str(&format!(
                        "  turn right {:.0}",
                        alignment.turn_angle_degrees
                    )),
                }
            }

            if snapshot.should_show_overlay {
                line.push_str("  [darshan]");
            }

            if let Some(err) = snapshot.error.as_deref() {
                line.push_str(&format!("  ({err})"));
            }

            line
        }
    }
}

fn print_snapshot(snapshot: &SessionSnapshot, json: bool) -> Result {
    if json {
        let encoded = serde_json::to_string(snapshot).context("Failed to encode snapshot")?;
        println!("{encoded}");
    } else {
        println!("{}", describe(snapshot));
    }
    Ok(())
}

fn report(res: Result<Result, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => info!("Session ended"),
        Ok(Err(why)) => error!("Session failed: {why:?}"),
        Err(why) => error!("Session task died: {why:?}"),
    }
}

async fn handle_command(session: &Session, cmd: SimCommand, json: bool) -> Result<bool> {
    match cmd {
        SimCommand::Close => session.close_darshan().await,
        SimCommand::Reset => session.reset_darshan_state().await,
        SimCommand::Background => session.set_app_state(AppLifecycle::Background).await,
        SimCommand::Foreground => session.set_app_state(AppLifecycle::Foreground).await,
        SimCommand::Show => print_snapshot(&session.snapshot().await, json)?,
        SimCommand::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    let position = Coordinate::new(cli.lat, cli.long);
    if !position.is_valid() {
        bail!("{position} is not a valid coordinate");
    }

    let settings = SessionSettings::default();

    let store = match cli.server.as_deref() {
        Some(url) => {
            info!("Reading target from {url}");
            SimStore::Http(HttpTargetStore::with_base_url(url)?)
        }
        None => SimStore::Memory(MemoryTargetStore::with_default(&settings)),
    };

    let mut location = SimLocation::new(position, Duration::from_secs(1)).with_jitter(cli.jitter);
    if cli.deny_permission {
        location = location.denying();
    }

    let (update_tx, mut update_rx) = mpsc::channel(1);

    let session = Arc::new(Session::new(
        settings,
        location,
        SimHeading::new(cli.start, cli.rate),
        store,
        LogHaptics::default(),
        NotifySender::new(update_tx),
    ));

    let mut main: JoinHandle<Result> = tokio::spawn({
        let session = session.clone();
        async move { session.main_loop().await }
    });
    let mut main_done = false;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut printer = tokio::time::interval(Duration::from_millis(cli.print_ms.max(50)));
    let mut dirty = true;

    loop {
        tokio::select! {
            res = &mut main => {
                main_done = true;
                report(res);
                print_snapshot(&session.snapshot().await, cli.json)?;
                break;
            }

            Ok(_) = tokio::signal::ctrl_c() => {
                break;
            }

            Some(()) = update_rx.recv() => {
                dirty = true;
            }

            _ = printer.tick(), if dirty => {
                dirty = false;
                print_snapshot(&session.snapshot().await, cli.json)?;
            }

            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match line.parse::<SimCommand>() {
                        Ok(cmd) => {
                            if !handle_command(&session, cmd, cli.json).await? {
                                break;
                            }
                        }
                        Err(why) => warn!("{why}"),
                    },
                    Ok(None) => {
                        stdin_open = false;
                    }
                    Err(why) => {
                        warn!("Failed to read stdin: {why:?}");
                        stdin_open = false;
                    }
                }
            }
        }
    }

    session.teardown().await;

    if !main_done {
        report(main.await);
    }

    Ok(())
}
