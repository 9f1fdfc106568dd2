use anyhow::{anyhow, Context, Result};
use audioscrobbler_client::config::Config;
use audioscrobbler_client::login;
use audioscrobbler_client::player::{PlannedTrack, PlayerHandle, SimulatedPlayer};
use audioscrobbler_client::scrobbler::{token, SessionState};
use audioscrobbler_client::transport::HttpTransport;
use audioscrobbler_client::{Event, PlaybackScrobbler, PlaybackSource};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "audioscrobbler")]
#[command(about = "Audioscrobbler 1.2.1 client: now playing and scrobble submission")]
#[command(version)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the handshake token for a password and timestamp
    Token { password: String, timestamp: String },

    /// Log in with the configured account and print the session
    Handshake,

    /// Play tracks on a simulated player and scrobble them
    Play {
        /// Track as "Artist|Title|Album|Seconds" (album may be empty)
        #[arg(long = "track", required = true)]
        tracks: Vec<PlannedTrack>,

        /// Playback speed multiplier
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },

    /// Prompt for credentials, verify them and enable scrobbling
    Login,

    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the configuration with the password masked
    Show,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));

    if !atty::is(atty::Stream::Stderr) {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command {
        Command::Token {
            password,
            timestamp,
        } => {
            println!("{}", token(&password, &timestamp));
        }
        Command::Handshake => {
            let mut config = Config::load_from(&config_path)?;
            config.account.enabled = true;
            config.validate()?;

            let session_id = verify_login(&config)?;
            println!("Authenticated as {}, session {}", config.account.username, session_id);
        }
        Command::Play { tracks, speed } => {
            let config = Config::load_from(&config_path)?;
            play(&config, tracks, speed)?;
        }
        Command::Login => {
            let mut config = Config::load_from(&config_path)?;
            let credentials = login::prompt_credentials()?;

            config.account.enabled = true;
            config.account.username = credentials.username;
            config.account.password = credentials.password;

            println!("\nLogging in...");
            verify_login(&config)?;
            config.save_to(&config_path)?;
            println!("Logged in as {}. Scrobbling enabled.", config.account.username);
        }
        Command::Config { action } => match action {
            ConfigAction::Path => println!("{}", config_path.display()),
            ConfigAction::Show => {
                let config = Config::load_from(&config_path)?;
                print!("{}", config.redacted()?);
            }
        },
    }

    Ok(())
}

/// Run one handshake and return the session id
fn verify_login(config: &Config) -> Result<String> {
    let (tx, rx) = mpsc::channel::<Event>();
    let transport = HttpTransport::new(tx, config.service.timeout());
    let mut scrobbler = PlaybackScrobbler::new(config, PlayerHandle::default(), transport);

    scrobbler.start();
    run_event_loop(&mut scrobbler, &rx, || true, grace_period(config));

    if let SessionState::Authenticated(session) = scrobbler.session_state() {
        return Ok(session.id.clone());
    }

    match scrobbler.handshake_error() {
        Some(e) => Err(anyhow!(e.clone())).context("Login failed"),
        None => Err(anyhow!(
            "No handshake reply within {}s",
            grace_period(config).as_secs()
        )),
    }
}

fn play(config: &Config, tracks: Vec<PlannedTrack>, speed: f64) -> Result<()> {
    if !config.account.enabled {
        log::warn!("Scrobbling is disabled; run `audioscrobbler login` first");
    }

    let (tx, rx) = mpsc::channel::<Event>();
    let player = SimulatedPlayer::new(tracks, speed);
    let transport = HttpTransport::new(tx.clone(), config.service.timeout());
    let mut scrobbler = PlaybackScrobbler::new(config, player.handle(), transport);

    scrobbler.start();
    let playing = player.spawn(tx);
    run_event_loop(&mut scrobbler, &rx, || playing.is_finished(), grace_period(config));

    playing
        .join()
        .map_err(|_| anyhow!("Player thread panicked"))?;

    if scrobbler.queue_len() > 0 {
        log::warn!(
            "{} track(s) were not submitted and will be lost on exit",
            scrobbler.queue_len()
        );
    }

    Ok(())
}

/// How long to wait for outstanding replies once there is nothing else to do
fn grace_period(config: &Config) -> Duration {
    config.service.timeout() + Duration::from_secs(1)
}

/// Feed events to the scrobbler until `done` holds and no request is
/// outstanding, or until `grace` has passed since `done` first held
fn run_event_loop<P: PlaybackSource>(
    scrobbler: &mut PlaybackScrobbler<P, HttpTransport<Event>>,
    events: &Receiver<Event>,
    mut done: impl FnMut() -> bool,
    grace: Duration,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => scrobbler.handle(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if deadline.is_none() && done() {
            deadline = Some(Instant::now() + grace);
        }

        if let Some(deadline) = deadline {
            if !scrobbler.has_pending_requests() {
                // Drain anything the player queued before finishing
                while let Ok(event) = events.try_recv() {
                    scrobbler.handle(event);
                }
                if !scrobbler.has_pending_requests() {
                    break;
                }
            }
            if Instant::now() >= deadline {
                log::warn!("Giving up on outstanding requests");
                break;
            }
        }
    }
}
