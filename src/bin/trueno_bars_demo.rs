//! trueno-bars-demo - animated bar card in the terminal.
//!
//! Usage: `trueno-bars-demo [CARD.yaml] [STATES.yaml]`
//!
//! Paths default to `trueno-bars/card.yaml` and `trueno-bars/states.yaml` in
//! the user config directory. The states file is re-read every second, so
//! editing it while the demo runs animates the bars. Without a card file a
//! starter card is built from the `sensor.` entities of the states file.
//!
//! Logs go to `trueno-bars-demo.log` in the temp directory, filtered by
//! `TRUENO_BARS_LOG` (e.g. `TRUENO_BARS_LOG=trueno_bars=trace`).

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::fs::File;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use trueno_bars::card::BarCard;
use trueno_bars::config::{normalize, stub_config, RawCardConfig};
use trueno_bars::output::TerminalSink;
use trueno_bars::provider::StateSnapshot;
use trueno_bars::Error;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const IDLE_INTERVAL: Duration = Duration::from_millis(100);
const RELOAD_INTERVAL: Duration = Duration::from_secs(1);

type Card = BarCard<TerminalSink<CrosstermBackend<io::Stdout>>>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let base = dirs::config_dir().map(|p| p.join("trueno-bars")).unwrap_or_default();
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let card_path = args.next().unwrap_or_else(|| base.join("card.yaml"));
    let states_path = args.next().unwrap_or_else(|| base.join("states.yaml"));

    let states = load_states(&states_path).unwrap_or_else(StateSnapshot::new);
    let raw = match RawCardConfig::load(&card_path) {
        Ok(raw) => raw,
        Err(Error::ConfigNotFound(path)) => {
            tracing::info!(%path, "no card file, using starter card");
            stub_config(&states)
        }
        Err(e) => return Err(e.into()),
    };
    let config = normalize(&raw)?;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut card = BarCard::new(config, TerminalSink::new(terminal));

    let result = run(&mut card, &states_path, &states);

    let mut sink = card.into_sink();
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    sink.terminal_mut().show_cursor()?;

    result.map_err(Into::into)
}

fn run(card: &mut Card, states_path: &Path, initial: &StateSnapshot) -> trueno_bars::Result<()> {
    let clock = Instant::now();
    let now_ms = || clock.elapsed().as_secs_f64() * 1000.0;

    card.update(initial, now_ms())?;
    card.render()?;
    let mut last_reload = Instant::now();
    let mut reload_now = false;

    loop {
        if reload_now || last_reload.elapsed() >= RELOAD_INTERVAL {
            last_reload = Instant::now();
            reload_now = false;
            if let Some(states) = load_states(states_path) {
                card.update(&states, now_ms())?;
            }
        }

        card.frame(now_ms())?;

        let timeout = if card.is_animating() { FRAME_INTERVAL } else { IDLE_INTERVAL };
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('r') => reload_now = true,
                    _ => {}
                },
                Event::Resize(..) => card.render()?,
                _ => {}
            }
        }
    }

    card.teardown();
    Ok(())
}

fn load_states(path: &Path) -> Option<StateSnapshot> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read states");
            return None;
        }
    };
    match StateSnapshot::parse(&text) {
        Ok(states) => Some(states),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid states file");
            None
        }
    }
}

fn init_logging() {
    let path = std::env::temp_dir().join("trueno-bars-demo.log");
    let Ok(file) = File::create(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("TRUENO_BARS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(Mutex::new(file)).with_ansi(false).init();
}
