//! Relay Demo: one producer feeding three terminal panes at three resolutions.
//!
//! The producer thread renders a scene and resamples every frame to
//! 160x90, 640x480 and 1024x768; each pane scales its bitmap to the cells it
//! owns. Logs go to `relay_demo.log` in the current directory.
//!
//! Usage: `cargo run --example relay_demo -- [scene] [frame-limit]`
//!
//! Press 'q' or Escape to quit.

use bitmap_relay::terminal::Region;
use bitmap_relay::{
    RenderTarget, RenderTargetSet, Resolution, SceneConfig, Session, SessionConfig,
    TerminalSurface,
};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::{cursor, execute, terminal};
use std::fs::File;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const RESOLUTIONS: [(u32, u32); 3] = [(160, 90), (640, 480), (1024, 768)];

fn main() -> io::Result<()> {
    let log = File::create("relay_demo.log")?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let scene_name = args.next().unwrap_or_else(|| "plasma".to_string());
    let frame_limit = args.next().and_then(|arg| arg.parse::<u64>().ok());

    let (width, height) = terminal::size()?;
    let panes = Region::new(0, 1, width, height.saturating_sub(2)).split_columns(3, 1);

    let targets: RenderTargetSet = RESOLUTIONS
        .iter()
        .zip(&panes)
        .map(|(&(w, h), pane)| RenderTarget::new(Resolution::new(w, h), TerminalSurface::stdout(*pane)))
        .collect();

    let mut scene = SceneConfig::new(1024, 768, scene_name);
    if let Some(limit) = frame_limit {
        scene = scene.with_frame_limit(limit);
    }
    let config = SessionConfig {
        scene,
        ..SessionConfig::default()
    };

    let mut session = match Session::new(targets, config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("relay_demo: {e}");
            std::process::exit(1);
        }
    };

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide, terminal::Clear(terminal::ClearType::All))?;

    let result = run(&mut session, &panes, height);

    execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    let stats = session.stats();
    println!("Relay demo finished: {:?}", session.state());
    println!(
        "presented {} frames | stale {} | mismatched {} | faults {}",
        stats.frames_presented, stats.stale_batches, stats.mismatched_batches, stats.faults
    );
    result
}

fn run(session: &mut Session, panes: &[Region], height: u16) -> io::Result<()> {
    draw_labels(panes)?;
    let start = Instant::now();
    let mut last_status = Instant::now();

    loop {
        let running = session
            .run_for(Duration::from_millis(50))
            .map_err(io::Error::other)?;
        if !running {
            // Show the final state until a key is pressed.
            draw_status(session, start, height)?;
            let _ = event::read()?;
            return Ok(());
        }

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    session.terminate();
                    return Ok(());
                }
            }
        }

        if last_status.elapsed() >= Duration::from_millis(250) {
            draw_status(session, start, height)?;
            last_status = Instant::now();
        }
    }
}

fn draw_labels(panes: &[Region]) -> io::Result<()> {
    let mut stdout = io::stdout();
    for (pane, (w, h)) in panes.iter().zip(RESOLUTIONS) {
        execute!(stdout, cursor::MoveTo(pane.x, 0))?;
        write!(stdout, "{w}x{h}")?;
    }
    stdout.flush()
}

#[allow(clippy::cast_precision_loss)]
fn draw_status(session: &Session, start: Instant, height: u16) -> io::Result<()> {
    let stats = session.stats();
    let elapsed = start.elapsed().as_secs_f32();
    let fps = if elapsed > 0.0 {
        stats.frames_presented as f32 / elapsed
    } else {
        0.0
    };

    let mut stdout = io::stdout();
    execute!(
        stdout,
        cursor::MoveTo(0, height.saturating_sub(1)),
        terminal::Clear(terminal::ClearType::CurrentLine)
    )?;
    write!(
        stdout,
        "Press 'q' to quit | {} | frames: {} | fps: {fps:.1} | in flight: {}",
        session.state().name(),
        stats.frames_presented,
        session.in_flight()
    )?;
    stdout.flush()
}
