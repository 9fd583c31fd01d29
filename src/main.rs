use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{Event, MouseEventKind};
use indoc::indoc;
use ratatui::layout::Rect;

use term_dock::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use term_dock::drivers::{InputDriver, OutputDriver};
use term_dock::event_loop::{ControlFlow, EventLoop};
use term_dock::log_buffer::{self, DEFAULT_MAX_LINES, LogBuffer};
use term_dock::scheduler::{Clock, MonotonicClock};
use term_dock::sim::render::{desktop_area, draw};
use term_dock::sim::{CONNECTORS, SimOptions, Simulator, action_for};
use term_dock::tracing_sub;

const KEYS: &str = indoc! {"
    Keys:
      1-4        connect or disconnect a screen
      p          make the next screen primary
      a / n      add an on-primary / pinned panel
      d          remove the selected panel
      tab        select the next panel
      v          cycle the visibility mode
      o          pin or unpin the selected panel
      r          raise temporarily
      b          block hiding
      g          drag over the panel
      e          toggle the edge sentinel
      c          recreate the view
      w / m / x  active window / maximize it / another window
      k / t      switch desktop / activity
      l          activate or deactivate the layout
      q          quit
"};

#[derive(Parser, Debug)]
#[command(
    name = "term-dock",
    version = env!("CARGO_PKG_VERSION"),
    about = "Simulated multi-screen desktop for exercising panel placement and auto-hide",
    after_help = KEYS
)]
struct Cli {
    /// Screens connected at startup.
    #[arg(short = 's', long = "screens", value_name = "COUNT", default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(1..=4))]
    screens: u8,

    /// On-primary panels created at startup.
    #[arg(short = 'p', long = "panels", value_name = "COUNT", default_value_t = 1)]
    panels: u8,

    /// Hide delay written to new panels.
    #[arg(long = "timer-hide", value_name = "MS", default_value_t = 700)]
    timer_hide_ms: u64,

    /// Longest wait between redraws when no timer is due.
    #[arg(long = "tick", value_name = "MS", default_value_t = 50)]
    tick_ms: u64,
}

impl Cli {
    fn options(&self) -> SimOptions {
        SimOptions {
            screens: usize::from(self.screens).min(CONNECTORS.len()),
            panels: usize::from(self.panels),
            timer_hide: Duration::from_millis(self.timer_hide_ms),
        }
    }

    fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let log = LogBuffer::new(DEFAULT_MAX_LINES);
    log_buffer::set_global_log(log.clone());
    log_buffer::install_panic_hook();
    tracing_sub::init_default();

    let (columns, rows) = crossterm::terminal::size()?;
    let clock = Rc::new(MonotonicClock::new());
    let mut sim = Simulator::new(
        cli.options(),
        desktop_area(Rect::new(0, 0, columns, rows)),
        clock.clone(),
    );
    tracing::info!(screens = cli.screens, panels = cli.panels, "simulator started");

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let mut input = ConsoleInputDriver::new();
    input.set_mouse_capture(true)?;

    let deadline = Cell::new(sim.next_deadline());
    let mut event_loop = EventLoop::new(input, cli.tick());
    let result = event_loop.run(
        || deadline.get().map(|at| at.saturating_sub(clock.now())),
        |_, event| {
            match event {
                None => {
                    sim.tick();
                    output.draw(|frame| draw(frame, &sim, Some(&log)))?;
                }
                Some(Event::Key(key)) => {
                    if let Some(action) = action_for(key)
                        && !sim.apply(action)
                    {
                        return Ok(ControlFlow::Quit);
                    }
                }
                Some(Event::Mouse(mouse)) => {
                    if matches!(
                        mouse.kind,
                        MouseEventKind::Moved | MouseEventKind::Drag(_)
                    ) {
                        sim.pointer_moved(mouse.column, mouse.row);
                    }
                }
                Some(Event::Resize(columns, rows)) => {
                    sim.resize(desktop_area(Rect::new(0, 0, columns, rows)));
                }
                Some(_) => {}
            }
            deadline.set(sim.next_deadline());
            Ok(ControlFlow::Continue)
        },
    );

    event_loop.driver().set_mouse_capture(false)?;
    output.exit()?;
    result
}
