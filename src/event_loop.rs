use std::io;
use std::time::Duration;

use crossterm::event::Event;

use crate::drivers::InputDriver;

pub enum ControlFlow {
    Continue,
    Quit,
}

/// Single-threaded message pump for the simulator.
///
/// Input polling doubles as the timer wait: each iteration sleeps in
/// `driver.poll()` until input arrives or the next timer deadline is due,
/// whichever comes first, but never longer than `max_wait`.
pub struct EventLoop<D> {
    driver: D,
    max_wait: Duration,
}

impl<D: InputDriver> EventLoop<D> {
    pub fn new(driver: D, max_wait: Duration) -> Self {
        Self { driver, max_wait }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Time to sleep when the next timer fires in `until_deadline`.
    pub fn wait_for(&self, until_deadline: Option<Duration>) -> Duration {
        until_deadline.map_or(self.max_wait, |left| left.min(self.max_wait))
    }

    /// Runs until the handler asks to quit.
    ///
    /// `next_timer` reports how long until the next scheduled task. The
    /// handler receives `None` once per iteration, after the wait, so it can
    /// run due timers and redraw, and `Some(event)` for every input event.
    pub fn run<T, F>(&mut self, mut next_timer: T, mut handler: F) -> io::Result<()>
    where
        T: FnMut() -> Option<Duration>,
        F: FnMut(&mut D, Option<Event>) -> io::Result<ControlFlow>,
    {
        loop {
            if let ControlFlow::Quit = handler(&mut self.driver, None)? {
                break;
            }

            let wait = self.wait_for(next_timer());
            if self.driver.poll(wait)? {
                // drain bursts (mouse motion) before the next redraw
                loop {
                    let event = self.driver.read()?;
                    if let ControlFlow::Quit = handler(&mut self.driver, Some(event))? {
                        return Ok(());
                    }
                    if !self.driver.poll(Duration::from_millis(0))? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}
