use crate::engine::{CancelToken, Engine, SatResult};
use crate::error::{Error, Result};
use crate::logging::LoggingSolver;
use crate::term::Term;
use crate::walker::transfer;
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// One contestant of a [`race`]. Runs on its own thread with its own
/// engine and term table.
pub trait Racer: Send {
    fn name(&self) -> &str;
    fn run(self: Box<Self>, query: &Term, cancel: &CancelToken) -> Result<SatResult>;
}

/// Builds its engine inside the racer thread, so the engine itself need
/// not be `Send`.
pub struct EngineRacer<F> {
    name: String,
    factory: F,
}

impl<E, F> Racer for EngineRacer<F>
where
    E: Engine,
    F: FnOnce() -> Result<E> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(self: Box<Self>, query: &Term, cancel: &CancelToken) -> Result<SatResult> {
        let EngineRacer { factory, .. } = *self;
        let mut solver = LoggingSolver::new(factory()?);
        solve_query(&mut solver, query, cancel)
    }
}

/// What every racer does once its solver exists: bring the query into the
/// solver's session, assert it and check until decided or cancelled.
pub fn solve_query<E: Engine>(
    solver: &mut LoggingSolver<E>,
    query: &Term,
    cancel: &CancelToken,
) -> Result<SatResult> {
    let query = transfer(solver, query)?;
    solver.assert_formula(&query)?;
    solver.check_sat_interruptible(cancel)
}

pub fn racer<E, F>(name: impl Into<String>, factory: F) -> Box<dyn Racer>
where
    E: Engine,
    F: FnOnce() -> Result<E> + Send + 'static,
{
    Box::new(EngineRacer {
        name: name.into(),
        factory,
    })
}

#[derive(Debug)]
enum RaceState {
    Running { remaining: usize },
    Decided { winner: String, is_sat: bool },
}

/// Shared by the racers of one race only.
struct RaceOutcome {
    state: Mutex<RaceState>,
    changed: Condvar,
}

impl RaceOutcome {
    fn new(racers: usize) -> Self {
        RaceOutcome {
            state: Mutex::new(RaceState::Running { remaining: racers }),
            changed: Condvar::new(),
        }
    }

    /// First writer wins. Returns whether this call decided the race.
    fn decide(&self, winner: &str, is_sat: bool) -> bool {
        let mut state = self.state.lock();
        match *state {
            RaceState::Running { .. } => {
                *state = RaceState::Decided {
                    winner: winner.to_string(),
                    is_sat,
                };
                self.changed.notify_all();
                true
            }
            RaceState::Decided { .. } => false,
        }
    }

    /// A racer finished without an answer.
    fn abstain(&self) {
        let mut state = self.state.lock();
        if let RaceState::Running { remaining } = &mut *state {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.changed.notify_all();
            }
        }
    }

    fn wait(&self) -> Option<(String, bool)> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                RaceState::Decided { winner, is_sat } => return Some((winner.clone(), *is_sat)),
                RaceState::Running { remaining: 0 } => return None,
                RaceState::Running { .. } => {}
            }
            self.changed.wait(&mut state);
        }
    }
}

/// Runs every racer on `query` and returns the first SAT/UNSAT answer.
///
/// Losers are cancelled through a shared token; engines that cannot be
/// interrupted run to completion on their detached thread and their answer
/// is dropped. Fails with `Undecided` when no racer answers.
pub fn race(racers: Vec<Box<dyn Racer>>, query: &Term) -> Result<bool> {
    if racers.is_empty() {
        return Err(Error::usage("a race needs at least one racer"));
    }
    query.sort().expect_bool()?;

    let outcome = Arc::new(RaceOutcome::new(racers.len()));
    let cancel = CancelToken::new();
    for racer in racers {
        let name = racer.name().to_string();
        let thread_outcome = outcome.clone();
        let thread_cancel = cancel.clone();
        let query = query.clone();
        let spawned = thread::Builder::new()
            .name(format!("racer-{}", name))
            .spawn(move || {
                debug!("racer {} started", name);
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| racer.run(&query, &thread_cancel)));
                match result {
                    Ok(Ok(res)) if res.is_decided() => {
                        debug!("racer {} finished: {}", name, res);
                        thread_outcome.decide(&name, res.is_sat());
                    }
                    Ok(Ok(res)) => {
                        debug!("racer {} finished: {}", name, res);
                        thread_outcome.abstain();
                    }
                    Ok(Err(e)) => {
                        warn!("racer {} failed: {}", name, e);
                        thread_outcome.abstain();
                    }
                    Err(_) => {
                        warn!("racer {} panicked", name);
                        thread_outcome.abstain();
                    }
                }
            });
        if let Err(e) = spawned {
            warn!("could not start a racer thread: {}", e);
            outcome.abstain();
        }
    }

    let decided = outcome.wait();
    cancel.cancel();
    match decided {
        Some((winner, is_sat)) => {
            info!("{} won the race: {}", winner, if is_sat { "sat" } else { "unsat" });
            Ok(is_sat)
        }
        None => Err(Error::Undecided),
    }
}
