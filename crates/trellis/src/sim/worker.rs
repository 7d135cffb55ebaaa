use super::engine::{SimulationEngine, StepOutcome};
use super::protocol::{Command, EngineEvent};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

/// The caller's end of one simulation thread: a command sender, an event receiver and the join
/// handle. Dropping it closes the command channel and joins the thread.
#[derive(Debug)]
pub(crate) struct Worker {
    commands: Option<Sender<Command>>,
    events: Receiver<EngineEvent>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn() -> std::io::Result<Self> {
        let (command_tx, command_rx) = channel::unbounded();
        let (event_tx, event_rx) = channel::unbounded();
        let thread = thread::Builder::new()
            .name("trellis-sim".to_string())
            .spawn(move || run(command_rx, event_tx))?;
        Ok(Self {
            commands: Some(command_tx),
            events: event_rx,
            thread: Some(thread),
        })
    }

    /// Returns `false` when the thread is gone.
    pub(crate) fn send(&self, command: Command) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok())
    }

    pub(crate) fn try_recv(&self) -> Result<EngineEvent, TryRecvError> {
        self.events.try_recv()
    }

    pub(crate) fn shutdown(&mut self) {
        self.commands.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::warn!("simulation thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum Flow {
    Continue,
    Exit,
}

fn dispatch(engine: &mut SimulationEngine, command: Command, events: &Sender<EngineEvent>) -> Flow {
    match engine.handle(command) {
        Some(event) => {
            if events.send(event).is_err() {
                Flow::Exit
            } else {
                Flow::Continue
            }
        }
        None => Flow::Continue,
    }
}

fn run(commands: Receiver<Command>, events: Sender<EngineEvent>) {
    let mut engine = SimulationEngine::default();
    tracing::debug!("simulation thread started");

    loop {
        if !engine.is_running() {
            let Ok(command) = commands.recv() else {
                break;
            };
            if let Flow::Exit = dispatch(&mut engine, command, &events) {
                break;
            }
            continue;
        }

        let mut exit = false;
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if let Flow::Exit = dispatch(&mut engine, command, &events) {
                        exit = true;
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    exit = true;
                    break;
                }
            }
        }
        if exit {
            break;
        }
        if !engine.is_running() {
            continue;
        }

        let outgoing = match catch_unwind(AssertUnwindSafe(|| engine.step())) {
            Ok(Ok(outcome)) => {
                let mut out = vec![EngineEvent::PositionsUpdate {
                    positions: engine.positions(),
                    energy: engine.energy(),
                }];
                if outcome == StepOutcome::Settled {
                    tracing::debug!(steps = engine.steps(), energy = engine.energy(), "simulation settled");
                    out.push(EngineEvent::Stopped {
                        energy: engine.energy(),
                    });
                }
                out
            }
            Ok(Err(err)) => {
                engine.stop();
                vec![EngineEvent::Error {
                    error: err.to_string(),
                }]
            }
            Err(_) => {
                engine.stop();
                vec![EngineEvent::Error {
                    error: "simulation step panicked".to_string(),
                }]
            }
        };
        if outgoing.into_iter().any(|e| events.send(e).is_err()) {
            break;
        }

        let tick = engine.settings().tick_interval();
        if tick.is_zero() {
            continue;
        }
        match commands.recv_timeout(tick) {
            Ok(command) => {
                if let Flow::Exit = dispatch(&mut engine, command, &events) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::debug!("simulation thread exiting");
}
