//! A cancellable one-shot timer on its own thread.
//!
//! The owner sends commands over a channel; the thread sleeps in a
//! `select!` on the command channel and the current deadline. When the
//! deadline passes the handler runs on the timer thread.
//!
//! The handler typically takes the host lock. Whoever stops the timer must
//! therefore not hold that lock while joining, or the two threads wait on
//! each other forever.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    SetTimeout(Duration),
    Cancel,
    Stop,
}

#[derive(Debug)]
pub struct Timer {
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    /// Starts the timer thread. No deadline is armed.
    pub fn spawn<F>(name: &str, handler: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (commands, rx) = unbounded();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(rx, handler))?;
        Ok(Self {
            commands,
            handle: Some(handle),
        })
    }

    /// Arms the timer to fire `after` from now, replacing any earlier
    /// deadline.
    pub fn set_timeout(&self, after: Duration) {
        // A send only fails once the thread has exited, when there is
        // nothing left to arm.
        let _ = self.commands.send(Command::SetTimeout(after));
    }

    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel);
    }

    /// Stops the thread and waits for it. A handler already running is
    /// allowed to finish first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.commands.send(Command::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("timer thread panicked");
            }
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            // Don't join from drop: the dropping thread may hold the lock
            // the handler needs.
            let _ = self.commands.send(Command::Stop);
        }
    }
}

fn run<F: FnMut()>(commands: Receiver<Command>, mut handler: F) {
    let mut deadline: Option<Instant> = None;
    loop {
        let fire = match deadline {
            Some(at) => crossbeam_channel::at(at),
            None => crossbeam_channel::never(),
        };
        select! {
            recv(commands) -> command => match command {
                Ok(Command::SetTimeout(after)) => deadline = Some(Instant::now() + after),
                Ok(Command::Cancel) => deadline = None,
                Ok(Command::Stop) | Err(_) => return,
            },
            recv(fire) -> _ => {
                deadline = None;
                handler();
            }
        }
    }
}
