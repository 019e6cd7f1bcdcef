//! Opponent replay feed.
//!
//! A dedicated thread walks the received turn log and hands the steps to
//! the update loop through a rendezvous channel, so the thread is never
//! more than one step ahead of the simulation. The update loop only polls
//! the channel and never waits on the thread.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use darena_core::error::GameError;
use darena_core::turn_log::{ReplayStep, TurnLog};

/// Result of polling the replay feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayPoll {
    /// The next step.
    Ready(ReplayStep),
    /// The thread has not handed over the next step yet.
    Pending,
    /// Every step has been handed out.
    Finished,
}

/// Streams one opponent turn, at most one step per poll.
#[derive(Debug)]
pub struct ReplaySession {
    steps: Option<Receiver<ReplayStep>>,
    worker: Option<JoinHandle<()>>,
    owner_id: u8,
    fired: bool,
}

impl ReplaySession {
    /// Start streaming `log`.
    pub fn start(log: TurnLog) -> std::io::Result<Self> {
        let owner_id = log.owner_id;
        let (sender, receiver) = mpsc::sync_channel(0);

        let worker = thread::Builder::new()
            .name("opponent-replay".to_string())
            .spawn(move || {
                for step in log.steps() {
                    if sender.send(step).is_err() {
                        tracing::debug!("replay abandoned");
                        return;
                    }
                }
            })?;

        tracing::debug!(owner_id, "replay started");
        Ok(Self {
            steps: Some(receiver),
            worker: Some(worker),
            owner_id,
            fired: false,
        })
    }

    /// Take the next step if the replay thread is ready to hand it over.
    ///
    /// Running out before the fire step is reported as missing turn data.
    pub fn poll_step(&mut self) -> ReplayPoll {
        let Some(steps) = self.steps.as_ref() else {
            return ReplayPoll::Finished;
        };
        match steps.try_recv() {
            Ok(step) => {
                if matches!(step, ReplayStep::Fire { .. }) {
                    self.fired = true;
                }
                ReplayPoll::Ready(step)
            }
            Err(TryRecvError::Empty) => ReplayPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                if !self.fired {
                    let err = GameError::MissingTurnData(format!(
                        "replay of player {} ended before the shot",
                        self.owner_id
                    ));
                    tracing::error!(%err, "replay channel closed");
                }
                self.steps = None;
                ReplayPoll::Finished
            }
        }
    }

    /// Whether the fire step has been handed out.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }
}

impl Drop for ReplaySession {
    fn drop(&mut self) {
        // Closing the channel unblocks the worker
        self.steps = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("replay thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use darena_test_utils::fixtures::sample_turn_log;

    /// Poll until the feed yields a step or finishes.
    fn next_settled(session: &mut ReplaySession) -> ReplayPoll {
        for _ in 0..5_000 {
            match session.poll_step() {
                ReplayPoll::Pending => thread::sleep(Duration::from_millis(1)),
                settled => return settled,
            }
        }
        panic!("replay thread never handed over a step");
    }

    #[test]
    fn test_steps_arrive_in_log_order() {
        let log = sample_turn_log(1);
        let expected: Vec<ReplayStep> = log.steps().collect();

        let mut session = ReplaySession::start(log).unwrap();
        let mut received = Vec::new();
        while let ReplayPoll::Ready(step) = next_settled(&mut session) {
            received.push(step);
        }

        assert_eq!(received, expected);
        assert!(session.has_fired());
        assert_eq!(session.poll_step(), ReplayPoll::Finished);
    }

    #[test]
    fn test_empty_log_still_fires() {
        let mut session = ReplaySession::start(TurnLog::new(0)).unwrap();
        assert!(matches!(
            next_settled(&mut session),
            ReplayPoll::Ready(ReplayStep::Fire { .. })
        ));
        assert_eq!(next_settled(&mut session), ReplayPoll::Finished);
    }

    #[test]
    fn test_dropping_mid_replay_stops_the_thread() {
        let mut session = ReplaySession::start(sample_turn_log(0)).unwrap();
        assert_eq!(next_settled(&mut session), ReplayPoll::Ready(ReplayStep::Move(1)));
        drop(session);
    }
}
