//! Playback commands and the queue that carries them to the session thread.

use std::collections::HashSet;

use poll_promise::Promise;

use crate::source::StreamIndex;
use crate::time::{MediaDuration, MediaPoint};

/// A playback-control request.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Start or resume playback, optionally from a specific point
    Play(Option<MediaPoint>),
    /// Pause playback
    Pause,
    /// Stop playback and return to the initial image
    Stop,
    /// Seek relative to the current master clock position
    SeekByOffset(MediaDuration),
    /// Seek to an absolute point
    SeekToPoint(MediaPoint),
    /// Switch the active streams
    LoadStreams(HashSet<StreamIndex>),
}

impl CommandKind {
    /// Short name used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Play(_) => "Play",
            CommandKind::Pause => "Pause",
            CommandKind::Stop => "Stop",
            CommandKind::SeekByOffset(_) => "SeekByOffset",
            CommandKind::SeekToPoint(_) => "SeekToPoint",
            CommandKind::LoadStreams(_) => "LoadStreams",
        }
    }
}

/// Single-fulfilment boolean result of a command.
///
/// A slot that is dropped without being fulfilled resolves to `false`, so a
/// caller's promise always completes even if the session goes away first.
pub struct ResultSlot {
    sender: Option<poll_promise::Sender<bool>>,
}

impl ResultSlot {
    /// Creates a slot and the promise it fulfils.
    pub fn new() -> (Self, Promise<bool>) {
        let (sender, promise) = Promise::new();
        (
            Self {
                sender: Some(sender),
            },
            promise,
        )
    }

    /// Resolves the promise with `result`.
    pub fn fulfill(mut self, result: bool) {
        if let Some(sender) = self.sender.take() {
            sender.send(result);
        }
    }
}

impl Drop for ResultSlot {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            sender.send(false);
        }
    }
}

impl std::fmt::Debug for ResultSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSlot")
            .field("pending", &self.sender.is_some())
            .finish()
    }
}

/// A queued command together with its result slot.
#[derive(Debug)]
pub struct Command {
    pub kind: CommandKind,
    pub result: ResultSlot,
}

impl Command {
    /// Creates a command and the promise resolved once it has been applied.
    pub fn new(kind: CommandKind) -> (Self, Promise<bool>) {
        let (result, promise) = ResultSlot::new();
        (Self { kind, result }, promise)
    }
}

/// Creates a connected command queue and receiver.
pub fn command_queue() -> (CommandQueue, CommandReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (CommandQueue { tx }, CommandReceiver { rx })
}

/// Producer side of the command queue. Cloneable and usable from any thread.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: crossbeam_channel::Sender<Command>,
}

impl CommandQueue {
    /// Enqueues a command and returns the promise for its result.
    ///
    /// Never blocks. If the receiving session is gone the promise resolves
    /// to `false` immediately.
    pub fn push(&self, kind: CommandKind) -> Promise<bool> {
        let (command, promise) = Command::new(kind);
        if let Err(crossbeam_channel::SendError(command)) = self.tx.send(command) {
            tracing::debug!("{} command rejected: session is closed", command.kind.name());
            command.result.fulfill(false);
        }
        promise
    }
}

/// Consumer side of the command queue, owned by the session thread.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: crossbeam_channel::Receiver<Command>,
}

impl CommandReceiver {
    /// Returns the next queued command without blocking.
    pub fn try_pop(&self) -> Option<Command> {
        self.rx.try_recv().ok()
    }

    /// Fails every command still queued. Returns how many were failed.
    pub fn fail_pending(&self) -> usize {
        let mut failed = 0;
        while let Some(command) = self.try_pop() {
            command.result.fulfill(false);
            failed += 1;
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_pop_in_push_order() {
        let (queue, receiver) = command_queue();
        let _play = queue.push(CommandKind::Play(None));
        let _pause = queue.push(CommandKind::Pause);
        let _seek = queue.push(CommandKind::SeekToPoint(MediaPoint::from_secs(3.0)));

        let kinds: Vec<_> = std::iter::from_fn(|| receiver.try_pop())
            .map(|command| command.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Play(None),
                CommandKind::Pause,
                CommandKind::SeekToPoint(MediaPoint::from_secs(3.0)),
            ]
        );
        assert!(receiver.try_pop().is_none());
    }

    #[test]
    fn test_fulfilled_result_reaches_promise() {
        let (queue, receiver) = command_queue();
        let promise = queue.push(CommandKind::Stop);
        assert!(promise.ready().is_none());

        let Some(command) = receiver.try_pop() else {
            panic!("command should be queued");
        };
        command.result.fulfill(true);
        assert_eq!(promise.ready(), Some(&true));
    }

    #[test]
    fn test_dropped_slot_resolves_false() {
        let (command, promise) = Command::new(CommandKind::Pause);
        drop(command);
        assert_eq!(promise.ready(), Some(&false));
    }

    #[test]
    fn test_push_after_receiver_dropped_resolves_false() {
        let (queue, receiver) = command_queue();
        drop(receiver);
        let promise = queue.push(CommandKind::Play(None));
        assert_eq!(promise.ready(), Some(&false));
    }

    #[test]
    fn test_fail_pending() {
        let (queue, receiver) = command_queue();
        let first = queue.push(CommandKind::Pause);
        let second = queue.push(CommandKind::Stop);

        assert_eq!(receiver.fail_pending(), 2);
        assert_eq!(first.ready(), Some(&false));
        assert_eq!(second.ready(), Some(&false));
    }
}
