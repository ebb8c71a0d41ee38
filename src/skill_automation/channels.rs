// Communication channels between a front end and the detection loop
use super::types::{AutomationCommand, AutomationEvent};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, timeout_at};

/// Front-end end of the channel pair: send commands, read status events
pub struct AutomationLink {
    pub commands: mpsc::Sender<AutomationCommand>,
    pub events: mpsc::Receiver<AutomationEvent>,
}

impl AutomationLink {
    /// Send a command; false once the loop has gone away
    pub async fn send(&self, command: AutomationCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Next event, or `None` on timeout or when the loop has exited
    pub async fn next_event(&mut self, wait: Duration) -> Option<AutomationEvent> {
        timeout_at(Instant::now() + wait, self.events.recv()).await.ok().flatten()
    }

    /// Read events until one satisfies `predicate`, handing every event seen
    /// (including the match) to `seen`
    pub async fn wait_for<P, S>(&mut self, wait: Duration, mut predicate: P, mut seen: S) -> Option<AutomationEvent>
    where
        P: FnMut(&AutomationEvent) -> bool,
        S: FnMut(&AutomationEvent),
    {
        let deadline = Instant::now() + wait;
        loop {
            let event = timeout_at(deadline, self.events.recv()).await.ok().flatten()?;
            seen(&event);
            if predicate(&event) {
                return Some(event);
            }
        }
    }
}

/// Create the link for the front end plus the receiver/sender pair owned by
/// the detection loop
pub fn create_automation_channels() -> (
    AutomationLink,
    mpsc::Receiver<AutomationCommand>,
    mpsc::Sender<AutomationEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(64);
    (
        AutomationLink {
            commands: cmd_tx,
            events: event_rx,
        },
        cmd_rx,
        event_tx,
    )
}
