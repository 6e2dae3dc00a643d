use std::time::Duration;

use color_eyre::eyre::Result;
use futures::stream::StreamExt;
use ratatui::{Terminal, prelude::Backend};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    application::Application,
    command::{Action, Command},
    subscription::SubscriptionManager,
};

/// Drives an [`Application`]: executes commands, keeps subscriptions in sync
/// and redraws the terminal.
pub struct Runtime<A: Application> {
    app: A,
    init: Option<Command<A::Message>>,
    tx: mpsc::UnboundedSender<Action<A::Message>>,
    rx: mpsc::UnboundedReceiver<Action<A::Message>>,
    subscriptions: SubscriptionManager<A::Message>,
}

impl<A: Application> Runtime<A> {
    pub fn new(flags: A::Flags) -> Self {
        let (app, init) = A::new(flags);
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriptions = SubscriptionManager::new(tx.clone());

        Self {
            app,
            init: Some(init),
            tx,
            rx,
            subscriptions,
        }
    }

    /// The application state.
    pub const fn app(&self) -> &A {
        &self.app
    }

    fn execute(&self, cmd: Command<A::Message>) {
        if let Some(mut stream) = cmd.stream {
            let tx = self.tx.clone();
            tokio::spawn(async move {
                while let Some(action) = stream.next().await {
                    if tx.send(action).is_err() {
                        break;
                    }
                }
            });
        }
    }

    /// Runs the event loop until the application requests `Action::Quit`.
    ///
    /// The frame is redrawn at most `frame_rate` times per second, and only
    /// after something changed. Quit is handled as soon as it arrives rather
    /// than on the next frame.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing to the terminal fails.
    pub async fn run<B: Backend>(mut self, terminal: &mut Terminal<B>, frame_rate: u32) -> Result<()> {
        let frame = Duration::from_millis(1000 / u64::from(frame_rate.max(1)));
        let mut ticker = interval(frame);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if let Some(init) = self.init.take() {
            self.execute(init);
        }
        self.subscriptions.update(self.app.subscriptions());
        terminal.draw(|f| self.app.view(f))?;

        let mut dirty = false;
        loop {
            tokio::select! {
                Some(action) = self.rx.recv() => match action {
                    Action::Quit => break,
                    Action::Message(msg) => {
                        let cmd = self.app.update(msg);
                        self.execute(cmd);
                        self.subscriptions.update(self.app.subscriptions());
                        dirty = true;
                    }
                },
                _ = ticker.tick() => {
                    if dirty {
                        terminal.draw(|f| self.app.view(f))?;
                        dirty = false;
                    }
                }
            }
        }

        tracing::debug!("runtime stopping");
        self.subscriptions.shutdown().await;
        Ok(())
    }
}
