use futures::{
    FutureExt, Stream, StreamExt,
    stream::{self, BoxStream, select_all},
};

/// An action that can be performed by a command.
///
/// Actions are emitted by command streams and processed by the runtime.
pub enum Action<Msg> {
    /// Send a message to the application's update function.
    Message(Msg),

    /// Request the application to quit.
    ///
    /// The runtime stops the event loop and shuts down all subscriptions.
    Quit,
}

/// A command that can be executed to perform side effects.
///
/// Commands represent asynchronous operations that produce messages or actions:
/// HTTP requests, cache invalidation, delayed messages. They are returned from
/// `Application::new` and `Application::update` and executed by the runtime.
///
/// # Examples
///
/// ```
/// use apidesk::command::Command;
///
/// enum Message {
///     GotResult(i32),
/// }
///
/// let cmd = Command::perform(async { 42 }, Message::GotResult);
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) stream: Option<BoxStream<'static, Action<Msg>>>,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// Create a command that does nothing.
    ///
    /// ```
    /// use apidesk::command::Command;
    ///
    /// let cmd: Command<i32> = Command::none();
    /// ```
    pub fn none() -> Self {
        Self { stream: None }
    }

    /// Perform an asynchronous operation and convert its result to a message.
    ///
    /// ```
    /// use apidesk::command::Command;
    ///
    /// async fn fetch_count() -> usize {
    ///     3
    /// }
    ///
    /// enum Message {
    ///     Counted(usize),
    /// }
    ///
    /// let cmd = Command::perform(fetch_count(), Message::Counted);
    /// ```
    pub fn perform<A>(
        future: impl Future<Output = A> + Send + 'static,
        f: impl FnOnce(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::future(future.map(f))
    }

    /// Create a command from a future that produces a message.
    pub fn future(future: impl Future<Output = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(future.into_stream().map(Action::Message).boxed()),
        }
    }

    /// Create a command that delivers `msg` on the next turn of the runtime.
    pub fn message(msg: Msg) -> Self {
        Self::effect(Action::Message(msg))
    }

    /// Create a command that performs a single action immediately.
    ///
    /// ```
    /// use apidesk::command::{Action, Command};
    ///
    /// let cmd: Command<i32> = Command::effect(Action::Quit);
    /// let cmd = Command::effect(Action::Message(42));
    /// ```
    pub fn effect(action: Action<Msg>) -> Self {
        Self {
            stream: Some(stream::once(async move { action }).boxed()),
        }
    }

    /// Batch multiple commands into a single command.
    ///
    /// All commands run concurrently; message order is not guaranteed.
    /// `Command::none()` entries are dropped.
    ///
    /// ```
    /// use apidesk::command::Command;
    ///
    /// enum Message {
    ///     First(i32),
    ///     Second(String),
    /// }
    ///
    /// let cmd = Command::batch(vec![
    ///     Command::perform(async { 1 }, Message::First),
    ///     Command::perform(async { "data".to_string() }, Message::Second),
    ///     Command::none(),
    /// ]);
    /// ```
    pub fn batch(commands: impl IntoIterator<Item = Command<Msg>>) -> Self {
        let streams: Vec<_> = commands.into_iter().filter_map(|cmd| cmd.stream).collect();

        if streams.is_empty() {
            Self::none()
        } else {
            Self {
                stream: Some(select_all(streams).boxed()),
            }
        }
    }

    /// Create a command from a stream of messages.
    pub fn stream(stream: impl Stream<Item = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(stream.map(Action::Message).boxed()),
        }
    }

    /// Run a stream and convert each item to a message.
    ///
    /// ```
    /// use apidesk::command::Command;
    /// use futures::stream;
    ///
    /// enum Message {
    ///     PageLoaded(u32),
    /// }
    ///
    /// let cmd = Command::run(stream::iter(vec![1, 2]), Message::PageLoaded);
    /// ```
    pub fn run<A>(
        stream: impl Stream<Item = A> + Send + 'static,
        f: impl Fn(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::stream(stream.map(f))
    }

    /// Transform the messages produced by this command.
    ///
    /// `Quit` actions pass through unchanged.
    pub fn map<T: Send + 'static>(self, f: impl Fn(Msg) -> T + Send + 'static) -> Command<T> {
        Command {
            stream: self.stream.map(|stream| {
                stream
                    .map(move |action| match action {
                        Action::Message(msg) => Action::Message(f(msg)),
                        Action::Quit => Action::Quit,
                    })
                    .boxed()
            }),
        }
    }

    /// Returns `true` if this command has no side effects.
    pub const fn is_none(&self) -> bool {
        self.stream.is_none()
    }

    /// Consume the command as a stream of actions.
    ///
    /// Useful outside the runtime, e.g. to drive a command in tests.
    pub fn into_stream(self) -> BoxStream<'static, Action<Msg>> {
        self.stream.unwrap_or_else(|| stream::empty().boxed())
    }

    /// Drive the command to completion and collect its messages, stopping at
    /// the first `Quit`.
    pub async fn collect_messages(self) -> Vec<Msg> {
        let mut stream = self.into_stream();
        let mut messages = Vec::new();
        while let Some(action) = stream.next().await {
            match action {
                Action::Message(msg) => messages.push(msg),
                Action::Quit => break,
            }
        }
        messages
    }
}
