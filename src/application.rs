use ratatui::Frame;

use crate::{command::Command, subscription::Subscription};

/// A terminal application following the Elm Architecture.
///
/// # Type Parameters
///
/// * `Message` - The messages your application handles.
/// * `Flags` - Configuration passed at initialization.
///
/// # Example
///
/// ```
/// use ratatui::Frame;
/// use apidesk::{application::Application, command::Command, subscription::Subscription};
///
/// enum Message {
///     NextPage,
/// }
///
/// struct Pager {
///     page: u32,
/// }
///
/// impl Application for Pager {
///     type Message = Message;
///     type Flags = u32;
///
///     fn new(first_page: u32) -> (Self, Command<Message>) {
///         (Pager { page: first_page }, Command::none())
///     }
///
///     fn update(&mut self, msg: Message) -> Command<Message> {
///         match msg {
///             Message::NextPage => self.page += 1,
///         }
///         Command::none()
///     }
///
///     fn view(&self, _frame: &mut Frame<'_>) {}
///
///     fn subscriptions(&self) -> Vec<Subscription<Message>> {
///         vec![]
///     }
/// }
/// ```
pub trait Application: Sized {
    /// The type of messages your application processes.
    type Message: Send + 'static;

    /// Configuration data for initializing your application.
    type Flags: Clone + Send;

    /// Initialize the application with the given flags.
    ///
    /// Returns the initial state and a command to run at startup.
    fn new(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Process a message and update the application state.
    ///
    /// All state changes happen here. The returned command runs after the
    /// update; use `Command::none()` when there is nothing to do.
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Render the user interface.
    ///
    /// Must only read from `self`; all state changes belong in `update()`.
    fn view(&self, frame: &mut Frame<'_>);

    /// Declare the event sources the application currently listens to.
    ///
    /// Called after every update. Subscriptions are identified by id: new ids
    /// are started, ids that disappear are cancelled, unchanged ids keep
    /// running. This is how a screen's queries are attached while the screen
    /// is visible and dropped when the user navigates away.
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>>;
}
