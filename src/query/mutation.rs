use std::marker::PhantomData;

use futures::future::BoxFuture;

use crate::api::ApiError;
use crate::command::Command;

/// A one-off write operation.
///
/// Unlike queries, mutations hold no state and cache nothing: each call
/// returns a `Command` that performs the write once. See
/// [`MutationHook`](crate::hooks::MutationHook) for the variant that also
/// invalidates the cache and reports the outcome.
///
/// ```
/// use apidesk::api::ApiError;
/// use apidesk::query::Mutation;
/// use futures::FutureExt;
///
/// enum Message {
///     Saved(Result<u32, ApiError>),
/// }
///
/// let cmd = Mutation::mutate(41, |n| async move { Ok(n + 1) }.boxed()).map(Message::Saved);
/// # drop(cmd);
/// ```
pub struct Mutation<I, O> {
    _phantom: PhantomData<(I, O)>,
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Runs `mutator(input)` when the returned command is executed.
    pub fn mutate<F>(input: I, mutator: F) -> Command<Result<O, ApiError>>
    where
        F: FnOnce(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + 'static,
    {
        Command::future(async move { mutator(input).await })
    }
}
