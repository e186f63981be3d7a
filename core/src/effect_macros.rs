//! Shorthands for the two effects reducers build most often

/// Wrap an async body into [`Effect::Future`](crate::effect::Effect::Future)
///
/// The body runs as `async move`, so it takes ownership of what it uses and
/// must evaluate to `Option<Action>`.
///
/// ```rust,ignore
/// use cinestate_core::async_effect;
///
/// let catalog = Arc::clone(&env.catalog);
/// async_effect! {
///     let result = catalog.search(&query).await;
///     Some(MovieAction::MoviesFetched { request_id, result })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move { $($body)* }))
    };
}

/// Build an [`Effect::Delay`](crate::effect::Effect::Delay) with named fields
///
/// ```rust,ignore
/// use cinestate_core::delay;
///
/// delay! {
///     duration: Duration::from_millis(300),
///     action: MovieAction::ResetMovies
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (duration: $duration:expr, action: $action:expr $(,)?) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
