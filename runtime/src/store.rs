//! The Store: owns state, runs the reducer, and executes the effects it returns

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::handle::{EffectHandle, InFlight};
use cinestate_core::{effect::Effect, reducer::Reducer};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast};

/// Runtime for one reducer
///
/// State sits behind an `RwLock`: the reducer runs under the write lock, and
/// readers go through [`Store::state`]. Effects run on spawned tasks. Any
/// action an effect yields is first published on the action broadcast and
/// then sent back through the reducer.
///
/// Cloning a store is cheap and every clone shares the same state.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    closing: Arc<AtomicBool>,
    in_flight: InFlight,
    shutdown_timeout: Duration,
    actions: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Build a store with [`StoreConfig::default()`]
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_config(initial_state, reducer, environment, StoreConfig::default())
    }

    /// Build a store with explicit configuration
    ///
    /// ```ignore
    /// let config = StoreConfig::default().with_broadcast_capacity(128);
    /// let store = Store::with_config(MovieSearchState::default(), MovieSearchReducer, env, config);
    /// ```
    #[must_use]
    pub fn with_config(
        initial_state: S,
        reducer: R,
        environment: E,
        config: StoreConfig,
    ) -> Self {
        let (actions, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            closing: Arc::new(AtomicBool::new(false)),
            in_flight: InFlight::new(),
            shutdown_timeout: config.shutdown_timeout,
            actions,
        }
    }

    /// Effects still running, summed over every action sent so far
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.in_flight.count()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// [`shutdown`](Self::shutdown) with the timeout from [`StoreConfig`]
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects outlive the deadline.
    pub async fn shutdown_default(&self) -> Result<(), StoreError> {
        self.shutdown(self.shutdown_timeout).await
    }

    /// Stop accepting actions and wait for running effects to drain
    ///
    /// Effects that finish after shutdown began may still yield actions.
    /// Those are broadcast but the reducer no longer sees them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of effects
    /// still running when `timeout` elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.closing.store(true, Ordering::Release);
        tracing::info!(pending_effects = self.pending_effects(), "Store shutting down");
        metrics::counter!("store.shutdown.initiated").increment(1);

        if tokio::time::timeout(timeout, self.in_flight.idle()).await.is_ok() {
            tracing::info!("Store drained");
            metrics::counter!("store.shutdown.completed").increment(1);
            return Ok(());
        }

        let pending = self.pending_effects();
        tracing::error!(pending_effects = pending, "Store shutdown deadline passed");
        metrics::counter!("store.shutdown.timeout").increment(1);
        Err(StoreError::ShutdownTimeout(pending))
    }

    /// Run `action` through the reducer and start the effects it returns
    ///
    /// Returns as soon as the effects are spawned. The returned handle can be
    /// used to wait for them. Concurrent calls are serialized on the state lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] once shutdown has begun.
    ///
    /// # Panics
    ///
    /// A panicking reducer panics the caller.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
    where
        R: Clone,
        E: Clone,
    {
        if self.is_shutting_down() {
            tracing::warn!("Action rejected during shutdown");
            metrics::counter!("store.shutdown.rejected_actions").increment(1);
            return Err(StoreError::ShutdownInProgress);
        }
        metrics::counter!("store.commands.total").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            let started = Instant::now();
            let effects = self.reducer.reduce(&mut *state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(started.elapsed().as_secs_f64());
            effects
        };
        tracing::trace!(effects = effects.len(), "Reducer returned");

        let tracked = InFlight::new();
        for effect in effects {
            self.run(effect, &tracked);
        }

        Ok(EffectHandle::tracking(&tracked))
    }

    /// Send `action`, then wait for the first effect-produced action that
    /// satisfies `matches`
    ///
    /// The subscription is taken before sending, so a reply cannot slip past.
    /// `action` itself is never broadcast. Put a correlation id in the reply
    /// when several requests may be in flight at once.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store is closing
    /// - [`StoreError::Timeout`] if nothing matched within `timeout`
    /// - [`StoreError::ChannelClosed`] if the broadcast closed first
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        matches: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        R: Clone,
        E: Clone,
        F: Fn(&A) -> bool,
    {
        let mut replies = self.actions.subscribe();
        self.send(action).await?;

        let wait = async {
            loop {
                match replies.recv().await {
                    Ok(reply) if matches(&reply) => break Ok(reply),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Reply observer fell behind");
                    },
                    Err(broadcast::error::RecvError::Closed) => break Err(StoreError::ChannelClosed),
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    /// Observe every action yielded by an effect
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.actions.subscribe()
    }

    /// Project something out of the current state under the read lock
    ///
    /// ```ignore
    /// let shown = store.state(|s| s.movies.len()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        f(&*self.state.read().await)
    }

    async fn feed_back(&self, action: A)
    where
        R: Clone,
        E: Clone,
    {
        // No subscribers is fine.
        let _ = self.actions.send(action.clone());

        if let Err(error) = self.send(action).await {
            tracing::debug!(%error, "Effect-produced action not reduced");
        }
    }

    /// Spawn `task`, counted both in `tracked` and in the store-wide total.
    /// The guards live inside the task, so a panic still releases them.
    fn spawn_counted<F>(&self, tracked: &InFlight, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guards = (tracked.enter(), self.in_flight.enter());
        tokio::spawn(async move {
            let _guards = guards;
            task.await;
        });
    }

    fn run(&self, effect: Effect<A>, tracked: &InFlight)
    where
        R: Clone,
        E: Clone,
    {
        let kind = match &effect {
            Effect::None => "none",
            Effect::Future(_) => "future",
            Effect::Delay { .. } => "delay",
            Effect::Parallel(_) => "parallel",
            Effect::Sequential(_) => "sequential",
        };
        metrics::counter!("store.effects.executed", "type" => kind).increment(1);
        tracing::trace!(kind, "Running effect");

        match effect {
            Effect::None => {},
            Effect::Future(fut) => {
                let store = self.clone();
                self.spawn_counted(tracked, async move {
                    if let Some(action) = fut.await {
                        store.feed_back(action).await;
                    }
                });
            },
            Effect::Delay { duration, action } => {
                let store = self.clone();
                self.spawn_counted(tracked, async move {
                    tokio::time::sleep(duration).await;
                    store.feed_back(*action).await;
                });
            },
            Effect::Parallel(effects) => {
                for effect in effects {
                    self.run(effect, tracked);
                }
            },
            Effect::Sequential(effects) => {
                let store = self.clone();
                self.spawn_counted(tracked, async move {
                    for effect in effects {
                        // Each step gets its own counter so the next one
                        // starts only after this one's tasks are done.
                        let step = InFlight::new();
                        store.run(effect, &step);
                        step.idle().await;
                    }
                });
            },
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            closing: Arc::clone(&self.closing),
            in_flight: self.in_flight.clone(),
            shutdown_timeout: self.shutdown_timeout,
            actions: self.actions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinestate_core::{async_effect, delay, smallvec, SmallVec};

    #[derive(Debug, Default)]
    struct Shelf {
        titles: Vec<String>,
    }

    #[derive(Debug, Clone)]
    enum ShelfAction {
        Shelve(&'static str),
        Fetch(&'static str),
        FetchLater(&'static str),
        FetchAll(Vec<&'static str>),
        FetchInOrder(Vec<(&'static str, u64)>),
        Stall(u64),
        Crash,
    }

    #[derive(Clone)]
    struct ShelfReducer;

    impl Reducer for ShelfReducer {
        type State = Shelf;
        type Action = ShelfAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Shelf,
            action: ShelfAction,
            _env: &(),
        ) -> SmallVec<[Effect<ShelfAction>; 4]> {
            match action {
                ShelfAction::Shelve(title) => {
                    state.titles.push(title.to_string());
                    smallvec![Effect::None]
                },
                ShelfAction::Fetch(title) => {
                    smallvec![async_effect! { Some(ShelfAction::Shelve(title)) }]
                },
                ShelfAction::FetchLater(title) => smallvec![delay! {
                    duration: Duration::from_millis(20),
                    action: ShelfAction::Shelve(title)
                }],
                ShelfAction::FetchAll(titles) => smallvec![Effect::merge(
                    titles
                        .into_iter()
                        .map(|title| async_effect! { Some(ShelfAction::Shelve(title)) })
                        .collect()
                )],
                // Earlier steps sleep longer, so only sequencing keeps the order.
                ShelfAction::FetchInOrder(steps) => smallvec![Effect::chain(
                    steps
                        .into_iter()
                        .map(|(title, ms)| async_effect! {
                            tokio::time::sleep(Duration::from_millis(ms)).await;
                            Some(ShelfAction::Shelve(title))
                        })
                        .collect()
                )],
                ShelfAction::Stall(ms) => smallvec![async_effect! {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    None
                }],
                #[allow(clippy::panic)]
                ShelfAction::Crash => smallvec![async_effect! {
                    panic!("effect blew up");
                }],
            }
        }
    }

    type ShelfStore = Store<Shelf, ShelfAction, (), ShelfReducer>;

    fn shelf() -> ShelfStore {
        Store::new(Shelf::default(), ShelfReducer, ())
    }

    async fn titles(store: &ShelfStore) -> Vec<String> {
        store.state(|s| s.titles.clone()).await
    }

    #[tokio::test]
    async fn test_reducer_runs_inline() -> Result<(), StoreError> {
        let store = shelf();
        store.send(ShelfAction::Shelve("Heat")).await?;
        store.send(ShelfAction::Shelve("Alien")).await?;

        assert_eq!(titles(&store).await, ["Heat", "Alien"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_future_result_is_fed_back() -> Result<(), StoreError> {
        let store = shelf();
        let mut handle = store.send(ShelfAction::Fetch("Heat")).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        assert_eq!(titles(&store).await, ["Heat"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delayed_action_arrives_later() -> Result<(), StoreError> {
        let store = shelf();
        let mut handle = store.send(ShelfAction::FetchLater("Alien")).await?;
        assert!(titles(&store).await.is_empty());
        assert_eq!(handle.pending(), 1);

        handle.wait_with_timeout(Duration::from_secs(1)).await?;
        assert_eq!(titles(&store).await, ["Alien"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_parallel_effects_all_complete() -> Result<(), StoreError> {
        let store = shelf();
        let mut handle = store
            .send(ShelfAction::FetchAll(vec!["Heat", "Alien", "Batman"]))
            .await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        let mut shelved = titles(&store).await;
        shelved.sort();
        assert_eq!(shelved, ["Alien", "Batman", "Heat"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sequential_effects_keep_order() -> Result<(), StoreError> {
        let store = shelf();
        let mut handle = store
            .send(ShelfAction::FetchInOrder(vec![("Heat", 30), ("Alien", 10), ("Batman", 0)]))
            .await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        assert_eq!(titles(&store).await, ["Heat", "Alien", "Batman"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_senders_share_state() {
        let store = shelf();
        let senders: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.send(ShelfAction::Shelve("Heat")).await })
            })
            .collect();

        for sender in senders {
            assert!(matches!(sender.await, Ok(Ok(_))));
        }
        assert_eq!(titles(&store).await.len(), 10);
    }

    #[tokio::test]
    async fn test_panicking_effect_releases_its_slot() -> Result<(), StoreError> {
        let store = shelf();
        let mut handle = store.send(ShelfAction::Crash).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;
        assert_eq!(store.pending_effects(), 0);

        store.send(ShelfAction::Shelve("Heat")).await?;
        assert_eq!(titles(&store).await, ["Heat"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised() -> Result<(), StoreError> {
        let config = StoreConfig::default().with_broadcast_capacity(0);
        let store = Store::with_config(Shelf::default(), ShelfReducer, (), config);
        let mut actions = store.subscribe_actions();

        let mut handle = store.send(ShelfAction::Fetch("Heat")).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        assert!(matches!(actions.try_recv(), Ok(ShelfAction::Shelve("Heat"))));
        Ok(())
    }

    mod shutdown {
        use super::*;

        #[tokio::test]
        async fn test_idle_store_closes_at_once() {
            let store = shelf();
            assert_eq!(store.shutdown(Duration::from_millis(10)).await, Ok(()));
            assert!(store.is_shutting_down());
            assert_eq!(store.shutdown_default().await, Ok(()));
        }

        #[tokio::test]
        async fn test_sends_rejected_after_shutdown() -> Result<(), StoreError> {
            let store = shelf();
            store.shutdown(Duration::from_secs(1)).await?;

            let rejected = store.send(ShelfAction::Shelve("Heat")).await;
            assert!(matches!(rejected, Err(StoreError::ShutdownInProgress)));
            assert!(titles(&store).await.is_empty());
            Ok(())
        }

        #[tokio::test]
        async fn test_waits_for_running_effects() -> Result<(), StoreError> {
            let store = shelf();
            store.send(ShelfAction::Stall(30)).await?;
            assert_eq!(store.pending_effects(), 1);

            store.shutdown(Duration::from_secs(1)).await?;
            assert_eq!(store.pending_effects(), 0);
            Ok(())
        }

        #[tokio::test]
        async fn test_reports_stragglers_on_timeout() -> Result<(), StoreError> {
            let store = shelf();
            store.send(ShelfAction::Stall(500)).await?;
            store.send(ShelfAction::Stall(500)).await?;

            let result = store.shutdown(Duration::from_millis(20)).await;
            assert_eq!(result, Err(StoreError::ShutdownTimeout(2)));
            Ok(())
        }

        #[tokio::test]
        async fn test_late_results_are_not_reduced() -> Result<(), StoreError> {
            let store = shelf();
            let mut actions = store.subscribe_actions();
            store.send(ShelfAction::FetchLater("Alien")).await?;

            store.shutdown(Duration::from_secs(1)).await?;

            assert!(matches!(actions.try_recv(), Ok(ShelfAction::Shelve("Alien"))));
            assert!(titles(&store).await.is_empty());
            Ok(())
        }
    }

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.broadcast_capacity, 16);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }
}
