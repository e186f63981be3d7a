//! # Cinestate Testing
//!
//! Support code for testing cinestate features without a network or a
//! running store: a frozen [`Clock`], the [`ReducerTest`] harness with its
//! [`assertions`], and [`resolve_effects`] to run returned effects inline.
//!
//! ```ignore
//! use cinestate_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(MovieSearchReducer::new())
//!     .with_env(MovieSearchEnvironment::new(catalog, Arc::new(test_clock())))
//!     .given_state(MovieSearchState::default())
//!     .when_action(MovieAction::ResetMovies)
//!     .then_state(|state| assert!(state.movies.is_empty()))
//!     .run();
//! ```

use cinestate_core::environment::Clock;


/// Stand-ins for environment collaborators
pub mod mocks {
    use super::Clock;
    use chrono::{DateTime, Utc};

    /// A [`Clock`] stuck at one instant, so timestamps in state are predictable
    ///
    /// ```
    /// use cinestate_core::environment::Clock;
    /// use cinestate_testing::mocks::FixedClock;
    ///
    /// let noon = chrono::DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z").unwrap().with_timezone(&chrono::Utc);
    /// assert_eq!(FixedClock::new(noon).now(), noon);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FixedClock(DateTime<Utc>);

    impl FixedClock {
        /// Freeze time at `at`
        #[must_use]
        pub const fn new(at: DateTime<Utc>) -> Self {
            Self(at)
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Clock frozen at 2025-01-01T00:00:00Z
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Test helpers for driving effects without a running Store
pub mod helpers {
    use cinestate_core::effect::Effect;
    use futures::future::BoxFuture;

    /// Execute an effect inline and collect every action it produces
    ///
    /// `Delay` effects resolve immediately (the duration is ignored), and
    /// `Parallel` groups run in declaration order, so the output is
    /// deterministic. Produced actions are NOT fed back into any reducer.
    ///
    /// # Example
    ///
    /// ```
    /// use cinestate_core::effect::Effect;
    /// use cinestate_testing::helpers::resolve_effect;
    ///
    /// # futures::executor::block_on(async {
    /// let effect = Effect::Future(Box::pin(async { Some(5) }));
    /// assert_eq!(resolve_effect(effect).await, vec![5]);
    /// # });
    /// ```
    pub fn resolve_effect<A: Send + 'static>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>> {
        Box::pin(async move {
            match effect {
                Effect::None => Vec::new(),
                Effect::Future(fut) => fut.await.into_iter().collect(),
                Effect::Delay { action, .. } => vec![*action],
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    let mut actions = Vec::new();
                    for effect in effects {
                        actions.extend(resolve_effect(effect).await);
                    }
                    actions
                },
            }
        })
    }

    /// Execute every effect of a reducer result inline, in order
    pub async fn resolve_effects<A, I>(effects: I) -> Vec<A>
    where
        A: Send + 'static,
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(resolve_effect(effect).await);
        }
        actions
    }
}

pub use helpers::{resolve_effect, resolve_effects};
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;
    use cinestate_core::effect::Effect;
    use std::time::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_resolve_nested_effects_in_order() {
        let effect = Effect::chain(vec![
            Effect::Future(Box::pin(async { Some(1) })),
            Effect::merge(vec![
                Effect::Delay {
                    duration: Duration::from_secs(3600),
                    action: Box::new(2),
                },
                Effect::None,
                Effect::Future(Box::pin(async { None })),
                Effect::Future(Box::pin(async { Some(3) })),
            ]),
        ]);

        assert_eq!(resolve_effect(effect).await, vec![1, 2, 3]);
    }
}
