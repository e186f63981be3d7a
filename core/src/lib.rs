//! # Cinestate Core
//!
//! Vocabulary shared by every cinestate feature.
//!
//! A feature is a [`reducer::Reducer`]: given its state, one action and an
//! environment of collaborators, it mutates the state and returns
//! [`effect::Effect`] values describing follow-up work. The reducer never
//! performs I/O itself; `cinestate-runtime` executes the effects and feeds
//! any resulting actions back in.
//!
//! ```
//! use cinestate_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Debug, Default)]
//! struct Picks {
//!     titles: Vec<String>,
//! }
//!
//! enum PickAction {
//!     Pick(String),
//!     Forget,
//! }
//!
//! struct PickReducer;
//!
//! impl Reducer for PickReducer {
//!     type State = Picks;
//!     type Action = PickAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Picks, action: PickAction, _env: &()) -> SmallVec<[Effect<PickAction>; 4]> {
//!         match action {
//!             PickAction::Pick(title) => state.titles.push(title),
//!             PickAction::Forget => state.titles.clear(),
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut picks = Picks::default();
//! PickReducer.reduce(&mut picks, PickAction::Pick("Heat".into()), &());
//! assert_eq!(picks.titles, ["Heat"]);
//! PickReducer.reduce(&mut picks, PickAction::Forget, &());
//! assert!(picks.titles.is_empty());
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// `async_effect!` and `delay!`
pub mod effect_macros;

/// The [`Reducer`](reducer::Reducer) trait
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// Business logic of one feature
    ///
    /// `reduce` must be deterministic for a given state, action and
    /// environment. Anything that touches the outside world goes into the
    /// returned effects.
    pub trait Reducer {
        /// State owned by the feature
        type State;

        /// Inputs, including results delivered back by effects
        type Action;

        /// Injected collaborators such as catalogs and clocks
        type Environment;

        /// Apply `action` to `state` and describe the follow-up work
        ///
        /// Up to four effects fit inline without allocating.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Descriptions of work for the runtime to perform
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Work requested by a reducer
    ///
    /// Building an effect does nothing. The store decides when and where it
    /// runs, and any `Action` it yields is reduced like any other input.
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// Run every child at once
        Parallel(Vec<Effect<Action>>),

        /// Run children one after another; each starts when the previous one,
        /// including everything it spawned, has finished
        Sequential(Vec<Effect<Action>>),

        /// Deliver `action` after `duration`
        Delay {
            /// Time to wait
            duration: Duration,
            /// Delivered once the wait is over
            action: Box<Action>,
        },

        /// Await a future; `Some(action)` is delivered back to the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => f.write_str("Effect::None"),
                Effect::Future(_) => f.write_str("Effect::Future(<future>)"),
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Parallel(children) => f.debug_tuple("Effect::Parallel").field(children).finish(),
                Effect::Sequential(children) => {
                    f.debug_tuple("Effect::Sequential").field(children).finish()
                },
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Shorthand for [`Effect::Parallel`]
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Shorthand for [`Effect::Sequential`]
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// True when executing this effect would do nothing, which includes
        /// groups made only of no-ops
        #[must_use]
        pub fn is_noop(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Delay { .. } | Effect::Future(_) => false,
                Effect::Parallel(children) | Effect::Sequential(children) => {
                    children.iter().all(Effect::is_noop)
                },
            }
        }
    }
}

/// Collaborator traits injected through a reducer's environment
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time
    ///
    /// ```
    /// use cinestate_core::environment::{Clock, SystemClock};
    ///
    /// let before = chrono::Utc::now();
    /// assert!(SystemClock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Current instant in UTC
        fn now(&self) -> DateTime<Utc>;
    }

    /// [`Clock`] backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;
    use std::time::Duration;

    #[derive(Debug)]
    struct Refresh;

    fn later() -> Effect<Refresh> {
        Effect::Delay {
            duration: Duration::from_millis(5),
            action: Box::new(Refresh),
        }
    }

    #[test]
    fn test_empty_groups_are_noops() {
        assert!(Effect::<Refresh>::None.is_noop());
        assert!(Effect::<Refresh>::chain(vec![]).is_noop());
        assert!(Effect::<Refresh>::merge(vec![Effect::None, Effect::chain(vec![Effect::None])]).is_noop());
    }

    #[test]
    fn test_any_real_child_makes_group_effectful() {
        assert!(!later().is_noop());
        assert!(!Effect::merge(vec![Effect::None, later()]).is_noop());
        assert!(!Effect::chain(vec![Effect::chain(vec![later()])]).is_noop());
    }

    #[test]
    fn test_debug_output() {
        let future: Effect<Refresh> = Effect::Future(Box::pin(async { None }));
        assert_eq!(format!("{future:?}"), "Effect::Future(<future>)");
        assert_eq!(
            format!("{:?}", Effect::merge(vec![Effect::<Refresh>::None])),
            "Effect::Parallel([Effect::None])"
        );
    }
}
