use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::Config;
#[cfg(feature = "metrics")]
use crate::metrics::Metrics;
use crate::store::Store;

/// The shared, immutable per-process state handed to every request.
#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    pub fn new(config: Config, store: Store, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self(Arc::new(StateInner {
            store,
            config,
            shutdown_rx,

            #[cfg(feature = "metrics")]
            metrics: Metrics::default(),
        }))
    }
}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub store: Store,
    pub config: Config,
    pub shutdown_rx: watch::Receiver<bool>,

    #[cfg(feature = "metrics")]
    pub metrics: Metrics,
}

#[cfg(test)]
impl State {
    pub(crate) fn test() -> Self {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        Self::new(
            Config::default(),
            Store::new(crate::store::seed()),
            shutdown_rx,
        )
    }
}
