//! A registry of callbacks that run when the supervising process shuts down.

use std::{
    collections::BTreeMap,
    fmt::Debug,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use anyhow::Context as _;
use tracing::{debug, info};

type ShutdownHook = Box<dyn FnOnce() + Send + 'static>;

/// The exit code of a process terminated by an interrupt.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Scoped callbacks that run once, most recently registered first, either when
/// [`ShutdownHooks::run`] is called or when the last clone of the registry is dropped.
///
/// Clones share the same set of hooks.
#[derive(Clone, Default)]
pub struct ShutdownHooks {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    hooks: Mutex<BTreeMap<u64, ShutdownHook>>,
    next_id: AtomicU64,
    ran: AtomicBool,
}

impl Inner {
    fn hooks(&self) -> MutexGuard<'_, BTreeMap<u64, ShutdownHook>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_hooks(&self) {
        // The hooks are taken out before running them so that they're free to touch the registry.
        let hooks = std::mem::take(&mut *self.hooks());
        debug!(count = hooks.len(), "Running the shutdown hooks");
        for (_, hook) in hooks.into_iter().rev() {
            hook();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.run_hooks();
    }
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook. Dropping the returned guard removes the hook without running it.
    #[must_use = "the hook is removed once the guard is dropped"]
    pub fn register(&self, hook: impl FnOnce() + Send + 'static) -> ShutdownHookGuard {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.hooks().insert(id, Box::new(hook));
        ShutdownHookGuard {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Runs every registered hook. Only the first call does anything.
    pub fn run(&self) {
        if self.inner.ran.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.run_hooks();
    }

    pub fn len(&self) -> usize {
        self.inner.hooks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the hooks and exits with [`INTERRUPTED_EXIT_CODE`] when the process receives an
    /// interrupt or a termination signal. Can only be installed once per process.
    pub fn install_signal_handler(&self) -> anyhow::Result<()> {
        let hooks = self.clone();
        ctrlc::set_handler(move || {
            info!("Received a termination signal, shutting down");
            hooks.run();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        })
        .context("Failed to install the signal handler")
    }
}

impl Debug for ShutdownHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHooks")
            .field("len", &self.len())
            .field("ran", &self.inner.ran.load(Ordering::SeqCst))
            .finish()
    }
}

/// Keeps a hook registered in its [`ShutdownHooks`].
#[derive(Debug)]
pub struct ShutdownHookGuard {
    id: u64,
    registry: Weak<Inner>,
}

impl Drop for ShutdownHookGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.hooks().remove(&self.id);
        }
    }
}
