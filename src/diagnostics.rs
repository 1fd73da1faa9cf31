//! Optional diagnostic hook for worker-side code
//!
//! Transformation implementations sometimes need an attachable inspection
//! point when debugging a misbehaving item inside a pool worker. Install a
//! hook once per process; [`breakpoint`] is a no-op until then, so leaving
//! calls in place costs nothing in production. The hook is independent of
//! the processing pipeline.

use std::path::Path;

use once_cell::sync::OnceCell;
use tracing::debug;

type Hook = Box<dyn Fn(&str, &Path) + Send + Sync>;

static HOOK: OnceCell<Hook> = OnceCell::new();

/// Install the process-global diagnostic hook
///
/// Returns false if a hook was already installed; the first installation
/// wins for the lifetime of the process.
pub fn install_hook<F>(hook: F) -> bool
where
    F: Fn(&str, &Path) + Send + Sync + 'static,
{
    HOOK.set(Box::new(hook)).is_ok()
}

/// Trigger the diagnostic hook, if one is installed
///
/// `tag` identifies the call site; `path` is the item being inspected.
pub fn breakpoint(tag: &str, path: &Path) {
    if let Some(hook) = HOOK.get() {
        debug!(tag, path = %path.display(), "diagnostic breakpoint");
        hook(tag, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn test_hook_lifecycle() {
        // No hook installed yet: must be a silent no-op
        breakpoint("before", Path::new("x.jpg"));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        assert!(install_hook(|_, _| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }));
        breakpoint("after", Path::new("x.jpg"));
        breakpoint("after", Path::new("y.jpg"));
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);

        // Second installation is refused
        assert!(!install_hook(|_, _| {}));
    }
}
