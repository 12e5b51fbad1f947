//! Cooperative cancellation.
//!
//! Orchestrators poll a [CancelFlag] at the top of each per-sequence iteration.
//! The binary wires the flag to SIGINT/SIGTERM with [install_interrupt_handler], tests just call
//! [CancelFlag::cancel]. The first signal sets the flag, a second one while the flag is set
//! restores default handling so a stuck cleanup can still be killed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::SigId;

/// shared abort flag
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
} // end of impl CancelFlag

/// Keeps signal registrations alive. Dropping it unregisters the handlers.
pub struct InterruptGuard {
    ids: Vec<SigId>,
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
        log::debug!("interrupt handlers unregistered");
    }
}

/// connects interrupt signals to the flag, for the lifetime of the returned guard.
#[cfg(unix)]
pub fn install_interrupt_handler(cancel: &CancelFlag) -> std::io::Result<InterruptGuard> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::flag;
    //
    let mut ids = Vec::with_capacity(4);
    for sig in [SIGINT, SIGTERM] {
        // order matters : conditional default must see the flag before it is set by the first signal
        ids.push(flag::register_conditional_default(sig, Arc::clone(&cancel.0))?);
        ids.push(flag::register(sig, Arc::clone(&cancel.0))?);
    }
    log::debug!("interrupt handlers installed");
    Ok(InterruptGuard { ids })
} // end of install_interrupt_handler

#[cfg(not(unix))]
pub fn install_interrupt_handler(cancel: &CancelFlag) -> std::io::Result<InterruptGuard> {
    let id = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&cancel.0))?;
    Ok(InterruptGuard { ids: vec![id] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
