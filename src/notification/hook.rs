//! Process-wide single-slot notification callback.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;

use super::{Notifier, NotifyError};

type Callback = Box<dyn Fn(&str, u32) + Send + Sync>;

/// Boxed so the slot holds a sized value.
struct Slot(Callback);

static SLOT: OnceLock<ArcSwapOption<Slot>> = OnceLock::new();

fn slot() -> &'static ArcSwapOption<Slot> {
    SLOT.get_or_init(ArcSwapOption::empty)
}

/// Install the callback every [`GlobalHook`] forwards to, replacing any previous one.
pub fn set_notification_callback<F>(callback: F)
where
    F: Fn(&str, u32) + Send + Sync + 'static,
{
    slot().store(Some(Arc::new(Slot(Box::new(callback)))));
}

/// Empty the slot. Subsequent notifications are rejected.
pub fn clear_notification_callback() {
    slot().store(None);
}

/// Whether a callback is currently installed.
pub fn is_set() -> bool {
    slot().load().is_some()
}

/// Notifier backed by the process-wide slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalHook;

impl Notifier for GlobalHook {
    fn notify(&self, message: &str, lifetime_ms: u32) -> Result<(), NotifyError> {
        match slot().load_full() {
            Some(installed) => {
                (installed.0)(message, lifetime_ms);
                Ok(())
            }
            None => Err(NotifyError::CallbackUnset),
        }
    }
}
