//! Link-time symbols the firmware image has to define itself.
//!
//! [`EventQueue`](crate::events::EventQueue) sits on an `embassy-sync`
//! channel guarded by `CriticalSectionRawMutex`, which calls into
//! `critical-section` 1.x.  That crate expects the final binary to provide
//! `_critical_section_1_0_acquire` / `_critical_section_1_0_release`.  On the
//! device they are backed by one process-wide mutex, re-entrant per task;
//! host builds use `critical-section`'s `std` implementation instead.

#[cfg(target_os = "espidf")]
use core::cell::{Cell, RefCell};
#[cfg(target_os = "espidf")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(target_os = "espidf")]
static SECTION_LOCK: Mutex<()> = Mutex::new(());

#[cfg(target_os = "espidf")]
thread_local! {
    static NESTING: Cell<u8> = const { Cell::new(0) };
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    NESTING.with(|nesting| {
        let depth = nesting.get();
        if depth == 0 {
            let guard = SECTION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            HELD.with(|held| *held.borrow_mut() = Some(guard));
        }
        nesting.set(depth.saturating_add(1));
        depth
    })
}

#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_restore: u8) {
    NESTING.with(|nesting| match nesting.get() {
        0 => {}
        1 => {
            nesting.set(0);
            HELD.with(|held| held.borrow_mut().take());
        }
        depth => nesting.set(depth - 1),
    });
}
