//! Panic provenance.
//!
//! A process-wide panic hook stores where the current thread panicked so the
//! recovery boundary, which catches the unwind on that same thread, can log
//! it. The previous hook still runs.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, PanicHookInfo};
use std::sync::Once;

static HOOK: Once = Once::new();

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicLocation>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for PanicLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Install the recording hook. Later calls do nothing.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            record(info);
            previous(info);
        }));
    });
}

fn record(info: &PanicHookInfo<'_>) {
    let location = match info.location() {
        Some(loc) => Some(PanicLocation {
            file: loc.file().to_string(),
            line: loc.line(),
            column: loc.column(),
        }),
        None => parse_backtrace(&Backtrace::force_capture().to_string()),
    };
    LAST_PANIC.with(|slot| *slot.borrow_mut() = location);
}

/// Take the location recorded for the last panic on this thread.
pub fn take_location() -> Option<PanicLocation> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// First user frame of a rendered backtrace.
pub fn parse_backtrace(text: &str) -> Option<PanicLocation> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("at "))
        .filter(|path| !is_runtime_frame(path))
        .find_map(parse_frame)
}

fn is_runtime_frame(path: &str) -> bool {
    path.starts_with("/rustc/")
        || path.contains("/library/std/")
        || path.contains("/library/core/")
        || path.contains("/library/alloc/")
        || path.contains("provenance.rs")
}

fn parse_frame(path: &str) -> Option<PanicLocation> {
    let mut parts = path.rsplitn(3, ':');
    let column = parts.next()?.parse().ok()?;
    let line = parts.next()?.parse().ok()?;
    let file = parts.next()?.to_string();
    Some(PanicLocation { file, line, column })
}

/// Readable panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
