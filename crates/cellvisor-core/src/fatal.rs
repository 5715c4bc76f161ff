//! Fatal contract violations.
//!
//! A broken kernel invariant means the embedding runtime misused the kernel.
//! It is logged and the current thread panics; nothing is returned to the
//! caller.

use std::fmt;

#[cold]
#[track_caller]
pub(crate) fn halt(args: fmt::Arguments<'_>) -> ! {
    let message = args.to_string();
    tracing::error!(target: crate::KERNEL_TARGET, "fatal: {}", message);
    panic!("{}", message);
}

/// Halt with a diagnostic unless `cond` holds.
macro_rules! kernel_assert {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::fatal::halt(format_args!($($arg)+));
        }
    };
}

/// Halt with a diagnostic.
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::fatal::halt(format_args!($($arg)+))
    };
}

pub(crate) use fatal;
pub(crate) use kernel_assert;
