//! Logging shims.
//!
//! `defmt` wins when both logging features are enabled. With neither, the
//! macros expand to nothing.

#![allow(unused_macros)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! debug {
            ($($arg:tt)*) => { defmt::debug!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { defmt::error!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! debug {
            ($($arg:tt)*) => { log::debug!($($arg)*) };
        }
        macro_rules! error {
            ($($arg:tt)*) => { log::error!($($arg)*) };
        }
    } else {
        macro_rules! debug {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! error {
            ($($arg:tt)*) => {{}};
        }
    }
}
