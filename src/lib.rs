#![doc = include_str!("../README.md")]

pub mod logger;
pub mod platform;
pub mod pwa;
pub mod util;

#[doc(hidden)]
pub mod doctest_support;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod test_support;
