//! Logging shims that compile to nothing without the `defmt-03` feature

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt-03")]
        defmt::debug!($($arg)*);
    };
}

macro_rules! warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt-03")]
        defmt::warn!($($arg)*);
    };
}
