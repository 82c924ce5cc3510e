pub mod game;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Log a status line every 100 simulation ticks when `perf_stats` is enabled.
///
/// `$tick` is anything with a `.0` tick number, normally `Res<SimTick>`.
/// Without the feature the macro expands to nothing and its arguments are
/// never evaluated, so it is free to leave in hot systems.
///
/// ```ignore
/// profile_log!(tick, "[SIM STATUS] {} units on the field", field.units.len());
/// ```
#[macro_export]
#[cfg(feature = "perf_stats")]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {
        if $tick.0 % 100 == 0 {
            bevy::prelude::info!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "perf_stats"))]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {};
}
