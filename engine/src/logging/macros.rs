// Scoped logging macros. Scopes map to the crate's subsystems and can be
// tuned individually through the log config environment variable.

/// Convenience macro for scoped logging at different levels
#[macro_export]
macro_rules! scoped_log {
    ($level:ident, $scope:expr, $($arg:tt)*) => {{
        let log_config = $crate::logging::get_log_config();
        if log_config.should_log($scope, $crate::logging::level_from_name(stringify!($level))) {
            tracing::$level!(scope = $scope, $($arg)*);
        }
    }};
}

// Convenience macros for common scopes
#[macro_export]
macro_rules! input_log {
    ($level:ident, $($arg:tt)*) => {
        $crate::scoped_log!($level, "input", $($arg)*);
    };
}

#[macro_export]
macro_rules! gesture_log {
    ($level:ident, $($arg:tt)*) => {
        $crate::scoped_log!($level, "gesture", $($arg)*);
    };
}

#[macro_export]
macro_rules! locomotion_log {
    ($level:ident, $($arg:tt)*) => {
        $crate::scoped_log!($level, "locomotion", $($arg)*);
    };
}

#[macro_export]
macro_rules! events_log {
    ($level:ident, $($arg:tt)*) => {
        $crate::scoped_log!($level, "events", $($arg)*);
    };
}
