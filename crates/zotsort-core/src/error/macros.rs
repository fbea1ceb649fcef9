//! Error macros for zotsort

/// Macro for creating invalid value errors
#[macro_export]
macro_rules! bail_invalid {
    ($context:expr, $value:expr) => {
        return Err($crate::error::ZotsortError::invalid_value($context, $value))
    };
}

/// Macro for creating usage errors
#[macro_export]
macro_rules! bail_usage {
    ($msg:expr) => {
        return Err($crate::error::ZotsortError::UsageError($msg.to_string()))
    };
}

/// Macro for mapping a remote response that could not be interpreted
#[macro_export]
macro_rules! map_response_err {
    ($service:expr, $error:expr) => {
        $crate::error::ZotsortError::remote_response($service, $error)
    };
}
