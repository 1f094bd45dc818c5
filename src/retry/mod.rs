pub mod classifier;
pub mod executor;

pub use classifier::{
    BackoffKind, ClassifiedError, ErrorClassifier, ErrorContext, ErrorKind, RecoveryAction,
    RetryStrategy, StrategyTable,
};
pub use executor::{calculate_retry_delay, RetryExecutor, RetryFailure};
