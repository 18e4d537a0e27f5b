pub mod constants;
pub mod types;

pub use types::{
    AnalyzedError, ArchIncompatibleEntry, BlockReason, BlockingDependency, Dependency,
    ErrorCategory, FixAttempt, FixHistory, FixResult, FixStrategy, HistoricalFix,
    PackageReplacement, ReplacementOutcome, StrategyKey, StrategyKind, ValidationOutcome,
    ValidationResult,
};
