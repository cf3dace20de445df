// Utility modules for the TrustScan backend

pub mod analysis_errors;
pub mod poll;
pub mod url_validator;

pub use analysis_errors::{AnalysisError, AnalysisErrorResponse, AnalysisResult};
pub use poll::{poll_until_ready, PollOutcome, PollPolicy};
pub use url_validator::{
    extract_domain, validate_and_normalize, NormalizedUrl, ValidationError, MAX_URL_LENGTH,
};
