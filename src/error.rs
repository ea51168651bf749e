use crate::digest::eligibility::Eligibility;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),
    #[error("thread not eligible: {0}")]
    EligibilityRejected(Eligibility),
    #[error("thread {thread_id} has no comments to summarize")]
    NothingToSummarize { thread_id: u64 },
    #[error("{provider} returned an empty summary")]
    EmptySummary { provider: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("summarization failed: {0}")]
    Unclassified(String),
}

impl SummarizeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingConfiguration(_) => "missing_configuration",
            Self::EligibilityRejected(_) => "eligibility_rejected",
            Self::NothingToSummarize { .. } => "nothing_to_summarize",
            Self::EmptySummary { .. } => "empty_summary",
            Self::Timeout(_) => "timeout",
            Self::TransportFailure(_) => "transport_failure",
            Self::RateLimited(_) => "rate_limited",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Unclassified(_) => "unclassified",
        }
    }

    /// Copy shown on the display surface.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingConfiguration(detail) => format!(
                "Summarization is not configured: {detail}. Set the provider, model and API key with `thread-digest config set`."
            ),
            Self::EligibilityRejected(status) => status.explanation().to_string(),
            Self::NothingToSummarize { .. } => {
                "There are no comments to summarize in this thread yet.".to_string()
            }
            Self::EmptySummary { provider } => {
                format!("{provider} returned no summary text. Try again or pick another model.")
            }
            Self::Timeout(_) => {
                "The summarization request timed out. The thread may be too long for this model; try again or pick a faster model.".to_string()
            }
            Self::TransportFailure(detail) => format!(
                "Could not reach the summarization provider ({detail}). Check your network connection, or that the local model server is running."
            ),
            Self::RateLimited(_) => {
                "The provider is rate limiting requests. Wait a moment and try again.".to_string()
            }
            Self::QuotaExceeded(_) => {
                "Your provider account has exceeded its quota. Check your plan and billing details.".to_string()
            }
            Self::Unclassified(detail) => format!("Summarization failed: {detail}"),
        }
    }

    /// Expected outcomes that get explanatory copy but are not failures.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::EligibilityRejected(_) | Self::NothingToSummarize { .. }
        )
    }
}
