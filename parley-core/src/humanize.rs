//! User-facing explanations for failures
//!
//! When a reply cannot be produced, the chat shows an explanation in the
//! assistant's place instead of a raw error. Classification is best effort:
//! substring matches on the error's type label and lower-cased message.

use crate::error::Error;

/// Broad failure categories shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Connection,
    Permission,
    Timeout,
    Other,
}

/// Classify an error from its type label and message.
///
/// Checks run in a fixed order; the first match wins.
pub fn classify(type_name: &str, message: &str) -> ErrorCategory {
    let message = message.to_lowercase();

    if type_name.contains("AuthenticationError") || message.contains("invalidapikey")
        || message.contains("invalid api key") || message.contains("incorrect api key")
    {
        ErrorCategory::Authentication
    } else if type_name.contains("RateLimitError") || message.contains("rate limit") {
        ErrorCategory::RateLimit
    } else if type_name.contains("ConnectionError") || message.contains("connection") {
        ErrorCategory::Connection
    } else if type_name.contains("PermissionError")
        || type_name.contains("PermissionDenied")
        || message.contains("permission")
    {
        ErrorCategory::Permission
    } else if type_name.contains("TimeoutError") || message.contains("timeout")
        || message.contains("timed out")
    {
        ErrorCategory::Timeout
    } else {
        ErrorCategory::Other
    }
}

/// Turn an error into a message suitable for showing as the assistant's turn.
pub fn humanize_error(error: &Error) -> String {
    let type_name = error.type_name();
    // Completion errors already carry their kind in the type label.
    let message = match error {
        Error::Completion { message, .. } => message.clone(),
        other => other.to_string(),
    };

    match classify(&type_name, &message) {
        ErrorCategory::Authentication => "**Authentication Error**\n\n\
            Your API key appears to be invalid or expired. Please:\n\
            1. Check that your API key is correct\n\
            2. Verify it has sufficient credits\n\
            3. Make sure it is set in `OPENAI_API_KEY` or `llm.api_key`"
            .to_string(),
        ErrorCategory::RateLimit => "**Rate Limit Exceeded**\n\n\
            The completion API is rate limiting requests. Please:\n\
            1. Wait a few minutes before trying again\n\
            2. Check your usage in the provider dashboard\n\
            3. Consider upgrading your plan if this keeps happening"
            .to_string(),
        ErrorCategory::Connection => "**Connection Error**\n\n\
            Unable to reach the completion API. Please:\n\
            1. Check your internet connection\n\
            2. Try again in a few moments\n\
            3. Check the provider's service status"
            .to_string(),
        ErrorCategory::Permission => "**Permission Error**\n\n\
            You don't have permission to access this resource. Please:\n\
            1. Check your API key permissions\n\
            2. Verify your account status\n\
            3. Contact the provider's support if needed"
            .to_string(),
        ErrorCategory::Timeout => "**Timeout Error**\n\n\
            The request took too long to complete. Please:\n\
            1. Check your internet connection\n\
            2. Try again with a shorter message\n\
            3. Contact support if the issue persists"
            .to_string(),
        ErrorCategory::Other => format!("**Error ({})**: {}", type_name, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_type_name() {
        assert_eq!(classify("AuthenticationError", ""), ErrorCategory::Authentication);
        assert_eq!(classify("RateLimitError", ""), ErrorCategory::RateLimit);
        assert_eq!(classify("APIConnectionError", ""), ErrorCategory::Connection);
        assert_eq!(classify("PermissionDeniedError", ""), ErrorCategory::Permission);
        assert_eq!(classify("TimeoutError", ""), ErrorCategory::Timeout);
        assert_eq!(classify("APIError", "boom"), ErrorCategory::Other);
    }

    #[test]
    fn test_classify_by_message() {
        assert_eq!(classify("APIError", "InvalidApiKey"), ErrorCategory::Authentication);
        assert_eq!(classify("APIError", "Rate limit reached"), ErrorCategory::RateLimit);
        assert_eq!(classify("IoError", "Connection reset by peer"), ErrorCategory::Connection);
        assert_eq!(classify("IoError", "Permission denied"), ErrorCategory::Permission);
        assert_eq!(classify("IoError", "operation timed out"), ErrorCategory::Timeout);
    }

    #[test]
    fn test_humanize_known_category() {
        let err = Error::completion("RateLimitError", "HTTP 429: too many requests");
        let text = humanize_error(&err);
        assert!(text.contains("Rate Limit Exceeded"));
        assert!(!text.contains("429"));
    }

    #[test]
    fn test_humanize_generic_carries_type_and_message() {
        let err = Error::completion("APIError", "HTTP 500: internal");
        let text = humanize_error(&err);
        assert_eq!(text, "**Error (APIError)**: HTTP 500: internal");
    }

    #[test]
    fn test_humanize_unreachable_store() {
        let err = Error::Store("connection refused".to_string());
        assert!(humanize_error(&err).contains("Connection Error"));
    }

    #[test]
    fn test_humanize_is_never_empty() {
        let err = Error::Store(String::new());
        assert!(!humanize_error(&err).trim().is_empty());
    }
}
