//! Static admission filtering for learner-submitted SQL.
//!
//! The filter decides, without contacting the database, whether a raw input
//! string looks like a single read-only row-retrieval statement. It is
//! deliberately lexical: substring and prefix checks only, no SQL parsing.
//! Keyword obfuscation through comments or data-modifying CTEs is not
//! detected here; the sandbox role's privileges and the statement timeout
//! are the backstop for what slips through.

use thiserror::Error;

/// Tokens that mark a statement as data definition or data modification.
///
/// Matching is substring-based on the uppercased input, so a column named
/// `updated_at` is rejected too. Over-rejection is the accepted tradeoff;
/// loosening it to whole-word matching changes observable behavior.
pub const FORBIDDEN_KEYWORDS: [&str; 10] = [
    "DROP", "DELETE", "TRUNCATE", "ALTER", "CREATE", "INSERT", "UPDATE", "GRANT", "REVOKE",
    "EXEC",
];

/// Reasons the admission filter refuses a statement.
///
/// The `Display` output is the user-facing error message and is surfaced
/// verbatim in the failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// A denylisted keyword occurs somewhere in the statement.
    #[error("query contains forbidden keyword: {0}")]
    ForbiddenKeyword(&'static str),
    /// The statement does not begin with `SELECT`.
    #[error("only SELECT queries are allowed")]
    NotSelect,
    /// More than one `;`-separated statement was submitted.
    #[error("multiple SQL statements are not allowed")]
    MultipleStatements,
}

/// Decides whether `text` may be executed against the sandbox database.
///
/// Accepts arbitrary input of any length without panicking. On acceptance
/// the original, unmodified text is returned; the uppercased copy used for
/// scanning is never executed. Rules are evaluated in a fixed order so the
/// reported reason is deterministic: forbidden keyword, then SELECT prefix,
/// then single statement. All three are enforced regardless of order since
/// each closes a distinct attack surface.
pub fn admit(text: &str) -> Result<&str, AdmissionError> {
    let upper = text.to_uppercase();

    for keyword in FORBIDDEN_KEYWORDS {
        if upper.contains(keyword) {
            return Err(AdmissionError::ForbiddenKeyword(keyword));
        }
    }

    if !upper.trim().starts_with("SELECT") {
        return Err(AdmissionError::NotSelect);
    }

    let fragments = text.split(';').filter(|s| !s.trim().is_empty()).count();
    if fragments > 1 {
        return Err(AdmissionError::MultipleStatements);
    }

    Ok(text)
}
