//! Serviceability statuses returned by the SQ API

/// Outcome of a serviceability check, as rendered to the end user.
///
/// The confirmation page carries one section per variant (CSS classes
/// `sq-Error`, `sq-OnNetwork`, `sq-ExpressionOfInterest`); anything the API
/// returns outside this set collapses to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqStatus {
    Error,
    OnNetwork,
    ExpressionOfInterest,
}

impl SqStatus {
    /// Every status, in the order the confirmation sections are declared
    pub const ALL: [SqStatus; 3] = [
        SqStatus::Error,
        SqStatus::OnNetwork,
        SqStatus::ExpressionOfInterest,
    ];

    /// Map an API `status` string onto the closed set; unknown values are
    /// treated as `Error`.
    pub fn from_status(status: &str) -> Self {
        match status {
            "OnNetwork" => SqStatus::OnNetwork,
            "ExpressionOfInterest" => SqStatus::ExpressionOfInterest,
            _ => SqStatus::Error,
        }
    }

    /// The status name as stored in form entries and used in CSS classes
    pub fn as_str(&self) -> &'static str {
        match self {
            SqStatus::Error => "Error",
            SqStatus::OnNetwork => "OnNetwork",
            SqStatus::ExpressionOfInterest => "ExpressionOfInterest",
        }
    }
}

impl std::fmt::Display for SqStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
