//! Severity grading over reported symptom labels.
//!
//! Grading is independent of the suggestion rule table: it looks only at whether any
//! reported label belongs to a fixed high-risk or medium-risk set. High risk dominates
//! medium, medium dominates low. An empty report grades as low.

/// Labels that grade a symptom set as high severity.
const HIGH_RISK: [&str; 3] = ["chest pain", "shortness of breath", "severe headache"];

/// Labels that grade a symptom set as medium severity, absent any high-risk label.
const MEDIUM_RISK: [&str; 3] = ["fever", "body pain", "persistent cough"];

/// Coarse severity grade of a reported symptom set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No risk-listed labels present.
    Low,
    /// At least one medium-risk label, no high-risk label.
    Medium,
    /// At least one high-risk label.
    High,
}

impl Severity {
    /// The lowercase wire string for this grade.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn grade_folded(folded: &[String]) -> Severity {
    let has = |label: &str| folded.iter().any(|s| s == label);

    if HIGH_RISK.iter().any(|label| has(label)) {
        return Severity::High;
    }
    if MEDIUM_RISK.iter().any(|label| has(label)) {
        return Severity::Medium;
    }
    Severity::Low
}

/// Grade a set of reported symptom labels.
///
/// Labels are matched case-insensitively, like [`classify`](crate::classify). Pure and
/// total: no failure path, no side effects.
pub fn grade<I, S>(symptoms: I) -> Severity
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let folded: Vec<String> = symptoms
        .into_iter()
        .map(|s| s.as_ref().to_lowercase())
        .collect();
    grade_folded(&folded)
}
