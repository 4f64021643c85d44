//! Symptom triage: suggestion lookup and severity grading.
//!
//! This crate holds the portal's only piece of clinical decision logic. It is deliberately
//! small: a fixed rule table mapping reported symptom labels to a single suggestion string,
//! plus a coarse severity grade over the same labels.
//!
//! Responsibilities:
//! - Define the closed vocabulary of suggestions ([`Suggestion`])
//! - Map a set of symptom labels to exactly one suggestion ([`classify`])
//! - Grade the same set of labels into low/medium/high severity ([`grade`])
//!
//! Notes:
//! - Everything here is pure and total: no I/O, no shared state, no failure path.
//!   Identical inputs always produce identical outputs, and concurrent callers need
//!   no coordination.
//! - Symptom labels are matched case-insensitively; no other normalisation is applied.
//! - A suggestion is not a diagnosis. The strings are patient-facing prompts.

mod severity;

pub use severity::{grade, Severity};

/// The suggestion returned by the symptom classifier.
///
/// This is a closed vocabulary: the classifier can only ever produce one of these five
/// outcomes. The wire/display strings are fixed and patient-facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Suggestion {
    /// Fever together with cough.
    PossibleFlu,
    /// Headache together with fatigue.
    PossibleMigraine,
    /// Sore throat together with fever.
    PossibleInfection,
    /// The caller supplied no symptoms at all.
    NoSymptomsSelected,
    /// Symptoms were supplied but no rule matched.
    FurtherConsultation,
}

impl Suggestion {
    /// The fixed patient-facing string for this suggestion.
    pub fn as_str(self) -> &'static str {
        match self {
            Suggestion::PossibleFlu => "Possible Flu",
            Suggestion::PossibleMigraine => "Possible Migraine",
            Suggestion::PossibleInfection => "Possible Infection",
            Suggestion::NoSymptomsSelected => "Please select at least one symptom",
            Suggestion::FurtherConsultation => "Further consultation recommended",
        }
    }

    /// Parse a suggestion from its fixed string form.
    ///
    /// Returns `None` for anything outside the closed vocabulary.
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "Possible Flu" => Some(Suggestion::PossibleFlu),
            "Possible Migraine" => Some(Suggestion::PossibleMigraine),
            "Possible Infection" => Some(Suggestion::PossibleInfection),
            "Please select at least one symptom" => Some(Suggestion::NoSymptomsSelected),
            "Further consultation recommended" => Some(Suggestion::FurtherConsultation),
            _ => None,
        }
    }
}

impl std::fmt::Display for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Suggestion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Suggestion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Suggestion::from_label(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown suggestion: '{s}'")))
    }
}

/// The combined outcome of a triage check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TriageReport {
    /// Suggestion from the rule table.
    pub suggestion: Suggestion,
    /// Coarse severity grade over the same symptom set.
    pub severity: Severity,
}

/// The rule table, in evaluation order.
///
/// Each rule fires when BOTH labels are present in the reported set. The order is part of
/// the contract: a set matching several rules takes the first match, so {fever, cough,
/// sore throat} is classified as flu, not infection. Do not reorder.
const RULES: [(&str, &str, Suggestion); 3] = [
    ("fever", "cough", Suggestion::PossibleFlu),
    ("headache", "fatigue", Suggestion::PossibleMigraine),
    ("sore throat", "fever", Suggestion::PossibleInfection),
];

/// Case-fold the reported labels for membership testing.
fn fold<I, S>(symptoms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symptoms
        .into_iter()
        .map(|s| s.as_ref().to_lowercase())
        .collect()
}

fn classify_folded(folded: &[String]) -> Suggestion {
    if folded.is_empty() {
        return Suggestion::NoSymptomsSelected;
    }

    let has = |label: &str| folded.iter().any(|s| s == label);

    for (first, second, suggestion) in RULES {
        if has(first) && has(second) {
            return suggestion;
        }
    }

    Suggestion::FurtherConsultation
}

/// Map a set of reported symptom labels to a single suggestion.
///
/// Labels are matched case-insensitively; order and duplicates are irrelevant because the
/// rules only test membership. An empty input is a distinct valid outcome
/// ([`Suggestion::NoSymptomsSelected`]), not an error.
///
/// This function cannot fail and has no side effects.
pub fn classify<I, S>(symptoms: I) -> Suggestion
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    classify_folded(&fold(symptoms))
}

/// Run the full triage check: suggestion plus severity grade.
///
/// Equivalent to calling [`classify`] and [`grade`] on the same input, folding the labels
/// only once.
pub fn assess<I, S>(symptoms: I) -> TriageReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let folded = fold(symptoms);
    TriageReport {
        suggestion: classify_folded(&folded),
        severity: severity::grade_folded(&folded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_prompts_for_symptoms() {
        let symptoms: [&str; 0] = [];
        assert_eq!(classify(symptoms), Suggestion::NoSymptomsSelected);
        assert_eq!(
            classify(symptoms).as_str(),
            "Please select at least one symptom"
        );
    }

    #[test]
    fn fever_and_cough_suggest_flu() {
        assert_eq!(classify(["Fever", "Cough"]), Suggestion::PossibleFlu);
        assert_eq!(classify(["Fever", "Cough"]).as_str(), "Possible Flu");
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify(["fever", "COUGH"]), Suggestion::PossibleFlu);
        assert_eq!(classify(["FeVeR", "cOuGh"]), Suggestion::PossibleFlu);
    }

    #[test]
    fn headache_and_fatigue_suggest_migraine() {
        assert_eq!(
            classify(["Headache", "Fatigue"]),
            Suggestion::PossibleMigraine
        );
    }

    #[test]
    fn sore_throat_and_fever_suggest_infection() {
        assert_eq!(
            classify(["Sore Throat", "Fever"]),
            Suggestion::PossibleInfection
        );
    }

    #[test]
    fn flu_rule_wins_over_infection_rule() {
        // {fever, cough, sore throat} satisfies both the flu and infection rules;
        // the flu rule is evaluated first and must win.
        assert_eq!(
            classify(["Fever", "Cough", "Sore Throat"]),
            Suggestion::PossibleFlu
        );
    }

    #[test]
    fn unmatched_symptoms_recommend_consultation() {
        assert_eq!(classify(["Dizziness"]), Suggestion::FurtherConsultation);
        assert_eq!(
            classify(["Dizziness"]).as_str(),
            "Further consultation recommended"
        );
    }

    #[test]
    fn single_rule_symptom_is_not_enough() {
        // Each rule requires BOTH of its labels.
        assert_eq!(classify(["Fever"]), Suggestion::FurtherConsultation);
        assert_eq!(classify(["Cough"]), Suggestion::FurtherConsultation);
    }

    #[test]
    fn duplicates_and_order_are_irrelevant() {
        assert_eq!(
            classify(["Cough", "Fever", "Cough", "Fever"]),
            Suggestion::PossibleFlu
        );
        assert_eq!(classify(["Cough", "Fever"]), classify(["Fever", "Cough"]));
    }

    #[test]
    fn classify_is_deterministic() {
        let symptoms = ["Headache", "Fatigue", "Nausea"];
        assert_eq!(classify(symptoms), classify(symptoms));
    }

    #[test]
    fn assess_combines_suggestion_and_severity() {
        let report = assess(["Fever", "Cough"]);
        assert_eq!(report.suggestion, Suggestion::PossibleFlu);
        assert_eq!(report.severity, Severity::Medium);

        let report = assess(["Chest Pain"]);
        assert_eq!(report.suggestion, Suggestion::FurtherConsultation);
        assert_eq!(report.severity, Severity::High);
    }

    #[test]
    fn suggestion_label_round_trip() {
        for suggestion in [
            Suggestion::PossibleFlu,
            Suggestion::PossibleMigraine,
            Suggestion::PossibleInfection,
            Suggestion::NoSymptomsSelected,
            Suggestion::FurtherConsultation,
        ] {
            assert_eq!(Suggestion::from_label(suggestion.as_str()), Some(suggestion));
        }
        assert_eq!(Suggestion::from_label("Possible Plague"), None);
    }

    #[test]
    fn suggestion_serialises_as_its_label() {
        let json = serde_json::to_string(&Suggestion::PossibleFlu).unwrap();
        assert_eq!(json, "\"Possible Flu\"");

        let parsed: Suggestion = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Suggestion::PossibleFlu);
    }
}
