use tracing::warn;

use super::domain::{AnswerSet, CareBand, ClassificationResult, ClassificationSchema};

/// Total points for the answers given so far. Unanswered questions count
/// zero, so a partial answer set still yields a live in-progress score.
pub fn score(schema: &ClassificationSchema, answers: &AnswerSet) -> u32 {
    schema
        .questions
        .iter()
        .map(|question| answers.get(&question.key).copied().unwrap_or(0))
        .sum()
}

/// First band whose inclusive `[min, max]` range contains the score.
pub fn band_for<'a>(schema: &'a ClassificationSchema, total: u32) -> Option<&'a CareBand> {
    schema.bands.iter().find(|band| band.contains(total))
}

/// Resolve the band for a score, falling back to the lowest-acuity band when
/// the score lands outside every configured range.
///
/// An out-of-range score is a schema-authoring defect, not an operator
/// error, and the classification display must never be empty; the gap is
/// logged so an administrator can repair the method. `None` only when the
/// schema declares no bands at all.
pub fn classify<'a>(schema: &'a ClassificationSchema, total: u32) -> Option<&'a CareBand> {
    if let Some(band) = band_for(schema, total) {
        return Some(band);
    }

    match schema.bands.first() {
        Some(lowest) => {
            warn!(
                method = %schema.method,
                total,
                fallback = %lowest.label,
                "score outside every configured band, using lowest-acuity fallback"
            );
            Some(lowest)
        }
        None => {
            warn!(method = %schema.method, "classification method declares no bands");
            None
        }
    }
}

/// True when every question has an answer. Gates submission; scoring and
/// classification stay callable on partial input for live feedback.
pub fn is_complete(schema: &ClassificationSchema, answers: &AnswerSet) -> bool {
    schema
        .questions
        .iter()
        .all(|question| answers.contains_key(&question.key))
}

/// Provisional local result for immediate display; the evaluation API's
/// response supersedes it once the submission round-trips.
pub fn evaluate(schema: &ClassificationSchema, answers: &AnswerSet) -> Option<ClassificationResult> {
    let total_points = score(schema, answers);
    classify(schema, total_points).map(|band| ClassificationResult {
        total_points,
        band: band.label.clone(),
    })
}
