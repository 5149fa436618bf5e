use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AnswerSet, ClassificationResult, ClassificationSchema};
use super::scoring::evaluate;

/// Server-driven lifecycle of an evaluation session.
///
/// Transitions happen on the server (time-boxed expiry, explicit finalize);
/// the client never assigns a state directly. Its only write is building a
/// finalize request and mirroring whatever the server reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Active { expires_at: DateTime<Utc> },
    Expired,
    Finalized,
}

/// An in-progress or finalized SCP evaluation owned by one bed/site and one
/// evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSession {
    pub session_id: String,
    pub bed_id: String,
    pub evaluator: String,
    pub state: SessionState,
    pub result: Option<ClassificationResult>,
}

impl EvaluationSession {
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    /// Active but past its server-reported expiry. Used for UI gating only;
    /// the state itself stays `Active` until the server says otherwise.
    pub fn stale(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            SessionState::Active { expires_at } => now > expires_at,
            _ => false,
        }
    }

    /// Build the finalize request, the one client-initiated transition.
    ///
    /// Requires an active session and a complete answer set; both refusals
    /// are typed values the dialog branches on, surfaced inline next to the
    /// offending question.
    pub fn finalize_request(
        &self,
        schema: &ClassificationSchema,
        answers: &AnswerSet,
    ) -> Result<FinalizeRequest, SessionError> {
        if !self.is_active() {
            return Err(SessionError::NotActive);
        }

        let missing: Vec<String> = schema
            .questions
            .iter()
            .filter(|question| !answers.contains_key(&question.key))
            .map(|question| question.key.clone())
            .collect();
        if !missing.is_empty() {
            return Err(SessionError::Incomplete { missing });
        }

        let provisional = evaluate(schema, answers).ok_or(SessionError::NoBands)?;

        Ok(FinalizeRequest {
            session_id: self.session_id.clone(),
            answers: answers.clone(),
            provisional,
        })
    }

    /// Adopt the authoritative outcome returned by the evaluation API,
    /// discarding any locally computed score or band.
    pub fn adopt(&mut self, outcome: ServerOutcome) {
        self.state = outcome.state;
        self.result = Some(ClassificationResult {
            total_points: outcome.total_points,
            band: outcome.band,
        });
    }
}

/// Finalize submission; `provisional` is the local preview the server's
/// response supersedes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub session_id: String,
    pub answers: AnswerSet,
    pub provisional: ClassificationResult,
}

/// Authoritative classification returned by the evaluation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerOutcome {
    pub total_points: u32,
    pub band: String,
    #[serde(flatten)]
    pub state: SessionState,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("evaluation session is not active")]
    NotActive,
    #[error("answers missing for: {}", missing.join(", "))]
    Incomplete { missing: Vec<String> },
    #[error("classification method declares no bands")]
    NoBands,
}

/// Finalizing a new evaluation for a bed that already holds an active
/// session overwrites that session server-side; the operator must confirm
/// first. UX safeguard only, the authoritative decision stays with the
/// server.
pub fn needs_overwrite_confirmation(existing: Option<&EvaluationSession>) -> bool {
    existing.map(EvaluationSession::is_active).unwrap_or(false)
}

/// External evaluation-session API.
pub trait SessionGateway: Send + Sync {
    fn active_session(&self, bed_id: &str) -> Result<Option<EvaluationSession>, GatewayError>;
    fn finalize(&self, request: &FinalizeRequest) -> Result<ServerOutcome, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("evaluation api unavailable: {0}")]
    Unavailable(String),
    #[error("finalize rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::scp::domain::{AnswerOption, CareBand, Question};
    use chrono::Duration;

    fn schema() -> ClassificationSchema {
        ClassificationSchema {
            method: "fugulin".to_string(),
            questions: vec![Question {
                key: "q1".to_string(),
                text: "Oxigenação".to_string(),
                options: vec![AnswerOption {
                    label: "1 pt".to_string(),
                    points: 1,
                }],
            }],
            bands: vec![CareBand {
                min: 0,
                max: 10,
                label: "MINIMOS".to_string(),
            }],
        }
    }

    fn active_session() -> EvaluationSession {
        EvaluationSession {
            session_id: "ev-1".to_string(),
            bed_id: "leito-12".to_string(),
            evaluator: "coren-555".to_string(),
            state: SessionState::Active {
                expires_at: Utc::now() + Duration::hours(24),
            },
            result: None,
        }
    }

    #[test]
    fn finalize_requires_an_active_session() {
        let mut session = active_session();
        session.state = SessionState::Expired;
        let answers = AnswerSet::from([("q1".to_string(), 1)]);
        assert_eq!(
            session.finalize_request(&schema(), &answers),
            Err(SessionError::NotActive)
        );
    }

    #[test]
    fn finalize_names_the_missing_questions() {
        let session = active_session();
        match session.finalize_request(&schema(), &AnswerSet::new()) {
            Err(SessionError::Incomplete { missing }) => {
                assert_eq!(missing, vec!["q1".to_string()]);
            }
            other => panic!("expected incomplete rejection, got {other:?}"),
        }
    }

    #[test]
    fn finalize_carries_the_provisional_result() {
        let session = active_session();
        let answers = AnswerSet::from([("q1".to_string(), 1)]);
        let request = session
            .finalize_request(&schema(), &answers)
            .expect("request builds");
        assert_eq!(request.provisional.total_points, 1);
        assert_eq!(request.provisional.band, "MINIMOS");
    }

    #[test]
    fn adopt_discards_the_local_result_for_the_server_one() {
        let mut session = active_session();
        session.result = Some(ClassificationResult {
            total_points: 1,
            band: "MINIMOS".to_string(),
        });

        session.adopt(ServerOutcome {
            total_points: 9,
            band: "INTERMEDIARIOS".to_string(),
            state: SessionState::Finalized,
        });

        assert_eq!(session.state, SessionState::Finalized);
        let result = session.result.expect("authoritative result kept");
        assert_eq!(result.total_points, 9);
        assert_eq!(result.band, "INTERMEDIARIOS");
    }

    #[test]
    fn overwrite_confirmation_only_for_active_sessions() {
        let session = active_session();
        assert!(needs_overwrite_confirmation(Some(&session)));

        let mut finalized = active_session();
        finalized.state = SessionState::Finalized;
        assert!(!needs_overwrite_confirmation(Some(&finalized)));
        assert!(!needs_overwrite_confirmation(None));
    }

    #[test]
    fn stale_is_gating_only_not_a_transition() {
        let mut session = active_session();
        session.state = SessionState::Active {
            expires_at: Utc::now() - Duration::hours(1),
        };

        assert!(session.stale(Utc::now()));
        assert!(session.is_active(), "staleness never flips the state");
    }
}
