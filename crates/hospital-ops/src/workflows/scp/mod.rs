//! SCP patient-care classification: scoring, banding, and the evaluation
//! session lifecycle mirrored from the server.

pub mod domain;
pub mod scoring;
pub mod session;

pub use domain::{
    AnswerOption, AnswerSet, CareBand, ClassificationResult, ClassificationSchema, Question,
};
pub use scoring::{band_for, classify, evaluate, is_complete, score};
pub use session::{
    needs_overwrite_confirmation, EvaluationSession, FinalizeRequest, GatewayError, ServerOutcome,
    SessionError, SessionGateway, SessionState,
};
