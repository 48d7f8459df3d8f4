use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use pension_jsonpatch::PatchOp;

/// The full domain state at a point in the mutation pipeline. Empty iff
/// `dossier` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Situation {
    pub dossier: Option<Dossier>,
}

impl Situation {
    pub fn empty() -> Self {
        Self { dossier: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dossier {
    pub dossier_id: String,
    pub status: DossierStatus,
    pub retirement_date: Option<String>,
    pub persons: Vec<Person>,
    pub policies: Vec<Policy>,
    #[serde(skip)]
    pub policy_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DossierStatus {
    Active,
    Retired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub person_id: String,
    pub role: PersonRole,
    pub name: String,
    pub birth_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonRole {
    Participant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: String,
    pub scheme_id: String,
    pub employment_start_date: String,
    pub salary: f64,
    pub part_time_factor: f64,
    pub attainable_pension: Option<f64>,
    pub projections: Option<Vec<Projection>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub date: String,
    pub projected_pension: f64,
}

/// Severity of a message emitted while processing a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageLevel {
    Critical,
    Warning,
}

/// Closed enumeration of error/warning codes the handlers may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageCode {
    UnknownMutation,
    DossierAlreadyExists,
    DossierNotFound,
    NoPolicies,
    InvalidName,
    InvalidBirthDate,
    InvalidSalary,
    InvalidPartTimeFactor,
    DuplicatePolicy,
    NegativeSalaryClamped,
    NoMatchingPolicies,
    NotEligible,
    RetirementBeforeEmployment,
    InvalidDateRange,
    ProjectionBeforeEmployment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub level: MessageLevel,
    pub code: MessageCode,
    pub message: String,
}

impl Message {
    pub fn critical(code: MessageCode, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            level: MessageLevel::Critical,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: MessageCode, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            level: MessageLevel::Warning,
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub tenant_id: String,
    pub calculation_instructions: CalculationInstructions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationInstructions {
    pub mutations: Vec<MutationInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationInput {
    pub mutation_id: String,
    pub mutation_definition_name: String,
    pub mutation_type: String,
    pub actual_at: String,
    #[serde(default)]
    pub dossier_id: Option<String>,
    #[serde(default = "serde_json::Value::default")]
    pub mutation_properties: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResponse {
    pub calculation_metadata: CalculationMetadata,
    pub calculation_result: CalculationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationMetadata {
    pub calculation_id: String,
    pub tenant_id: String,
    pub calculation_started_at: DateTime<Utc>,
    pub calculation_completed_at: DateTime<Utc>,
    pub calculation_duration_ms: i64,
    pub calculation_outcome: Outcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResult {
    pub messages: Vec<Message>,
    pub mutations: Vec<ProcessedMutation>,
    pub end_situation: EndSituation,
    pub initial_situation: InitialSituation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedMutation {
    pub mutation: MutationInput,
    pub forward_patch_to_situation_after_this_mutation: Vec<PatchOp>,
    pub backward_patch_to_previous_situation: Vec<PatchOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_message_indexes: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialSituation {
    pub actual_at: String,
    pub situation: Situation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSituation {
    pub mutation_id: String,
    pub mutation_index: u64,
    pub actual_at: String,
    pub situation: Situation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
}
