//! The calculation driver: folds an ordered mutation stream over a situation,
//! accumulating messages and synthesising forward/backward patches between
//! consecutive snapshots.

use chrono::Utc;
use pension_jsonpatch::diff_both;
use pension_schemas::{
    CalculationMetadata, CalculationRequest, CalculationResponse, CalculationResult,
    EndSituation, InitialSituation, Message, MessageCode, MutationInput, Outcome,
    ProcessedMutation, Situation,
};
use pension_scheme_registry::SchemeRateClient;

/// Folds `request.calculation_instructions.mutations` over an initially
/// empty situation and assembles the full response.
///
/// Assumes the caller has already validated that `mutations` is non-empty;
/// the HTTP boundary enforces that before this is reached.
pub async fn process(
    request: &CalculationRequest,
    scheme_rates: &dyn SchemeRateClient,
) -> CalculationResponse {
    let calculation_started_at = Utc::now();
    let calculation_id = uuid::Uuid::new_v4().to_string();

    let mutations = &request.calculation_instructions.mutations;
    let first_mutation_id = mutations
        .first()
        .map(|m| m.mutation_id.clone())
        .unwrap_or_default();
    let first_actual_at = mutations
        .first()
        .map(|m| m.actual_at.clone())
        .unwrap_or_default();

    let mut state = Situation::empty();
    let mut snapshot_before = serde_json::to_value(&state).expect("Situation always serializes");

    let mut messages: Vec<Message> = Vec::new();
    let mut processed: Vec<ProcessedMutation> = Vec::new();
    let mut outcome = Outcome::Success;
    let mut last_success: Option<(String, u64, String)> = None;

    for (index, mutation) in mutations.iter().enumerate() {
        let handler = pension_mutations::lookup(&mutation.mutation_definition_name);

        let Some(handler) = handler else {
            let idx = push_message(
                &mut messages,
                Message::critical(
                    MessageCode::UnknownMutation,
                    format!(
                        "no handler registered for mutation '{}'",
                        mutation.mutation_definition_name
                    ),
                ),
            );
            processed.push(ProcessedMutation {
                mutation: mutation.clone(),
                forward_patch_to_situation_after_this_mutation: vec![],
                backward_patch_to_previous_situation: vec![],
                calculation_message_indexes: Some(vec![idx]),
            });
            outcome = Outcome::Failure;
            break;
        };

        let (step_messages, critical) = handler.execute(&mut state, mutation, scheme_rates).await;
        let indexes = push_messages(&mut messages, step_messages);

        let (forward, backward) = if critical {
            (vec![], vec![])
        } else {
            let after = serde_json::to_value(&state).expect("Situation always serializes");
            let (fwd, bwd) = diff_both(&snapshot_before, &after);
            snapshot_before = after;
            (fwd, bwd)
        };

        processed.push(ProcessedMutation {
            mutation: mutation.clone(),
            forward_patch_to_situation_after_this_mutation: forward,
            backward_patch_to_previous_situation: backward,
            calculation_message_indexes: if indexes.is_empty() {
                None
            } else {
                Some(indexes)
            },
        });

        if critical {
            outcome = Outcome::Failure;
            break;
        }

        last_success = Some((
            mutation.mutation_id.clone(),
            index as u64,
            mutation.actual_at.clone(),
        ));
    }

    let end_situation = match last_success {
        Some((mutation_id, mutation_index, actual_at)) => EndSituation {
            mutation_id,
            mutation_index,
            actual_at,
            situation: state.clone(),
        },
        None => EndSituation {
            mutation_id: first_mutation_id,
            mutation_index: 0,
            actual_at: first_actual_at.clone(),
            situation: Situation::empty(),
        },
    };

    let calculation_completed_at = Utc::now();
    let calculation_duration_ms = (calculation_completed_at - calculation_started_at)
        .num_milliseconds()
        .max(0);

    tracing::info!(
        tenant_id = %request.tenant_id,
        outcome = ?outcome,
        duration_ms = calculation_duration_ms,
        mutations = processed.len(),
        "calculation processed"
    );

    CalculationResponse {
        calculation_metadata: CalculationMetadata {
            calculation_id,
            tenant_id: request.tenant_id.clone(),
            calculation_started_at,
            calculation_completed_at,
            calculation_duration_ms,
            calculation_outcome: outcome,
        },
        calculation_result: CalculationResult {
            messages,
            mutations: processed,
            end_situation,
            initial_situation: InitialSituation {
                actual_at: first_actual_at,
                situation: Situation::empty(),
            },
        },
    }
}

/// Assigns `message` the next dense id and appends it, returning that id.
fn push_message(messages: &mut Vec<Message>, mut message: Message) -> u64 {
    let id = messages.len() as u64;
    message.id = id;
    messages.push(message);
    id
}

fn push_messages(messages: &mut Vec<Message>, step_messages: Vec<Message>) -> Vec<u64> {
    step_messages
        .into_iter()
        .map(|m| push_message(messages, m))
        .collect()
}

/// Re-exported so callers building requests (tests, the daemon) don't need
/// to depend on `pension-schemas` for this one type.
pub use pension_schemas::{CalculationInstructions, MutationInput as Mutation};

#[cfg(test)]
mod tests {
    use super::*;
    use pension_scheme_registry::DefaultSchemeRateClient;
    use serde_json::json;

    fn mutation(
        id: &str,
        name: &str,
        actual_at: &str,
        props: serde_json::Value,
    ) -> MutationInput {
        MutationInput {
            mutation_id: id.to_string(),
            mutation_definition_name: name.to_string(),
            mutation_type: "instruction".to_string(),
            actual_at: actual_at.to_string(),
            dossier_id: None,
            mutation_properties: props,
        }
    }

    fn request(mutations: Vec<MutationInput>) -> CalculationRequest {
        CalculationRequest {
            tenant_id: "tenant-1".to_string(),
            calculation_instructions: CalculationInstructions { mutations },
        }
    }

    #[tokio::test]
    async fn single_create_dossier_succeeds_with_no_messages() {
        let req = request(vec![mutation(
            "m1",
            "create_dossier",
            "2020-01-01",
            json!({"dossier_id": "D", "person_id": "P", "name": "Jane Doe", "birth_date": "1960-06-15"}),
        )]);

        let response = process(&req, &DefaultSchemeRateClient).await;

        assert_eq!(
            response.calculation_metadata.calculation_outcome,
            Outcome::Success
        );
        assert!(response.calculation_result.messages.is_empty());
        assert!(response
            .calculation_result
            .end_situation
            .situation
            .dossier
            .is_some());
        assert!(response
            .calculation_result
            .initial_situation
            .situation
            .dossier
            .is_none());
        assert_eq!(response.calculation_result.end_situation.mutation_index, 0);
    }

    #[tokio::test]
    async fn duplicate_create_dossier_fails_on_second_mutation() {
        let props = json!({"dossier_id": "D", "person_id": "P", "name": "Jane Doe", "birth_date": "1960-06-15"});
        let req = request(vec![
            mutation("m1", "create_dossier", "2020-01-01", props.clone()),
            mutation("m2", "create_dossier", "2020-01-02", props),
        ]);

        let response = process(&req, &DefaultSchemeRateClient).await;

        assert_eq!(
            response.calculation_metadata.calculation_outcome,
            Outcome::Failure
        );
        assert_eq!(response.calculation_result.mutations.len(), 2);
        assert_eq!(
            response.calculation_result.messages[0].code,
            MessageCode::DossierAlreadyExists
        );
        assert_eq!(response.calculation_result.end_situation.mutation_index, 0);
        assert_eq!(
            response.calculation_result.end_situation.mutation_id,
            "m1"
        );
    }

    #[tokio::test]
    async fn unknown_mutation_name_halts_immediately() {
        let req = request(vec![mutation(
            "m1",
            "delete_everything",
            "2020-01-01",
            json!({}),
        )]);

        let response = process(&req, &DefaultSchemeRateClient).await;

        assert_eq!(
            response.calculation_metadata.calculation_outcome,
            Outcome::Failure
        );
        assert_eq!(response.calculation_result.mutations.len(), 1);
        assert_eq!(
            response.calculation_result.messages[0].code,
            MessageCode::UnknownMutation
        );
        assert!(response.calculation_result.mutations[0]
            .forward_patch_to_situation_after_this_mutation
            .is_empty());
    }

    #[tokio::test]
    async fn full_flow_produces_invertible_patches() {
        let req = request(vec![
            mutation(
                "m1",
                "create_dossier",
                "2020-01-01",
                json!({"dossier_id": "D", "person_id": "P", "name": "Jane Doe", "birth_date": "1960-06-15"}),
            ),
            mutation(
                "m2",
                "add_policy",
                "2020-06-01",
                json!({"scheme_id": "SCHEME-A", "employment_start_date": "2000-01-01", "salary": 50000.0, "part_time_factor": 1.0}),
            ),
            mutation(
                "m3",
                "apply_indexation",
                "2021-01-01",
                json!({"percentage": 0.03}),
            ),
        ]);

        let response = process(&req, &DefaultSchemeRateClient).await;

        assert_eq!(
            response.calculation_metadata.calculation_outcome,
            Outcome::Success
        );
        assert_eq!(response.calculation_result.mutations.len(), 3);
        assert_eq!(response.calculation_result.end_situation.mutation_index, 2);
        assert_eq!(
            response.calculation_result.end_situation.actual_at,
            "2021-01-01"
        );
        let policies = &response
            .calculation_result
            .end_situation
            .situation
            .dossier
            .unwrap()
            .policies;
        assert_eq!(policies[0].salary, 51500.0);

        let mut before = serde_json::json!({"dossier": null});
        for step in &response.calculation_result.mutations {
            let patch = &step.forward_patch_to_situation_after_this_mutation;
            before = apply_patch(before, patch);
        }
        let end_value =
            serde_json::to_value(&response.calculation_result.end_situation.situation).unwrap();
        assert_eq!(before, end_value);
    }

    /// Minimal RFC 6902 applier used only to assert the round-trip property
    /// in tests; not part of the production patch path.
    fn apply_patch(
        mut doc: serde_json::Value,
        ops: &[pension_jsonpatch::PatchOp],
    ) -> serde_json::Value {
        for op in ops {
            let pointer = &op.path;
            match op.op {
                pension_jsonpatch::PatchOpKind::Remove => {
                    remove_pointer(&mut doc, pointer);
                }
                pension_jsonpatch::PatchOpKind::Add | pension_jsonpatch::PatchOpKind::Replace => {
                    set_pointer(&mut doc, pointer, op.value.clone().unwrap());
                }
            }
        }
        doc
    }

    fn set_pointer(doc: &mut serde_json::Value, pointer: &str, value: serde_json::Value) {
        if pointer.is_empty() {
            *doc = value;
            return;
        }
        let mut target = doc;
        let tokens: Vec<&str> = pointer.trim_start_matches('/').split('/').collect();
        for token in &tokens[..tokens.len() - 1] {
            target = index_mut(target, token);
        }
        let last = tokens.last().unwrap();
        match target {
            serde_json::Value::Object(map) => {
                map.insert(unescape(last), value);
            }
            serde_json::Value::Array(arr) => {
                let idx: usize = last.parse().unwrap();
                if idx == arr.len() {
                    arr.push(value);
                } else {
                    arr[idx] = value;
                }
            }
            _ => panic!("cannot set into non-container"),
        }
    }

    fn remove_pointer(doc: &mut serde_json::Value, pointer: &str) {
        let tokens: Vec<&str> = pointer.trim_start_matches('/').split('/').collect();
        let mut target = doc;
        for token in &tokens[..tokens.len() - 1] {
            target = index_mut(target, token);
        }
        let last = tokens.last().unwrap();
        match target {
            serde_json::Value::Object(map) => {
                map.remove(&unescape(last));
            }
            serde_json::Value::Array(arr) => {
                let idx: usize = last.parse().unwrap();
                arr.remove(idx);
            }
            _ => panic!("cannot remove from non-container"),
        }
    }

    fn index_mut<'a>(doc: &'a mut serde_json::Value, token: &str) -> &'a mut serde_json::Value {
        match doc {
            serde_json::Value::Object(map) => map.get_mut(&unescape(token)).unwrap(),
            serde_json::Value::Array(arr) => {
                let idx: usize = token.parse().unwrap();
                &mut arr[idx]
            }
            _ => panic!("cannot index into non-container"),
        }
    }

    fn unescape(token: &str) -> String {
        token.replace("~1", "/").replace("~0", "~")
    }
}
