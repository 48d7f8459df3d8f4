use pension_scheme_registry::SchemeRateClient;
use pension_schemas::{Message, MessageCode, MutationInput, Policy, Situation};
use serde::Deserialize;

use crate::MutationHandler;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AddPolicyProperties {
    scheme_id: String,
    employment_start_date: String,
    salary: f64,
    part_time_factor: f64,
}

pub struct AddPolicy;

#[async_trait::async_trait]
impl MutationHandler for AddPolicy {
    async fn execute(
        &self,
        state: &mut Situation,
        mutation: &MutationInput,
        _scheme_rates: &dyn SchemeRateClient,
    ) -> (Vec<Message>, bool) {
        let props: AddPolicyProperties =
            serde_json::from_value(mutation.mutation_properties.clone()).unwrap_or_default();

        let Some(dossier) = state.dossier.as_mut() else {
            return (
                vec![Message::critical(
                    MessageCode::DossierNotFound,
                    "no dossier exists in the current situation",
                )],
                true,
            );
        };

        if props.salary < 0.0 {
            return (
                vec![Message::critical(
                    MessageCode::InvalidSalary,
                    "salary must not be negative",
                )],
                true,
            );
        }

        if !(0.0..=1.0).contains(&props.part_time_factor) {
            return (
                vec![Message::critical(
                    MessageCode::InvalidPartTimeFactor,
                    "part_time_factor must be between 0 and 1",
                )],
                true,
            );
        }

        let mut messages = Vec::new();
        let duplicate = dossier.policies.iter().any(|p| {
            p.scheme_id == props.scheme_id && p.employment_start_date == props.employment_start_date
        });
        if duplicate {
            messages.push(Message::warning(
                MessageCode::DuplicatePolicy,
                format!(
                    "a policy for scheme '{}' starting '{}' already exists",
                    props.scheme_id, props.employment_start_date
                ),
            ));
        }

        dossier.policy_seq += 1;
        let policy_id = format!("{}-{}", dossier.dossier_id, dossier.policy_seq);
        dossier.policies.push(Policy {
            policy_id,
            scheme_id: props.scheme_id,
            employment_start_date: props.employment_start_date,
            salary: props.salary,
            part_time_factor: props.part_time_factor,
            attainable_pension: None,
            projections: None,
        });

        (messages, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pension_scheme_registry::DefaultSchemeRateClient;
    use pension_schemas::{Dossier, DossierStatus};
    use serde_json::json;

    fn dossier() -> Dossier {
        Dossier {
            dossier_id: "D1".to_string(),
            status: DossierStatus::Active,
            retirement_date: None,
            persons: vec![],
            policies: vec![],
            policy_seq: 0,
        }
    }

    fn mutation(props: serde_json::Value) -> MutationInput {
        MutationInput {
            mutation_id: "m2".to_string(),
            mutation_definition_name: "add_policy".to_string(),
            mutation_type: "add".to_string(),
            actual_at: "2020-01-01".to_string(),
            dossier_id: None,
            mutation_properties: props,
        }
    }

    #[tokio::test]
    async fn appends_a_policy_with_sequential_id() {
        let mut state = Situation {
            dossier: Some(dossier()),
        };
        let mutation = mutation(json!({
            "scheme_id": "SCHEME-A",
            "employment_start_date": "2000-01-01",
            "salary": 50000.0,
            "part_time_factor": 1.0,
        }));

        let (messages, critical) = AddPolicy
            .execute(&mut state, &mutation, &DefaultSchemeRateClient)
            .await;

        assert!(!critical);
        assert!(messages.is_empty());
        let policies = &state.dossier.unwrap().policies;
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].policy_id, "D1-1");
        assert_eq!(policies[0].salary, 50000.0);
    }

    #[tokio::test]
    async fn rejects_without_a_dossier() {
        let mut state = Situation::empty();
        let mutation = mutation(json!({"scheme_id": "SCHEME-A", "employment_start_date": "2000-01-01", "salary": 1.0, "part_time_factor": 1.0}));

        let (messages, critical) = AddPolicy
            .execute(&mut state, &mutation, &DefaultSchemeRateClient)
            .await;

        assert!(critical);
        assert_eq!(messages[0].code, MessageCode::DossierNotFound);
    }

    #[tokio::test]
    async fn rejects_negative_salary() {
        let mut state = Situation {
            dossier: Some(dossier()),
        };
        let mutation = mutation(json!({"scheme_id": "SCHEME-A", "employment_start_date": "2000-01-01", "salary": -1.0, "part_time_factor": 1.0}));

        let (messages, critical) = AddPolicy
            .execute(&mut state, &mutation, &DefaultSchemeRateClient)
            .await;

        assert!(critical);
        assert_eq!(messages[0].code, MessageCode::InvalidSalary);
    }

    #[tokio::test]
    async fn rejects_out_of_range_part_time_factor() {
        let mut state = Situation {
            dossier: Some(dossier()),
        };
        let mutation = mutation(json!({"scheme_id": "SCHEME-A", "employment_start_date": "2000-01-01", "salary": 1.0, "part_time_factor": 1.5}));

        let (messages, critical) = AddPolicy
            .execute(&mut state, &mutation, &DefaultSchemeRateClient)
            .await;

        assert!(critical);
        assert_eq!(messages[0].code, MessageCode::InvalidPartTimeFactor);
    }

    #[tokio::test]
    async fn duplicate_scheme_and_start_warns_but_still_adds() {
        let mut d = dossier();
        d.policy_seq = 1;
        d.policies.push(Policy {
            policy_id: "D1-1".to_string(),
            scheme_id: "SCHEME-A".to_string(),
            employment_start_date: "2000-01-01".to_string(),
            salary: 50000.0,
            part_time_factor: 1.0,
            attainable_pension: None,
            projections: None,
        });
        let mut state = Situation { dossier: Some(d) };
        let mutation = mutation(json!({"scheme_id": "SCHEME-A", "employment_start_date": "2000-01-01", "salary": 60000.0, "part_time_factor": 1.0}));

        let (messages, critical) = AddPolicy
            .execute(&mut state, &mutation, &DefaultSchemeRateClient)
            .await;

        assert!(!critical);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].code, MessageCode::DuplicatePolicy);
        assert_eq!(state.dossier.unwrap().policies.len(), 2);
    }
}
