use pension_scheme_registry::SchemeRateClient;
use pension_schemas::{Message, MessageCode, MutationInput, Situation};
use serde::Deserialize;

use crate::MutationHandler;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ApplyIndexationProperties {
    percentage: f64,
    scheme_id: Option<String>,
    effective_before: Option<String>,
}

fn matches_filter(
    policy_scheme_id: &str,
    policy_employment_start_date: &str,
    scheme_id: &Option<String>,
    effective_before: &Option<String>,
) -> bool {
    if let Some(scheme_id) = scheme_id {
        if policy_scheme_id != scheme_id {
            return false;
        }
    }
    if let Some(effective_before) = effective_before {
        if !(policy_employment_start_date < effective_before.as_str()) {
            return false;
        }
    }
    true
}

pub struct ApplyIndexation;

#[async_trait::async_trait]
impl MutationHandler for ApplyIndexation {
    async fn execute(
        &self,
        state: &mut Situation,
        mutation: &MutationInput,
        _scheme_rates: &dyn SchemeRateClient,
    ) -> (Vec<Message>, bool) {
        let props: ApplyIndexationProperties =
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

        if dossier.policies.is_empty() {
            return (
                vec![Message::critical(
                    MessageCode::NoPolicies,
                    "dossier has no policies to index",
                )],
                true,
            );
        }

        let filter_active = props.scheme_id.is_some() || props.effective_before.is_some();
        let mut messages = Vec::new();
        let mut matched = 0usize;

        for policy in dossier.policies.iter_mut() {
            if !matches_filter(
                &policy.scheme_id,
                &policy.employment_start_date,
                &props.scheme_id,
                &props.effective_before,
            ) {
                continue;
            }
            matched += 1;

            let mut new_salary = policy.salary * (1.0 + props.percentage);
            if new_salary < 0.0 {
                new_salary = 0.0;
                messages.push(Message::warning(
                    MessageCode::NegativeSalaryClamped,
                    format!("indexation drove policy '{}' below zero, clamped", policy.policy_id),
                ));
            }
            policy.salary = new_salary;
        }

        if filter_active && matched == 0 {
            messages.insert(
                0,
                Message::warning(
                    MessageCode::NoMatchingPolicies,
                    "no policies matched the indexation filter",
                ),
            );
        }

        (messages, false)
    }
}
