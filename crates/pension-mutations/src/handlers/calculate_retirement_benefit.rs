use std::collections::HashMap;

use pension_scheme_registry::SchemeRateClient;
use pension_schemas::{Message, MessageCode, MutationInput, Situation};
use serde::Deserialize;

use crate::calendar::{calendar_years, service_years};
use crate::MutationHandler;

const ELIGIBLE_AGE: i64 = 65;
const ELIGIBLE_SERVICE_YEARS: f64 = 40.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CalculateRetirementBenefitProperties {
    retirement_date: String,
}

pub struct CalculateRetirementBenefit;

#[async_trait::async_trait]
impl MutationHandler for CalculateRetirementBenefit {
    async fn execute(
        &self,
        state: &mut Situation,
        mutation: &MutationInput,
        scheme_rates: &dyn SchemeRateClient,
    ) -> (Vec<Message>, bool) {
        let props: CalculateRetirementBenefitProperties =
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
                    "dossier has no policies to retire",
                )],
                true,
            );
        }

        let birth_date = dossier
            .persons
            .first()
            .map(|p| p.birth_date.as_str())
            .unwrap_or_default();
        let age = calendar_years(birth_date, &props.retirement_date);

        let service_years_per_policy: Vec<f64> = dossier
            .policies
            .iter()
            .map(|p| service_years(&p.employment_start_date, &props.retirement_date))
            .collect();
        let total_years: f64 = service_years_per_policy.iter().sum();

        if age < ELIGIBLE_AGE && total_years < ELIGIBLE_SERVICE_YEARS {
            return (
                vec![Message::critical(
                    MessageCode::NotEligible,
                    format!(
                        "age {age} and total service years {total_years:.2} do not meet eligibility"
                    ),
                )],
                true,
            );
        }

        let mut messages = Vec::new();
        for policy in dossier.policies.iter() {
            if props.retirement_date.as_str() < policy.employment_start_date.as_str() {
                messages.push(Message::warning(
                    MessageCode::RetirementBeforeEmployment,
                    format!(
                        "retirement date precedes employment start for policy '{}'",
                        policy.policy_id
                    ),
                ));
            }
        }

        let scheme_ids: Vec<String> = {
            let mut ids: Vec<String> = dossier
                .policies
                .iter()
                .map(|p| p.scheme_id.clone())
                .collect();
            ids.sort();
            ids.dedup();
            ids
        };
        let rates: HashMap<String, f64> = scheme_rates.get_accrual_rates(&scheme_ids).await;

        let annual_pension: f64 = if total_years > 0.0 {
            dossier
                .policies
                .iter()
                .zip(service_years_per_policy.iter())
                .map(|(p, service_years)| {
                    let effective_salary = p.salary * p.part_time_factor;
                    let rate = rates.get(&p.scheme_id).copied().unwrap_or(
                        pension_scheme_registry::DEFAULT_ACCRUAL_RATE,
                    );
                    effective_salary * service_years * rate
                })
                .sum()
        } else {
            0.0
        };

        for (policy, service_years) in dossier
            .policies
            .iter_mut()
            .zip(service_years_per_policy.iter())
        {
            policy.attainable_pension = Some(if total_years > 0.0 {
                annual_pension * (service_years / total_years)
            } else {
                0.0
            });
        }

        dossier.status = pension_schemas::DossierStatus::Retired;
        dossier.retirement_date = Some(props.retirement_date);

        (messages, false)
    }
}
