use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use pension_scheme_registry::SchemeRateClient;
use pension_schemas::{Message, MessageCode, MutationInput, Projection, Situation};
use serde::Deserialize;

use crate::calendar::service_years;
use crate::MutationHandler;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ProjectFutureBenefitsProperties {
    projection_start_date: String,
    projection_end_date: String,
    projection_interval_months: i64,
}

/// Dates at which a projection point is computed.
///
/// A non-positive interval would loop forever if advanced literally, so it
/// is treated as a single projection at the start date instead.
fn projection_dates(start: NaiveDate, end: NaiveDate, interval_months: i64) -> Vec<NaiveDate> {
    if interval_months <= 0 {
        return vec![start];
    }
    let mut dates = Vec::new();
    let mut d = start;
    while d <= end {
        dates.push(d);
        match d.checked_add_months(Months::new(interval_months as u32)) {
            Some(next) => d = next,
            None => break,
        }
    }
    dates
}

pub struct ProjectFutureBenefits;

#[async_trait::async_trait]
impl MutationHandler for ProjectFutureBenefits {
    async fn execute(
        &self,
        state: &mut Situation,
        mutation: &MutationInput,
        scheme_rates: &dyn SchemeRateClient,
    ) -> (Vec<Message>, bool) {
        let props: ProjectFutureBenefitsProperties =
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
                    "dossier has no policies to project",
                )],
                true,
            );
        }

        if props.projection_end_date.as_str() <= props.projection_start_date.as_str() {
            return (
                vec![Message::critical(
                    MessageCode::InvalidDateRange,
                    "projection_end_date must be after projection_start_date",
                )],
                true,
            );
        }

        let mut messages = Vec::new();
        for policy in dossier.policies.iter() {
            if props.projection_start_date.as_str() < policy.employment_start_date.as_str() {
                messages.push(Message::warning(
                    MessageCode::ProjectionBeforeEmployment,
                    format!(
                        "projection start precedes employment start for policy '{}'",
                        policy.policy_id
                    ),
                ));
            }
        }

        let (Ok(start), Ok(end)) = (
            NaiveDate::parse_from_str(&props.projection_start_date, "%Y-%m-%d"),
            NaiveDate::parse_from_str(&props.projection_end_date, "%Y-%m-%d"),
        ) else {
            for policy in dossier.policies.iter_mut() {
                if policy.projections.is_none() {
                    policy.projections = Some(vec![]);
                }
            }
            return (messages, false);
        };

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

        for policy in dossier.policies.iter_mut() {
            if policy.projections.is_none() {
                policy.projections = Some(vec![]);
            }
        }

        for date in projection_dates(start, end, props.projection_interval_months) {
            let date_str = date.format("%Y-%m-%d").to_string();

            let service_years_per_policy: Vec<f64> = dossier
                .policies
                .iter()
                .map(|p| service_years(&p.employment_start_date, &date_str))
                .collect();
            let total_years: f64 = service_years_per_policy.iter().sum();

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
                let share = if total_years > 0.0 {
                    annual_pension * (service_years / total_years)
                } else {
                    0.0
                };
                policy
                    .projections
                    .get_or_insert_with(Vec::new)
                    .push(Projection {
                        date: date_str.clone(),
                        projected_pension: share,
                    });
            }
        }

        (messages, false)
    }
}
