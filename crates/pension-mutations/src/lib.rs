//! One handler per mutation kind, plus the name-to-handler registry.
//!
//! Every handler shares the [`MutationHandler`] contract: validate first,
//! mutate the situation only when no critical was produced, and return the
//! messages it emitted along with a flag telling the driver whether to halt.

mod calendar;
pub mod handlers;

use pension_scheme_registry::SchemeRateClient;
use pension_schemas::{Message, MutationInput, Situation};

/// Implemented by each of the five mutation kinds.
///
/// The method is `async` uniformly across all five handlers so the registry
/// can hold them behind one object-safe trait; only `calculate_retirement_benefit`
/// and `project_future_benefits` actually cross an `.await` boundary, to resolve
/// accrual rates.
#[async_trait::async_trait]
pub trait MutationHandler: Send + Sync {
    /// Returns `(messages, critical)`. `state` is mutated in place only when
    /// `critical` is `false`.
    async fn execute(
        &self,
        state: &mut Situation,
        mutation: &MutationInput,
        scheme_rates: &dyn SchemeRateClient,
    ) -> (Vec<Message>, bool);
}

/// Looks up the handler registered for `mutation_definition_name`.
///
/// Returns `None` for an unrecognised name; the driver treats that as an
/// `UNKNOWN_MUTATION` critical without calling into any handler.
pub fn lookup(mutation_definition_name: &str) -> Option<Box<dyn MutationHandler>> {
    match mutation_definition_name {
        "create_dossier" => Some(Box::new(handlers::create_dossier::CreateDossier)),
        "add_policy" => Some(Box::new(handlers::add_policy::AddPolicy)),
        "apply_indexation" => Some(Box::new(handlers::apply_indexation::ApplyIndexation)),
        "calculate_retirement_benefit" => Some(Box::new(
            handlers::calculate_retirement_benefit::CalculateRetirementBenefit,
        )),
        "project_future_benefits" => Some(Box::new(
            handlers::project_future_benefits::ProjectFutureBenefits,
        )),
        _ => None,
    }
}
