pub mod add_policy;
pub mod apply_indexation;
pub mod calculate_retirement_benefit;
pub mod create_dossier;
pub mod project_future_benefits;
