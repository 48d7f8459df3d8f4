use chrono::{NaiveDate, Utc};
use pension_scheme_registry::SchemeRateClient;
use pension_schemas::{
    Dossier, DossierStatus, Message, MessageCode, MutationInput, Person, PersonRole, Situation,
};
use serde::Deserialize;

use crate::MutationHandler;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CreateDossierProperties {
    dossier_id: String,
    person_id: String,
    name: String,
    birth_date: String,
}

pub struct CreateDossier;

#[async_trait::async_trait]
impl MutationHandler for CreateDossier {
    async fn execute(
        &self,
        state: &mut Situation,
        mutation: &MutationInput,
        _scheme_rates: &dyn SchemeRateClient,
    ) -> (Vec<Message>, bool) {
        let props: CreateDossierProperties =
            serde_json::from_value(mutation.mutation_properties.clone()).unwrap_or_default();

        if state.dossier.is_some() {
            return (
                vec![Message::critical(
                    MessageCode::DossierAlreadyExists,
                    "a dossier already exists for this situation",
                )],
                true,
            );
        }

        if props.name.trim().is_empty() {
            return (
                vec![Message::critical(
                    MessageCode::InvalidName,
                    "name must not be empty",
                )],
                true,
            );
        }

        match NaiveDate::parse_from_str(&props.birth_date, "%Y-%m-%d") {
            Ok(birth_date) if birth_date <= Utc::now().date_naive() => {}
            _ => {
                return (
                    vec![Message::critical(
                        MessageCode::InvalidBirthDate,
                        format!("birth_date '{}' is invalid or in the future", props.birth_date),
                    )],
                    true,
                );
            }
        }

        state.dossier = Some(Dossier {
            dossier_id: props.dossier_id.clone(),
            status: DossierStatus::Active,
            retirement_date: None,
            persons: vec![Person {
                person_id: props.person_id,
                role: PersonRole::Participant,
                name: props.name,
                birth_date: props.birth_date,
            }],
            policies: vec![],
            policy_seq: 0,
        });

        (vec![], false)
    }
}
