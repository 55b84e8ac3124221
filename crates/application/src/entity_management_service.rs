use serde_json::{Value, json};

use kkvat_core::{AppError, AppResult};
use kkvat_domain::{EntityConfig, GeneratedArtifact, GenerationOutcome};

use crate::api_gateway::ApiGateway;
use crate::list_envelope::decode_rows;
use crate::list_screen::{EntityConfigs, ListScreen};

const ENTITY_MANAGEMENT_PATH: &str = "/api/entity-management";

/// Result of creating an entity definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCreation {
    /// Identifier assigned by the backend, when the response carried one.
    pub id: Option<i64>,
    /// Outcome of the follow-up generation, `None` when no id was returned.
    pub generation: Option<AppResult<GenerationOutcome>>,
}

/// Application service for entity definitions and generated artifacts.
pub struct EntityManagementService {
    gateway: ApiGateway,
    screen: ListScreen<EntityConfigs>,
}

impl EntityManagementService {
    /// Creates a new service from the shared gateway.
    #[must_use]
    pub fn new(gateway: ApiGateway) -> Self {
        Self {
            screen: ListScreen::new(gateway.clone(), u32::MAX),
            gateway,
        }
    }

    /// Returns every entity definition.
    pub async fn list(&self) -> AppResult<Vec<EntityConfig>> {
        self.screen.load(0).await?;
        Ok(self.screen.snapshot().await.rows)
    }

    /// Returns one entity definition.
    pub async fn get(&self, id: i64) -> AppResult<EntityConfig> {
        self.screen.get(id).await
    }

    /// Creates a definition and, when the backend returns its id, generates it.
    ///
    /// A generation failure does not undo the creation; it is reported in
    /// [`EntityCreation::generation`].
    pub async fn create(&self, mut config: EntityConfig) -> AppResult<EntityCreation> {
        config.prepare_for_submit()?;
        let created = self.screen.create(&config).await?;

        let Some(id) = created_id(&created) else {
            tracing::warn!(entity = %config.entity_name, "create response carried no id, skipping generation");
            return Ok(EntityCreation {
                id: None,
                generation: None,
            });
        };

        let generation = self.generate(id).await;
        Ok(EntityCreation {
            id: Some(id),
            generation: Some(generation),
        })
    }

    /// Replaces a definition.
    pub async fn update(&self, id: i64, mut config: EntityConfig) -> AppResult<()> {
        config.prepare_for_submit()?;
        self.screen.update(id, &config).await?;
        Ok(())
    }

    /// Deletes a definition.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.screen.delete(id).await
    }

    /// Runs the code generator for a stored definition.
    pub async fn generate(&self, id: i64) -> AppResult<GenerationOutcome> {
        let outcome: GenerationOutcome = self
            .gateway
            .post_json(&format!("{ENTITY_MANAGEMENT_PATH}/{id}/generate"), &json!({}))
            .await?;

        if outcome.status.as_deref() == Some("error") {
            return Err(AppError::Internal(format!(
                "generation failed: {}",
                outcome.summary()
            )));
        }

        tracing::info!(id, message = outcome.summary(), "generation finished");
        Ok(outcome)
    }

    /// Lists generated artifact folders.
    pub async fn list_generated(&self) -> AppResult<Vec<GeneratedArtifact>> {
        let payload: Value = self
            .gateway
            .get_json(&format!("{ENTITY_MANAGEMENT_PATH}/generated"), &[])
            .await?;

        let keyed_values = match &payload {
            Value::Object(map) if map.values().all(Value::is_object) => {
                Some(Value::Array(map.values().cloned().collect()))
            }
            _ => None,
        };

        let artifacts = decode_rows(payload);
        if artifacts.is_empty()
            && let Some(values) = keyed_values
        {
            return Ok(decode_rows(values));
        }
        Ok(artifacts)
    }

    /// Deletes a generated artifact folder.
    pub async fn delete_generated(&self, name: &str) -> AppResult<()> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(AppError::Validation(format!(
                "'{name}' is not a generated folder name"
            )));
        }

        self.gateway
            .delete(&format!("{ENTITY_MANAGEMENT_PATH}/generated/{name}"))
            .await?;
        tracing::info!(name, "generated folder deleted");
        Ok(())
    }
}

fn created_id(created: &Value) -> Option<i64> {
    created
        .get("id")
        .or_else(|| created.get("entity").and_then(|entity| entity.get("id")))
        .and_then(|id| match id {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .filter(|id| *id > 0)
}

#[cfg(test)]
mod tests;
