use kkvat_application::{EntityManagementService, GenerationProgressMonitor};
use kkvat_core::{AppError, AppResult};
use kkvat_domain::{EntityConfig, ProgressStep, normalize_columns};
use serde_json::Value;

use crate::cli::EntityAction;

use super::Console;

pub async fn run(console: &Console, action: EntityAction) -> AppResult<()> {
    let service = EntityManagementService::new(console.gateway());
    match action {
        EntityAction::List => {
            for config in service.list().await? {
                println!(
                    "#{} {} table={} columns={} status={}",
                    config.id.unwrap_or_default(),
                    config.entity_name,
                    config.entity_table_name,
                    config.columns.len(),
                    config.status.as_deref().unwrap_or("-")
                );
            }
        }
        EntityAction::Create {
            name,
            table,
            columns_file,
        } => {
            let mut config = EntityConfig::new(name, table.unwrap_or_default());
            if let Some(path) = columns_file {
                let raw = tokio::fs::read(&path).await.map_err(|error| {
                    AppError::Validation(format!(
                        "failed to read columns file '{}': {error}",
                        path.display()
                    ))
                })?;
                let value: Value = serde_json::from_slice(&raw).map_err(|error| {
                    AppError::Validation(format!(
                        "columns file '{}' is not JSON: {error}",
                        path.display()
                    ))
                })?;
                config.columns = normalize_columns(&value);
            }

            let creation = service.create(config).await?;
            match (creation.id, creation.generation) {
                (Some(id), Some(Ok(outcome))) => {
                    println!("Created entity #{id}; generation: {}", outcome.summary());
                }
                (Some(id), Some(Err(error))) => {
                    println!("Created entity #{id}; generation failed: {}", error.message());
                }
                _ => println!("Created entity; the backend returned no id to generate."),
            }
        }
        EntityAction::Generate { id } => {
            let outcome = service.generate(id).await?;
            println!("{}", outcome.summary());
        }
        EntityAction::Generated => {
            for artifact in service.list_generated().await? {
                println!(
                    "{} {}",
                    artifact.name,
                    artifact.path.as_deref().unwrap_or("")
                );
            }
        }
        EntityAction::DeleteGenerated { name } => {
            service.delete_generated(&name).await?;
            println!("Deleted generated folder '{name}'.");
        }
        EntityAction::Progress { name } => follow_progress(console, &name).await?,
    }
    Ok(())
}

async fn follow_progress(console: &Console, name: &str) -> AppResult<()> {
    let mut monitor =
        GenerationProgressMonitor::new(console.gateway(), console.config().progress_interval);
    let mut steps = monitor.subscribe();
    monitor.watch(name);
    println!("Following generation of '{name}' (Ctrl-C to stop).");

    loop {
        tokio::select! {
            changed = steps.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = steps.borrow_and_update().clone();
                print_steps(&snapshot);
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    tracing::warn!(error = %error, "failed to listen for ctrl-c");
                }
                break;
            }
        }
    }

    drop(monitor);
    tracing::info!(name, "stopped following generation progress");
    Ok(())
}

fn print_steps(steps: &[ProgressStep]) {
    if steps.is_empty() {
        println!("(no progress reported yet)");
        return;
    }

    for step in steps {
        println!(
            "{:>3} {:<30} {:<12} {}",
            step.step.map(|number| number.to_string()).unwrap_or_default(),
            step.name.as_deref().unwrap_or("-"),
            step.status.as_deref().unwrap_or("-"),
            step.message.as_deref().unwrap_or("")
        );
    }
}
