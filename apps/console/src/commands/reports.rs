use std::sync::Arc;

use kkvat_application::{
    ExecutionFilters, ExecutionHistory, ExecutionScope, FilterInput, ListScreen, ReportBuilder,
    ReportRunner, Reports, ScheduleService, WizardStep, prettify_field_name,
};
use kkvat_core::{AppError, AppResult};
use kkvat_domain::{
    ExecutionStatus, ExecutionType, FilterCondition, Report, ReportExecution, ReportSchedule,
    ScheduleDraft, SortConfig, SortDirection, format_duration, format_file_size,
};
use kkvat_infrastructure::DirectoryDownloadSink;
use serde_json::Value;

use crate::cli::{CreateReportArgs, ExecutionAction, ReportAction, ScheduleAction, ScopeArg};

use super::Console;
use super::admin::print_page;

pub async fn reports(console: &Console, action: ReportAction) -> AppResult<()> {
    match action {
        ReportAction::List { page, search } => {
            let screen = ListScreen::<Reports>::new(console.gateway(), console.config().page_size);
            match search {
                Some(keyword) => screen.search(&keyword).await?,
                None => screen.load(page).await?,
            }
            print_page(&screen.snapshot().await, format_report);
        }
        ReportAction::Create(args) => create_report(console, args).await?,
        ReportAction::Run { id, filters } => run_report(console, id, &filters).await?,
        ReportAction::Generate { id } => {
            let execution = ReportRunner::new(console.gateway())
                .request_generation(id)
                .await?;
            println!(
                "Queued execution #{} ({}).",
                execution.id,
                execution.status.label()
            );
        }
    }
    Ok(())
}

async fn create_report(console: &Console, args: CreateReportArgs) -> AppResult<()> {
    let mut builder = ReportBuilder::new(console.gateway());
    builder.select_view(args.view).await?;

    let details = builder.details_mut();
    details.name = args.name;
    details.description = args.description;
    details.report_type = args.report_type.parse()?;
    details.is_public = args.public;

    for column in &args.columns {
        let column = column.trim();
        if !builder.fields().iter().any(|field| field.field_name == column) {
            return Err(AppError::Validation(format!(
                "view {} has no field '{column}'",
                args.view
            )));
        }
        if !builder.selected_columns().iter().any(|selected| selected == column) {
            builder.toggle_column(column);
        }
    }

    for raw in &args.filters {
        let condition = parse_filter(raw)?;
        builder.add_filter();
        builder.update_filter(builder.filters().len() - 1, condition);
    }
    for raw in &args.sorts {
        let sort = parse_sort(raw)?;
        builder.add_sort();
        builder.update_sort(builder.sorts().len() - 1, sort);
    }

    while builder.step() != WizardStep::PreviewAndSave {
        builder.next()?;
    }
    let preview_columns = builder
        .preview()?
        .first()
        .and_then(Value::as_object)
        .map(|row| row.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_default();
    println!("Preview columns: {preview_columns}");

    let report = builder.save().await?;
    println!("Saved report #{} '{}'.", report.id, report.name);
    Ok(())
}

fn parse_filter(raw: &str) -> AppResult<FilterCondition> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(operator), Some(value)) if !field.trim().is_empty() => {
            Ok(FilterCondition {
                field: field.trim().to_owned(),
                operator: operator.parse()?,
                value: Value::String(value.to_owned()),
            })
        }
        _ => Err(AppError::Validation(format!(
            "filter '{raw}' must look like FIELD:OPERATOR:VALUE"
        ))),
    }
}

fn parse_sort(raw: &str) -> AppResult<SortConfig> {
    let (field, direction) = match raw.split_once(':') {
        Some((field, direction)) => (field, direction.parse()?),
        None => (raw, SortDirection::Asc),
    };
    if field.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "sort '{raw}' must look like FIELD[:ASC|DESC]"
        )));
    }

    Ok(SortConfig {
        field: field.trim().to_owned(),
        direction,
    })
}

async fn run_report(console: &Console, id: i64, overrides: &[String]) -> AppResult<()> {
    let runner = ReportRunner::new(console.gateway());
    let mut prepared = runner.load_report(id).await?;

    for raw in overrides {
        let (name, value) = raw.split_once('=').ok_or_else(|| {
            AppError::Validation(format!("filter '{raw}' must look like NAME=VALUE"))
        })?;
        let name = name.trim();
        match prepared
            .inputs
            .iter_mut()
            .find(|input| input.name.eq_ignore_ascii_case(name))
        {
            Some(input) => input.value = Value::String(value.to_owned()),
            None => prepared.inputs.push(FilterInput {
                name: name.to_owned(),
                display: prettify_field_name(name),
                field_type: "string".to_owned(),
                value: Value::String(value.to_owned()),
            }),
        }
    }

    let rows = runner.run(&prepared.report, &prepared.inputs).await?;
    let columns = &prepared.report.selected_columns;
    println!("{}", columns.join("\t"));
    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| match row.get(column) {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!("-- {} row(s)", rows.len());
    Ok(())
}

pub async fn executions(console: &Console, action: ExecutionAction) -> AppResult<()> {
    let sink = Arc::new(DirectoryDownloadSink::new(console.config().download_dir.clone()));
    match action {
        ExecutionAction::List {
            scope,
            report,
            page,
            status,
            execution_type,
            from,
            to,
        } => {
            let scope = match (report, scope) {
                (Some(report_id), _) => ExecutionScope::Report(report_id),
                (None, ScopeArg::Mine) => ExecutionScope::Mine,
                (None, ScopeArg::Downloadable) => ExecutionScope::Downloadable,
            };
            let filters = ExecutionFilters {
                status: status
                    .as_deref()
                    .map(str::parse::<ExecutionStatus>)
                    .transpose()?,
                execution_type: execution_type
                    .as_deref()
                    .map(str::parse::<ExecutionType>)
                    .transpose()?,
                date_from: from,
                date_to: to,
            };

            let history = ExecutionHistory::new(console.gateway(), sink, console.config().page_size)
                .with_scope(scope)
                .with_filters(filters);
            history.load_page(page).await?;

            let snapshot = history.snapshot().await;
            for execution in &snapshot.executions {
                println!("{}", format_execution(execution));
            }
            println!(
                "-- page {}/{} ({} executions on the server)",
                snapshot.page + 1,
                snapshot.total_pages.max(1),
                snapshot.total_executions
            );
        }
        ExecutionAction::Download { id } => {
            let history = ExecutionHistory::new(console.gateway(), sink, console.config().page_size);
            let execution = history.get(id).await?;
            let path = history.download(&execution).await?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

pub async fn schedules(console: &Console, action: ScheduleAction) -> AppResult<()> {
    let service = ScheduleService::new(console.gateway(), console.config().page_size);
    match action {
        ScheduleAction::List { page, report } => match report {
            Some(report_id) => {
                let schedules = service.schedules_for_report(report_id).await?;
                for schedule in &schedules {
                    println!("{}", format_schedule(schedule));
                }
                println!("-- {} schedule(s) for report #{report_id}", schedules.len());
            }
            None => print_page(&service.list(page).await?, format_schedule),
        },
        ScheduleAction::Create {
            report,
            name,
            frequency,
            time,
            day_of_week,
            day_of_month,
            recipients,
            inactive,
        } => {
            let mut draft = ScheduleDraft::new(report, name, time);
            draft.email_recipients = recipients;
            draft.is_active = !inactive;
            draft.set_frequency(frequency.parse()?);
            draft.day_of_week = day_of_week;
            draft.day_of_month = day_of_month;

            service.create(&draft).await?;
            println!("Schedule '{}' created.", draft.schedule_name.trim());
        }
        ScheduleAction::Delete { id } => {
            service.delete(id).await?;
            println!("Schedule #{id} deleted.");
        }
    }
    Ok(())
}

fn format_report(report: &Report) -> String {
    format!(
        "#{} {} [{}] view={} columns={}{}",
        report.id,
        report.name,
        report.report_type.as_str(),
        report
            .view_id
            .map_or_else(|| "-".to_owned(), |view_id| view_id.to_string()),
        report.selected_columns.len(),
        if report.is_public { " public" } else { "" }
    )
}

fn format_execution(execution: &ReportExecution) -> String {
    format!(
        "#{} {} {} {} rows={} size={} duration={} at={}",
        execution.id,
        execution.report_name.as_deref().unwrap_or("-"),
        execution.status.label(),
        execution.execution_type.label(),
        execution
            .row_count
            .map_or_else(|| "-".to_owned(), |rows| rows.to_string()),
        format_file_size(execution.file_size),
        format_duration(execution.duration_ms),
        execution
            .created_at
            .map_or_else(|| "-".to_owned(), |at| at.format("%Y-%m-%d %H:%M").to_string())
    )
}

fn format_schedule(schedule: &ReportSchedule) -> String {
    format!(
        "#{} {} report=#{} {} at {} next={}{}",
        schedule.id,
        schedule.schedule_name,
        schedule.report_id,
        schedule.frequency.as_str(),
        schedule.time_of_day.as_deref().unwrap_or("-"),
        schedule
            .next_execution
            .map_or_else(|| "-".to_owned(), |at| at.format("%Y-%m-%d %H:%M").to_string()),
        if schedule.is_active { "" } else { " (inactive)" }
    )
}
