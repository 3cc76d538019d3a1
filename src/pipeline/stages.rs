// src/pipeline/stages.rs - The five filter rules, each a pure dataset -> dataset step
use crate::columns::resolve_column;
use crate::dataset::{Cell, Dataset};
use crate::error::Result;
use crate::pipeline::config::PipelineConfig;
use chrono::NaiveDateTime;
use std::collections::HashSet;

/// Stage 1: parse last-login values and derive the inactive-since column.
///
/// The last-login column is replaced by its parsed value (unparseable text
/// becomes missing). The derived column keeps the login only when it is
/// strictly earlier than `now - inactivity window`.
pub fn flag_inactive_logins(
    roster: &Dataset,
    config: &PipelineConfig,
    now: NaiveDateTime,
) -> Result<Dataset> {
    let login_idx = roster.require(&config.last_login_column)?;
    let threshold = config.inactivity_threshold(now)?;
    let pattern = config.last_login_format.as_str();

    let parsed = roster.with_column(&config.last_login_column, |r| {
        r.at(login_idx)
            .as_datetime(pattern)
            .map(Cell::DateTime)
            .unwrap_or(Cell::Missing)
    });

    Ok(parsed.with_column(&config.inactive_since_column, |r| match r.at(login_idx) {
        Cell::DateTime(login) if *login < threshold => Cell::DateTime(*login),
        _ => Cell::Missing,
    }))
}

/// Number of roster rows whose last-login value is present but unparseable
pub fn unparseable_logins(roster: &Dataset, config: &PipelineConfig) -> Result<usize> {
    let login_idx = roster.require(&config.last_login_column)?;
    Ok(roster
        .records()
        .filter(|r| {
            let cell = r.at(login_idx);
            !cell.is_missing() && cell.as_datetime(&config.last_login_format).is_none()
        })
        .count())
}

/// Stage 2: drop orders whose status or category is excluded.
///
/// Both columns are located by substring hint. Labels are matched exactly,
/// with no case or accent folding.
pub fn drop_excluded_orders(monthly: &Dataset, config: &PipelineConfig) -> Result<Dataset> {
    let status_column = resolve_column(monthly, &config.status_hint)?;
    let category_column = resolve_column(monthly, &config.category_hint)?;
    let status_idx = monthly.require(&status_column)?;
    let category_idx = monthly.require(&category_column)?;

    let is_listed = |cell: &Cell, labels: &[String]| {
        cell.as_text()
            .map(|text| labels.iter().any(|label| *label == text))
            .unwrap_or(false)
    };

    Ok(monthly.retain(|r| {
        let excluded_status = is_listed(r.at(status_idx), config.excluded_statuses.as_slice());
        let excluded_category = is_listed(r.at(category_idx), config.excluded_categories.as_slice());
        !(excluded_status || excluded_category)
    }))
}

/// Normalized form used for roster/installer name comparison
pub fn normalize_name(name: &str, fold_case: bool) -> String {
    let trimmed = name.trim();
    if fold_case {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// Installer names present in the monthly log (normalized, missing dropped)
pub fn installer_names(monthly: &Dataset, config: &PipelineConfig) -> Result<HashSet<String>> {
    let installer_idx = monthly.require(&config.installer_column)?;
    Ok(monthly
        .records()
        .filter_map(|r| r.text_at(installer_idx))
        .map(|name| normalize_name(&name, config.fold_name_case))
        .collect())
}

/// Stage 3: mark roster providers that performed no qualifying order.
///
/// The derived column holds the provider's name when it is absent from the
/// installer names, and is empty otherwise (including blank names).
pub fn mark_providers_without_service(
    roster: &Dataset,
    monthly: &Dataset,
    config: &PipelineConfig,
) -> Result<Dataset> {
    let installers = installer_names(monthly, config)?;
    let name_idx = roster.require(&config.name_column)?;

    Ok(roster.with_column(&config.without_service_column, |r| {
        match r.text_at(name_idx) {
            Some(name) if !installers.contains(&normalize_name(&name, config.fold_name_case)) => {
                Cell::Text(name)
            }
            _ => Cell::Missing,
        }
    }))
}

fn has_content(cell: &Cell) -> bool {
    cell.as_text()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

/// Stage 4: keep providers that are both inactive and without service
pub fn select_unproductive(roster: &Dataset, config: &PipelineConfig) -> Result<Dataset> {
    let inactive_idx = roster.require(&config.inactive_since_column)?;
    let without_service_idx = roster.require(&config.without_service_column)?;

    Ok(roster.retain(|r| has_content(r.at(inactive_idx)) && has_content(r.at(without_service_idx))))
}

/// Stage 5: drop providers whose order receipt is the inactive value (exact match)
pub fn drop_inactive_receipts(flagged: &Dataset, config: &PipelineConfig) -> Result<Dataset> {
    let receipt_idx = flagged.require(&config.order_receipt_column)?;
    let inactive = config.inactive_receipt_value.as_str();

    Ok(flagged.retain(|r| r.text_at(receipt_idx).as_deref() != Some(inactive)))
}
