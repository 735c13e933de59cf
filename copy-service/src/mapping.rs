//! Mapping builder.
//!
//! Proposes a source → destination column mapping by exact, case-sensitive name
//! match and applies the user's edits on top of it.

use common::errors::{AppError, AppResult};
use common::models::mapping::ColumnMapping;
use common::models::transfer::{MappingOverride, MappingProposal, MappingRow};

/// Maps every source column whose name also exists in the destination to itself.
///
/// Follows source column order; non-matching columns are left unmapped.
pub fn default_mapping(
    source_columns: &[String],
    destination_columns: &[String],
) -> AppResult<ColumnMapping> {
    ColumnMapping::from_pairs(
        source_columns
            .iter()
            .filter(|column| destination_columns.contains(column))
            .map(|column| (column.clone(), column.clone())),
    )
}

/// Applies overrides in order.
///
/// A `null` or empty destination unmaps the source column. Names that do not
/// exist on their side are rejected.
pub fn apply_overrides(
    mapping: &mut ColumnMapping,
    overrides: &[MappingOverride],
    source_columns: &[String],
    destination_columns: &[String],
) -> AppResult<()> {
    for item in overrides {
        if !source_columns.contains(&item.source) {
            return Err(AppError::Validation(format!(
                "unknown source column {:?}",
                item.source
            )));
        }
        match item.destination.as_deref().filter(|d| !d.is_empty()) {
            None => {
                mapping.unset(&item.source);
            }
            Some(destination) => {
                if !destination_columns.iter().any(|c| c == destination) {
                    return Err(AppError::Validation(format!(
                        "unknown destination column {:?}",
                        destination
                    )));
                }
                mapping.set(item.source.clone(), destination)?;
            }
        }
    }
    Ok(())
}

/// Builds the editable grid: one row per source column, the destination choices
/// (`""` first) and the resolved mapping.
///
/// Mapped columns keep their place in source order regardless of the order
/// overrides were applied in.
pub fn build_proposal(
    source_columns: &[String],
    destination_columns: &[String],
    overrides: &[MappingOverride],
) -> AppResult<MappingProposal> {
    let mut edited = default_mapping(source_columns, destination_columns)?;
    apply_overrides(&mut edited, overrides, source_columns, destination_columns)?;

    let rows: Vec<MappingRow> = source_columns
        .iter()
        .map(|source| MappingRow {
            source: source.clone(),
            destination: edited.get(source).map(String::from),
        })
        .collect();

    let mapping = ColumnMapping::from_pairs(
        rows.iter()
            .filter_map(|row| row.destination.as_ref().map(|d| (row.source.clone(), d.clone()))),
    )?;

    let destination_options = std::iter::once(String::new())
        .chain(destination_columns.iter().cloned())
        .collect();

    Ok(MappingProposal {
        rows,
        destination_options,
        mapping,
    })
}
