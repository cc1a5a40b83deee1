use std::path::Path;

use anyhow::{bail, Context as _};
use partsbin_core::{FileType, SupplierCapability};
use partsbin_suppliers::{validate_adapter, validate_registry, SupplierDescription};
use serde::Serialize;

use crate::context::Context;

#[derive(Serialize)]
struct SupplierListing<'a> {
    enabled: bool,
    #[serde(flatten)]
    description: &'a SupplierDescription,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn run_suppliers(ctx: &Context) -> anyhow::Result<()> {
    let descriptions = ctx.registry.describe_all();
    let listings: Vec<SupplierListing<'_>> = descriptions
        .iter()
        .map(|description| SupplierListing {
            enabled: ctx.is_enabled(&description.info.name),
            description,
        })
        .collect();
    print_json(&listings)
}

pub(crate) async fn run_test(ctx: &Context, supplier: &str) -> anyhow::Result<()> {
    let supplier = ctx.supplier(supplier)?;
    let result = supplier.test_connection().await;
    print_json(&result)?;
    if !result.success {
        bail!("connection test failed for {}: {}", supplier.name(), result.message);
    }
    Ok(())
}

pub(crate) async fn run_search(
    ctx: &Context,
    supplier: &str,
    query: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let supplier = ctx.supplier(supplier)?;
    let results = supplier.search_parts(query, limit).await?;
    tracing::info!(supplier = supplier.name(), query, results = results.len(), "search finished");
    print_json(&results)
}

pub(crate) async fn run_details(ctx: &Context, supplier: &str, part: &str) -> anyhow::Result<()> {
    let supplier = ctx.supplier(supplier)?;
    match supplier.get_part_details(part).await? {
        Some(details) => print_json(&details),
        None => bail!("{} has no part '{part}'", supplier.name()),
    }
}

pub(crate) async fn run_enrich(
    ctx: &Context,
    supplier: &str,
    part: &str,
    requested: &[SupplierCapability],
) -> anyhow::Result<()> {
    let supplier = ctx.supplier(supplier)?;
    let capabilities = if requested.is_empty() {
        default_enrichment(supplier.capabilities().iter().copied())
    } else {
        requested.to_vec()
    };
    if capabilities.is_empty() {
        bail!("{} supports no enrichment capabilities", supplier.name());
    }

    let report = supplier
        .enrich(part, &capabilities, |progress| {
            tracing::info!(
                capability = %progress.capability,
                completed = progress.completed,
                total = progress.total,
                percent = progress.percent(),
                "enrichment progress"
            );
        })
        .await;
    print_json(&report)
}

/// Per-part lookups from `declared`, in declaration order.
pub(crate) fn default_enrichment(
    declared: impl IntoIterator<Item = SupplierCapability>,
) -> Vec<SupplierCapability> {
    declared.into_iter().filter(|c| c.is_enrichment()).collect()
}

pub(crate) fn run_import(
    ctx: &Context,
    supplier: &str,
    file: &Path,
    file_type: Option<FileType>,
) -> anyhow::Result<()> {
    let supplier = ctx.supplier(supplier)?;
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("not a file path: {}", file.display()))?;
    let Some(file_type) = file_type.or_else(|| FileType::from_filename(&filename)) else {
        bail!("cannot tell the file type of '{filename}'; pass --file-type");
    };
    let content =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

    if !supplier.can_import_file(&filename, Some(&content)) {
        tracing::warn!(
            supplier = supplier.name(),
            filename = %filename,
            "file does not look like this supplier's export"
        );
    }

    let result = supplier.import_order_file(&content, file_type, &filename)?;
    print_json(&result)?;
    if !result.success {
        bail!(
            "import failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

pub(crate) fn run_audit(ctx: &Context, supplier: Option<&str>) -> anyhow::Result<()> {
    let Some(name) = supplier else {
        return print_json(&validate_registry(&ctx.registry));
    };
    let adapter = ctx.registry.get(name)?;
    match validate_adapter(adapter.as_ref()) {
        Some(report) => print_json(&report),
        None => bail!("{name} does not import order files"),
    }
}
