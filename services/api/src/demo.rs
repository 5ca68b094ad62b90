use crate::infra::InMemoryApplicationRepository;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use citizenship_intake::error::AppError;
use citizenship_intake::intake::{
    ApplicationRecord, ChecklistCatalog, ChecklistService, ChecklistSummary, DocumentStatus,
};
use citizenship_intake::upload::{MemoryBlobStore, UploadRelay};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Emit the catalog as CSV instead of a grouped listing
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Client name for the sample application
    #[arg(long, default_value = "Amina Yusuf")]
    pub(crate) client_name: String,
    /// Client email for the sample application
    #[arg(long, default_value = "amina.yusuf@example.com")]
    pub(crate) client_email: String,
    /// Print the final checklist as CSV
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Debug, Serialize)]
struct CatalogCsvRow<'a> {
    category: &'a str,
    document_id: &'a str,
    label: &'a str,
    required: bool,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = ChecklistCatalog::standard();
    let stdout = io::stdout();

    if args.csv {
        write_catalog_csv(&catalog, stdout.lock())?;
        return Ok(());
    }

    let mut out = stdout.lock();
    for category in catalog.categories() {
        writeln!(out, "{}", category.name)?;
        for document in &category.documents {
            let marker = if document.required { "*" } else { " " };
            writeln!(out, "  {marker} {:<22} {}", document.id, document.label)?;
        }
    }
    writeln!(
        out,
        "\n{} documents, {} required (*)",
        catalog.total_documents(),
        catalog.required_ids().count()
    )?;
    Ok(())
}

fn write_catalog_csv<W: Write>(catalog: &ChecklistCatalog, writer: W) -> Result<(), AppError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in catalog.documents() {
        csv_writer.serialize(CatalogCsvRow {
            category: entry.category,
            document_id: entry.definition.id,
            label: entry.definition.label,
            required: entry.definition.required,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        client_name,
        client_email,
        csv,
    } = args;

    let store = Arc::new(MemoryBlobStore::default());
    let service = ChecklistService::new(
        ChecklistCatalog::standard(),
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(UploadRelay::new(store.clone())),
    );

    println!("Citizenship intake demo");
    let record = service.create_application(&client_name, &client_email)?;
    println!(
        "Created {} for {} <{}> with {} checklist items",
        record.id,
        record.client_name,
        record.client_email,
        record.documents.len()
    );

    let uploads = [
        ("passport_bio", "passport scan.pdf"),
        ("birth_cert", "birth-certificate.jpg"),
        ("pps_card", "pps.png"),
        ("bank_statement", "statement 2023.pdf"),
    ];
    for (document_id, file_name) in uploads {
        let content = BASE64.encode(format!("sample contents of {file_name}"));
        let updated = service
            .upload_document(&record.id, document_id, file_name, content)
            .await?;
        if let Some(url) = updated
            .document(document_id)
            .and_then(|document| document.file.as_ref())
            .and_then(|file| file.storage_url.as_deref())
        {
            println!("- uploaded {document_id} -> {url}");
        }
    }

    service.set_document_status(&record.id, "passport_bio", DocumentStatus::Approved, "")?;
    service.set_document_status(&record.id, "birth_cert", DocumentStatus::Approved, "")?;
    service.set_document_status(
        &record.id,
        "pps_card",
        DocumentStatus::Rejected,
        "card photo is cropped, please rescan",
    )?;

    let record = service.get(&record.id)?;
    render_checklist(&service, &record);

    let summary = service.summary(&record.id)?;
    render_summary(&summary);
    println!("Blobs stored in memory: {}", store.paths().len());

    if csv {
        println!();
        service.report(&record.id)?.write_csv(io::stdout().lock())?;
    }

    Ok(())
}

fn render_checklist(
    service: &ChecklistService<InMemoryApplicationRepository, MemoryBlobStore>,
    record: &ApplicationRecord,
) {
    println!("\nChecklist");
    let mut current_category = "";
    for entry in service.catalog().documents() {
        let Some(state) = record.document(entry.definition.id) else {
            continue;
        };
        if entry.category != current_category {
            current_category = entry.category;
            println!("{current_category}");
        }
        let style = state.status.style();
        print!("  [{:<8}] {:<22}", style.icon, entry.definition.id);
        if !state.review_notes.is_empty() {
            print!(" note: {}", state.review_notes);
        }
        println!();
    }
}

fn render_summary(summary: &ChecklistSummary) {
    println!(
        "\nProgress {}% | {} approved, {} in review, {} rejected, {} pending",
        summary.progress, summary.approved, summary.review, summary.rejected, summary.pending
    );
    println!(
        "Required documents approved: {}/{}",
        summary.required_approved, summary.required_total
    );
    if summary.ready_to_file() {
        println!("Ready to file");
    } else {
        println!(
            "Outstanding required: {}",
            summary.outstanding_required.join(", ")
        );
    }
}
