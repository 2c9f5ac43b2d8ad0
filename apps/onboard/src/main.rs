use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use onboarding_core::{
    AuthProvider, KycHttpClient, OnboardingWizard, StatusService, Step, WizardError,
};
use tracing_subscriber::EnvFilter;

mod inputs;

use inputs::{group_by_slot, load_draft, parse_doc_arg, read_document, DocArg};

#[derive(Parser, Debug)]
#[command(name = "onboard", about = "Walk through KYC onboarding from the terminal")]
struct Cli {
    #[arg(long, env = "ONBOARD_SERVER_URL", default_value = "http://127.0.0.1:8787")]
    server_url: String,
    #[arg(long, env = "ONBOARD_USERNAME")]
    username: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current verification status.
    Status,
    /// Validate a draft with its documents and submit it.
    Submit {
        /// TOML file with `personal`, `address` and `accredited_investor` tables.
        #[arg(long)]
        draft: PathBuf,
        /// Document to upload, as KIND=PATH. Repeat for several files.
        #[arg(long = "doc", value_parser = parse_doc_arg)]
        docs: Vec<DocArg>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let client = Arc::new(KycHttpClient::new(&cli.server_url)?);
    client
        .login(&cli.username)
        .await
        .with_context(|| format!("login as '{}' failed", cli.username))?;

    match cli.command {
        Command::Status => {
            let status = client.verification_status().await?;
            println!("verification status: {status}");
        }
        Command::Submit { draft, docs } => submit(client, &draft, &docs).await?,
    }
    Ok(())
}

async fn submit(client: Arc<KycHttpClient>, draft_path: &Path, docs: &[DocArg]) -> Result<()> {
    let mut wizard = match OnboardingWizard::start(Arc::clone(&client), client.as_ref()).await {
        Ok(wizard) => wizard,
        Err(WizardError::AlreadyInProgress(status)) => {
            println!("nothing to do: verification is already {status}");
            return Ok(());
        }
        Err(error) => return Err(error.into()),
    };
    wizard.load_draft(load_draft(draft_path).await?);

    for (slot, paths) in group_by_slot(docs) {
        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            files.push(read_document(path).await?);
        }
        let report = wizard.intake(slot, files).await?;
        println!("{slot}: {} accepted", report.accepted.len());
        for rejection in &report.rejected {
            println!("  rejected: {rejection}");
        }
    }

    while wizard.step() != Step::Review {
        let step = wizard.step();
        if let Err(errors) = wizard.next() {
            println!("{} has problems:", step.title());
            for (field, message) in &errors {
                println!("  {field}: {message}");
            }
            bail!("fix the draft and try again");
        }
    }

    let receipt = wizard.submit().await?;
    println!(
        "{} (id {}, {} documents, status {})",
        receipt.message,
        receipt.submission.id,
        receipt.submission.documents_uploaded,
        receipt.submission.status
    );
    Ok(())
}
