use async_trait::async_trait;
use tracing::{error, info};

use crate::core::clock::{ottawa_naive_now, ottawa_today};
use crate::core::error::AppError;
use crate::features::activity::prune;
use crate::features::bills::import_bill_texts;
use crate::features::hansards::{DocumentType, ImportOptions, fetch_latest_debates, import_document};
use crate::features::jobs::context::JobContext;
use crate::features::politicians::update_mps_from_ourcommons;
use crate::features::text_analysis::corpora::{
    generate_for_committees, generate_for_debates, generate_for_old_debates,
};
use crate::features::votes::import_votes;

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, ctx: &JobContext) -> Result<(), AppError>;
}

pub struct Mps;
pub struct Votes;
pub struct BillTexts;
pub struct PruneActivities;
pub struct CommitteeEvidence;
pub struct HansardsLoad;
pub struct HansardsParse;
pub struct Hansards;
pub struct CorpusForDebates;
pub struct CorpusForCommittees;
pub struct CorpusForOldDebates;

/// Imports every unparsed document of one type. One bad transcript does not
/// stop the rest.
async fn parse_pending(ctx: &JobContext, document_type: DocumentType) -> Result<usize, AppError> {
    let mut imported = 0;
    for document in ctx.store.unparsed_documents(document_type)? {
        let id = document.id;
        match import_document(&ctx.store, &ctx.config, document, ImportOptions::default()).await {
            Ok(_) => imported += 1,
            Err(err) => error!(document = id, %err, "failed to import document"),
        }
    }
    Ok(imported)
}

#[async_trait]
impl Job for Mps {
    fn name(&self) -> &'static str {
        "mps"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        let summary =
            update_mps_from_ourcommons(&ctx.store, &ctx.source, &ctx.config, ottawa_today()).await?;
        info!(
            created = summary.created,
            updated = summary.updated,
            retired = summary.retired,
            "updated MPs"
        );
        Ok(())
    }
}

#[async_trait]
impl Job for Votes {
    fn name(&self) -> &'static str {
        "votes"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        let summary = import_votes(&ctx.store, &ctx.source, &ctx.config).await?;
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "imported votes"
        );
        Ok(())
    }
}

#[async_trait]
impl Job for BillTexts {
    fn name(&self) -> &'static str {
        "bill_texts"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        let updated = import_bill_texts(&ctx.store, &ctx.source, &ctx.config).await?;
        info!(updated, "imported bill texts");
        Ok(())
    }
}

#[async_trait]
impl Job for PruneActivities {
    fn name(&self) -> &'static str {
        "prune_activities"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        let today = ottawa_today();
        let mut pruned = 0;
        for politician in ctx.store.politicians()? {
            if politician.is_current(today) {
                let activities = ctx.store.public_activities_for(politician.id)?;
                pruned += prune(&ctx.store, activities, today)?;
            }
        }
        info!(pruned, "pruned activities");
        Ok(())
    }
}

#[async_trait]
impl Job for CommitteeEvidence {
    fn name(&self) -> &'static str {
        "committee_evidence"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        let imported = parse_pending(ctx, DocumentType::Evidence).await?;
        info!(imported, "parsed committee evidence");
        Ok(())
    }
}

#[async_trait]
impl Job for HansardsLoad {
    fn name(&self) -> &'static str {
        "hansards_load"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        let session = ctx.store.current_session()?;
        let fetched = fetch_latest_debates(&ctx.store, &ctx.source, &ctx.config, &session).await?;
        info!(fetched, session = %session.id, "loaded debates");
        Ok(())
    }
}

#[async_trait]
impl Job for HansardsParse {
    fn name(&self) -> &'static str {
        "hansards_parse"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        let imported = parse_pending(ctx, DocumentType::Debate).await?;
        info!(imported, "parsed debates");
        Ok(())
    }
}

#[async_trait]
impl Job for Hansards {
    fn name(&self) -> &'static str {
        "hansards"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        HansardsLoad.run(ctx).await?;
        HansardsParse.run(ctx).await
    }
}

#[async_trait]
impl Job for CorpusForDebates {
    fn name(&self) -> &'static str {
        "corpus_for_debates"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        generate_for_debates(
            &ctx.store,
            &ctx.config.language_model_path,
            ottawa_naive_now(),
        )
        .await
    }
}

#[async_trait]
impl Job for CorpusForCommittees {
    fn name(&self) -> &'static str {
        "corpus_for_committees"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        generate_for_committees(&ctx.store, &ctx.config.language_model_path, ottawa_today()).await
    }
}

#[async_trait]
impl Job for CorpusForOldDebates {
    fn name(&self) -> &'static str {
        "corpus_for_old_debates"
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), AppError> {
        generate_for_old_debates(&ctx.store, &ctx.config.language_model_path, ottawa_today()).await
    }
}
