use serde_json::json;
use tracing::{error, info, warn};

use crate::core::error::AppError;
use crate::features::jobs::context::JobContext;
use crate::features::jobs::tasks::{
    BillTexts, CommitteeEvidence, CorpusForCommittees, CorpusForDebates, CorpusForOldDebates,
    Hansards, HansardsLoad, HansardsParse, Job, Mps, PruneActivities, Votes,
};

pub fn registry() -> Vec<Box<dyn Job>> {
    vec![
        Box::new(Mps),
        Box::new(Votes),
        Box::new(BillTexts),
        Box::new(PruneActivities),
        Box::new(CommitteeEvidence),
        Box::new(HansardsLoad),
        Box::new(HansardsParse),
        Box::new(Hansards),
        Box::new(CorpusForDebates),
        Box::new(CorpusForCommittees),
        Box::new(CorpusForOldDebates),
    ]
}

pub fn job_names() -> Vec<&'static str> {
    registry().iter().map(|job| job.name()).collect()
}

pub fn find_job(name: &str) -> Result<Box<dyn Job>, AppError> {
    registry()
        .into_iter()
        .find(|job| job.name() == name)
        .ok_or_else(|| {
            AppError::bad_request(format!(
                "unknown job {name:?}; available: {}",
                job_names().join(", ")
            ))
        })
}

/// Runs a job by name. Failures are logged and reported to the admin webhook
/// before being returned.
pub async fn run_job(ctx: &JobContext, name: &str) -> Result<(), AppError> {
    let job = find_job(name)?;
    info!(job = name, "starting job");
    match job.run(ctx).await {
        Ok(()) => {
            info!(job = name, "job finished");
            Ok(())
        }
        Err(err) => {
            error!(job = name, %err, "job failed");
            notify_admins(ctx, name, &err).await;
            Err(err)
        }
    }
}

async fn notify_admins(ctx: &JobContext, name: &str, err: &AppError) {
    let Some(url) = ctx.config.admin_notify_url.as_deref() else {
        return;
    };
    let payload = json!({
        "subject": format!("Exception in job {name}"),
        "body": err.to_string(),
    });
    match ctx.source.http().post(url).json(&payload).send().await {
        Ok(resp) if resp.status().is_success() => {}
        Ok(resp) => warn!(status = %resp.status(), "admin notification rejected"),
        Err(notify_err) => warn!(%notify_err, "failed to notify admins"),
    }
}
