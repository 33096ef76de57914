use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use crate::file_writer::{AssetWriter, WriteSummary};

/// A download from one avatar service: turn the identifier a user gave into
/// a reference the service understands, then fetch every requested asset for
/// it into the writer.
#[async_trait]
pub trait AvatarPipeline {
    type Reference: fmt::Display + Send + Sync;

    async fn resolve(&self) -> Result<Self::Reference>;

    async fn fetch(&self, reference: &Self::Reference, writer: &mut AssetWriter) -> Result<()>;
}

/// Runs a pipeline from start to finish. The first failure stops the run;
/// files written before it stay on disk.
pub async fn run<P>(pipeline: &P, writer: &mut AssetWriter) -> Result<WriteSummary>
where
    P: AvatarPipeline + Sync,
{
    let reference = pipeline.resolve().await?;
    info!("Resolved {}", reference);

    pipeline.fetch(&reference, writer).await?;

    let summary = writer.summary();
    info!("Saved to {}: {}", writer.root().display(), summary);

    Ok(summary)
}
