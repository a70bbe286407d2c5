use crate::cli::ResumeArgs;
use crate::commands::shared::{
    describe_result, load_data, resolve_settings, write_outputs, CheckpointWriter,
};
use crate::mixture::checkpoint::load_checkpoint;
use crate::mixture::resume;
use anyhow::Result;
use std::time::Instant;
use tracing::info;

pub fn run(args: ResumeArgs) -> Result<()> {
    let counts = load_data(&args.data.data, args.data.delimiter)?;
    let (settings, seed) = resolve_settings(&args.settings)?;
    info!(path = %args.from.display(), "Loading checkpoint");
    let checkpoint = load_checkpoint(&args.from)?;
    info!(
        iteration = checkpoint.iteration(),
        topics = checkpoint.params().n_topics(),
        "Resuming EM"
    );

    let start = Instant::now();
    let mut checkpoints = CheckpointWriter::new(&args.output)?;
    let result = resume(&counts, checkpoint, &settings, seed, |report| {
        checkpoints.observe(report)
    })?;
    checkpoints.finish()?;
    info!("Resume complete in {:.2?}: {}", start.elapsed(), describe_result(&result));

    write_outputs(&counts, &result, &args.output, args.data.delimiter)
}
