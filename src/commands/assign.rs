use crate::cli::AssignArgs;
use crate::commands::shared::load_data;
use crate::mixture::e_step;
use crate::mixture::report::{load_model, write_responsibilities};
use anyhow::Result;
use tracing::info;

pub fn run(args: AssignArgs) -> Result<()> {
    let counts = load_data(&args.data.data, args.data.delimiter)?;
    info!(path = %args.model.display(), "Loading model");
    let model = load_model(&args.model)?;
    model.check_vocabulary(&counts)?;

    let expectation = e_step(&counts, &model.params)?;
    info!(
        documents = counts.n_docs(),
        log_likelihood = expectation.log_likelihood,
        "Assigned documents"
    );
    println!("{:.6}", expectation.log_likelihood);

    info!(path = %args.output.display(), "Writing responsibilities");
    write_responsibilities(
        &args.output,
        &counts,
        &expectation.responsibilities,
        args.data.delimiter,
    )?;
    Ok(())
}
