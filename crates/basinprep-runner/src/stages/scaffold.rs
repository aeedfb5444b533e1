use super::{StageContext, StageOutcome};
use crate::Result;
use basinprep_tables::fsutil::ensure_dir;

pub(super) fn run(ctx: &StageContext<'_>) -> Result<StageOutcome> {
    let mut outcome = StageOutcome::default();
    for dir in ctx.config.scaffold_dirs() {
        if !ensure_dir(&dir)? {
            outcome.skipped_steps += 1;
        }
    }
    Ok(outcome)
}
