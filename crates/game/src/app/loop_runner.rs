use std::process::ExitCode;

use tracing::error;
use village_engine::{run_app, VillageApp};

pub(crate) fn run(app: VillageApp) -> ExitCode {
    if let Err(err) = run_app(app) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
