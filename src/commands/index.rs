use std::process::ExitCode;

use anyhow::Context;
use docs_assistant::state::AppState;

pub async fn index(state: &AppState, force: bool) -> anyhow::Result<ExitCode> {
    let report = state
        .assistant
        .refresh(&state.source, force)
        .await
        .context("failed to build the documentation index")?;

    let origin = if report.from_cache { "restored from cache" } else { "built" };
    println!(
        "Index {} with {} chunks (model {}, cache {})",
        origin,
        report.chunks,
        state.assistant.index().model_id(),
        state.settings.index.cache_path.display()
    );
    Ok(ExitCode::SUCCESS)
}
