use std::process::ExitCode;

use anyhow::Context;
use docs_assistant::state::AppState;

pub async fn search(state: &AppState, query: &str, top_k: Option<usize>) -> anyhow::Result<ExitCode> {
    let assistant = &state.assistant;
    assistant
        .refresh(&state.source, false)
        .await
        .context("failed to prepare the documentation index")?;

    let top_k = top_k.unwrap_or(assistant.top_k());
    let results = assistant.search(query, top_k).await?;

    if results.is_empty() {
        println!("No matching passages.");
        return Ok(ExitCode::SUCCESS);
    }

    for (rank, r) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} #{}\n   {}\n",
            rank + 1,
            r.score,
            r.chunk.source_path,
            r.chunk.ordinal,
            r.chunk.source_url
        );
        for line in r.chunk.text.lines().take(6) {
            println!("   | {}", line);
        }
        println!();
    }
    Ok(ExitCode::SUCCESS)
}
