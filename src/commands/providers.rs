use std::process::ExitCode;

use docs_assistant::state::AppState;

pub fn providers(state: &AppState) -> anyhow::Result<ExitCode> {
    let llm = state.assistant.llm();
    let settings = &state.settings;

    println!("Primary: {}", llm.primary());
    if settings.fallback_enabled {
        println!("Fallback order: {}", settings.fallback_order.join(" -> "));
    } else {
        println!("Fallback: disabled");
    }
    println!();

    for p in llm.providers() {
        let status = if p.enabled { "enabled" } else { "disabled" };
        println!("{:<10} {:<9} {} @ {}", p.name, status, p.model, p.endpoint);
    }

    if llm.available_providers().is_empty() {
        eprintln!("\nNo provider is enabled; set an API key or base URL.");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
