use std::process::ExitCode;

use anyhow::Context;
use docs_assistant::answer::format_context;
use docs_assistant::state::AppState;
use docs_assistant::{Answer, Error};
use tracing::{error, info};

pub async fn ask(
    state: &AppState,
    question: &str,
    provider: Option<&str>,
    show_context: bool,
) -> anyhow::Result<ExitCode> {
    let assistant = &state.assistant;
    assistant
        .refresh(&state.source, false)
        .await
        .context("failed to prepare the documentation index")?;

    // Invalid questions are reported by `answer` below
    if show_context {
        if let Ok((_, results)) = assistant.retrieve(question).await {
            println!("{}\n\n=====\n", format_context(&results));
        }
    }

    info!(question, provider, "Question received");

    match assistant.answer(question, provider).await {
        Ok(answer) => {
            if let Answer::Grounded {
                provider,
                model,
                usage,
                ..
            } = &answer
            {
                info!(
                    provider = %provider,
                    model = %model,
                    input_tokens = ?usage.input_tokens,
                    output_tokens = ?usage.output_tokens,
                    "Answer complete"
                );
            }
            println!("{}", answer.display_text());
            Ok(ExitCode::SUCCESS)
        }
        Err(
            e @ (Error::AllProvidersFailed(_)
            | Error::Transport(_)
            | Error::Decode(_)
            | Error::InvalidQuestion(_)),
        ) => {
            error!("{}", e);
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
