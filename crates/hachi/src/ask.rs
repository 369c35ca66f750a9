// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hachi ask` implementation: one utterance in, one JSON response out.

use hachi_config::HachiConfig;
use hachi_core::{CompanionRequest, GameContext, HachiError, RequestType};
use hachi_router::RequestHandler;

/// Player identity used for requests issued from the command line.
const CLI_PLAYER: &str = "cli";

/// Arguments of the `ask` subcommand.
#[derive(Debug, Clone)]
pub struct AskOptions {
    pub text: String,
    pub request_type: RequestType,
    pub location: Option<String>,
    pub session: String,
}

impl AskOptions {
    fn into_request(self) -> CompanionRequest {
        let game_context = GameContext {
            player_location: self.location.unwrap_or_default(),
            ..GameContext::default()
        };
        CompanionRequest::new(self.text, self.request_type)
            .with_player(CLI_PLAYER, self.session)
            .with_game_context(game_context)
    }
}

/// Route the utterance and print the formatted response to stdout.
pub async fn run_ask(config: HachiConfig, options: AskOptions) -> Result<(), HachiError> {
    crate::init_tracing(&config.companion.log_level);

    let handler = RequestHandler::from_config(&config).await?;
    let response = handler.handle(options.into_request()).await?;

    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| HachiError::Internal(format!("failed to serialize response: {e}")))?;
    println!("{json}");
    Ok(())
}
