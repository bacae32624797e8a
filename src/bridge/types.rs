use serde::{Deserialize, Serialize};

/// Slash-command payload as POSTed by Slack (form-encoded). Keys not named
/// here (`response_url`, `trigger_id`, `api_app_id`, ...) are ignored.
///
/// `text` stays optional at decode time so an invalid token is reported as
/// such even when the rest of the form is incomplete.
#[derive(Debug, Deserialize, Clone)]
pub struct SlackCommand {
    pub token: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlackResponse {
    pub response_type: String,
    pub text: String,
}

impl SlackResponse {
    pub fn in_channel(text: String) -> Self {
        Self {
            response_type: "in_channel".to_string(),
            text,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionChoice {
    pub text: String,
}

impl CompletionResponse {
    /// Text of the first choice, if the service returned any.
    pub fn first_text(self) -> Option<String> {
        self.choices.into_iter().next().map(|choice| choice.text)
    }
}
