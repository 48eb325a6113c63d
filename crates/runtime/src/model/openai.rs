//! OpenAI realtime provider.

use conversation::{Content, Role, Turn};
use realtime::{
    ClientConfig, ClientEvent, Connection, ContentPart, ConversationItem, EventSender,
    InputAudioTranscription, ServerEvent, SessionConfig, ToolDef,
};
use tokio::sync::mpsc;

use super::errors::ModelError;
use super::provider::{ModelLink, ModelProvider};
use super::types::{AgentConfig, ModelCommand, ProviderEvent, SessionBinding};
use crate::tools::ToolCall;

const LINK_CAPACITY: usize = 64;

/// [`ModelProvider`] backed by the OpenAI realtime API.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: ClientConfig,
    voice: Option<String>,
    modalities: Vec<String>,
    transcription_model: Option<String>,
}

impl OpenAiProvider {
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            voice: None,
            modalities: vec!["text".to_string()],
            transcription_model: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_modalities(mut self, modalities: Vec<String>) -> Self {
        self.modalities = modalities;
        self
    }

    /// Transcribe participant audio with `model` so it shows up as user turns.
    pub fn with_transcription(mut self, model: impl Into<String>) -> Self {
        self.transcription_model = Some(model.into());
        self
    }

    fn session_config(&self, config: &AgentConfig) -> SessionConfig {
        let tools = config
            .tools
            .iter()
            .map(|spec| ToolDef::function(&spec.name, &spec.description, spec.parameters.clone()))
            .collect();

        SessionConfig {
            modalities: Some(self.modalities.clone()),
            instructions: Some(config.instructions.clone()),
            voice: self.voice.clone(),
            input_audio_transcription: self
                .transcription_model
                .clone()
                .map(|model| InputAudioTranscription { model }),
            tools: Some(tools),
            tool_choice: Some("auto".to_string()),
        }
    }
}

impl ModelProvider for OpenAiProvider {
    async fn connect(
        &self,
        config: &AgentConfig,
        binding: &SessionBinding,
    ) -> Result<ModelLink, ModelError> {
        let connection = Connection::open(&self.client, self.session_config(config))
            .await
            .map_err(|e| match e {
                realtime::Error::Timeout => ModelError::HandshakeTimeout(self.client.handshake_timeout),
                other => ModelError::Connect(other.to_string()),
            })?;

        tracing::info!(
            room = %binding.room,
            participant = %binding.participant.identity,
            realtime_session = %connection.session_id(),
            "connected to realtime model"
        );

        let (sender, server_events) = connection.into_parts();
        let (commands_tx, commands_rx) = mpsc::channel(LINK_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(LINK_CAPACITY);
        tokio::spawn(forward_commands(commands_rx, sender));
        tokio::spawn(translate_events(server_events, events_tx));

        Ok(ModelLink {
            commands: commands_tx,
            events: events_rx,
        })
    }
}

async fn forward_commands(mut commands: mpsc::Receiver<ModelCommand>, sender: EventSender) {
    while let Some(command) = commands.recv().await {
        let Some(event) = client_event(command) else {
            break;
        };
        if let Err(e) = sender.send(event).await {
            tracing::warn!(error = %e, "failed to forward command to realtime model");
            return;
        }
    }
    let _ = sender.close().await;
}

async fn translate_events(
    mut server: mpsc::Receiver<ServerEvent>,
    events: mpsc::Sender<ProviderEvent>,
) {
    while let Some(event) = server.recv().await {
        let Some(event) = translate(event) else {
            continue;
        };
        if events.send(event).await.is_err() {
            return;
        }
    }
}

/// Client event for a session command. `None` means close.
fn client_event(command: ModelCommand) -> Option<ClientEvent> {
    let event = match command {
        ModelCommand::CreateTurn(turn) => ClientEvent::create_item(item_for_turn(&turn)),
        ModelCommand::SubmitToolResult(result) => ClientEvent::create_item(
            ConversationItem::function_call_output(result.call_id.clone(), result.outcome.render()),
        ),
        ModelCommand::RequestResponse => ClientEvent::create_response(),
        ModelCommand::Close => return None,
    };
    Some(event)
}

fn item_for_turn(turn: &Turn) -> ConversationItem {
    let text = turn.text();
    match turn.role {
        Role::Assistant => ConversationItem::message("assistant", ContentPart::text(text)),
        Role::User => ConversationItem::message("user", ContentPart::input_text(text)),
        Role::Tool => {
            ConversationItem::function_call_output(turn.call_id.clone().unwrap_or_default(), text)
        }
    }
}

/// Map a server event to what the session cares about.
fn translate(event: ServerEvent) -> Option<ProviderEvent> {
    match event {
        ServerEvent::OutputItemDone { item, .. } => match item.item_type.as_str() {
            "function_call" => Some(ProviderEvent::ToolCall(ToolCall {
                call_id: item.call_id?,
                name: item.name?,
                arguments: item.arguments.unwrap_or_default(),
            })),
            "message" => message_turn(item),
            _ => None,
        },
        // Items this worker created come back completed; model output is
        // still in progress here and arrives later as output_item.done.
        ServerEvent::ConversationItemCreated { item, .. } if item.is_completed() => {
            match item.item_type.as_str() {
                "message" => message_turn(item),
                "function_call_output" => {
                    let turn = Turn::tool(item.call_id?, Content::text(item.output.unwrap_or_default()));
                    Some(ProviderEvent::Turn(match item.id {
                        Some(id) => turn.with_item_id(id),
                        None => turn,
                    }))
                }
                _ => None,
            }
        }
        ServerEvent::TranscriptionCompleted {
            item_id, transcript, ..
        } => Some(ProviderEvent::Turn(
            Turn::user(transcript.trim()).with_item_id(item_id),
        )),
        ServerEvent::Error { error } => Some(ProviderEvent::Error(error.to_string())),
        _ => None,
    }
}

fn message_turn(item: ConversationItem) -> Option<ProviderEvent> {
    let role = match item.role.as_deref()? {
        "assistant" => Role::Assistant,
        "user" => Role::User,
        _ => return None,
    };
    let text = item.text()?;
    let turn = Turn::new(role, Content::text(text));
    Some(ProviderEvent::Turn(match item.id {
        Some(id) => turn.with_item_id(id),
        None => turn,
    }))
}
