//! HTTP client implementation using reqwest

use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};
use crate::http::error::{describe_error_body, map_http_error};
use crate::http::{Endpoint, LoadingFlag, RequestOptions};
use crate::protocol::{ChatRequestBody, UploadedFile};
use crate::speech::{clean_text_for_tts, SpeechError, TtsRequest};
use crate::stream::{self, AssembledMessage, StreamSink};
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default user agent
const USER_AGENT: &str = concat!("indychat/", env!("CARGO_PKG_VERSION"));

const EVENT_STREAM: &str = "text/event-stream";

/// Client for the IndyChat proxy, sharing one connection pool
#[derive(Clone)]
pub struct ChatClient {
    client: Arc<Client>,
    config: Arc<ChatConfig>,
}

impl ChatClient {
    /// Create a client from configuration
    pub fn new(config: ChatConfig) -> ChatResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(config.connection.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(config.connection.connect_timeout())
            .timeout(config.connection.request_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ChatError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn url(&self, endpoint: Endpoint) -> String {
        let proxy = &self.config.proxy;
        let path = match endpoint {
            Endpoint::Chat => &proxy.chat_path,
            Endpoint::Upload => &proxy.upload_path,
            Endpoint::Tts => &proxy.tts_path,
        };
        proxy.url(path)
    }

    fn post(&self, options: &RequestOptions) -> RequestBuilder {
        let mut builder = self
            .client
            .post(self.url(options.endpoint))
            .header("X-Request-ID", options.request_id.to_string());
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Send a chat query and stream the answer into `sink`.
    ///
    /// `loading` is set for the whole call and cleared on every exit path.
    /// Fragments delivered before a failure are not retracted.
    pub async fn send_message<S: StreamSink>(
        &self,
        request: ChatRequestBody,
        sink: S,
        loading: &LoadingFlag,
    ) -> ChatResult<AssembledMessage> {
        let _guard = loading.acquire();
        self.stream_chat(request, sink, RequestOptions::new(Endpoint::Chat))
            .await
    }

    async fn stream_chat<S: StreamSink>(
        &self,
        request: ChatRequestBody,
        sink: S,
        options: RequestOptions,
    ) -> ChatResult<AssembledMessage> {
        let request_id = options.request_id;
        info!(
            "Sending chat query ({} attachments, continuing: {}) [request_id: {}]",
            request.files.len(),
            request.conversation_id.is_some(),
            request_id
        );

        let response = self
            .post(&options)
            .header(ACCEPT, EVENT_STREAM)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat request failed [request_id: {}]: {}", request_id, e);
                ChatError::from(e)
            })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let body = response.text().await.ok();
            warn!(
                "Chat proxy returned status {} [request_id: {}]",
                status, request_id
            );
            return Err(map_http_error(status, body, request_id));
        }

        Self::check_event_stream(&response, request_id);

        match stream::drive(response.bytes_stream(), sink).await {
            Ok(message) => {
                info!(
                    "Chat stream completed ({} fragments) [request_id: {}]",
                    message.fragments, request_id
                );
                Ok(message)
            }
            Err(e) => {
                error!("Chat stream aborted [request_id: {}]: {}", request_id, e);
                Err(e)
            }
        }
    }

    /// Warn when the proxy does not label its answer as an event stream
    fn check_event_stream(response: &Response, request_id: uuid::Uuid) {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with(EVENT_STREAM) {
            warn!(
                "Expected {}, got '{}'; parsing anyway [request_id: {}]",
                EVENT_STREAM, content_type, request_id
            );
        }
    }

    /// Store an attachment through the upload endpoint
    pub async fn upload_file(
        &self,
        user: &str,
        file_name: &str,
        mime_type: &str,
        contents: Vec<u8>,
    ) -> ChatResult<UploadedFile> {
        let options = RequestOptions::new(Endpoint::Upload)
            .with_timeout(self.config.connection.upload_timeout());
        let request_id = options.request_id;
        let max = self.config.connection.max_upload_bytes;

        if contents.len() as u64 > max {
            return Err(ChatError::Upload {
                message: format!("File size exceeds {}MB limit", max / (1024 * 1024)),
            });
        }
        if user.is_empty() {
            return Err(ChatError::Upload {
                message: "User ID is required".to_string(),
            });
        }

        info!(
            "Uploading '{}' ({} bytes) [request_id: {}]",
            file_name,
            contents.len(),
            request_id
        );

        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| ChatError::Upload {
                message: format!("Invalid MIME type '{}': {}", mime_type, e),
            })?;
        let form = Form::new().part("file", part).text("user", user.to_string());

        let response = self.post(&options).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.ok();
            warn!("Upload failed with status {} [request_id: {}]", status, request_id);
            return Err(ChatError::Upload {
                message: describe_error_body(status, body.as_deref()),
            });
        }

        let body = response.text().await?;
        let mut uploaded: UploadedFile = serde_json::from_str(&body)?;
        if uploaded.name.is_empty() {
            uploaded.name = file_name.to_string();
        }
        if uploaded.mime_type.is_empty() {
            uploaded.mime_type = mime_type.to_string();
        }
        debug!("Stored attachment {} [request_id: {}]", uploaded.id, request_id);
        Ok(uploaded)
    }

    /// Synthesize speech for an answer.
    ///
    /// Returns `Ok(None)` without calling the endpoint when speech is disabled
    /// or the cleaned text is too short to be worth reading.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<Option<Bytes>, SpeechError> {
        let speech = &self.config.speech;
        if !speech.enabled {
            return Ok(None);
        }

        let cleaned = clean_text_for_tts(text);
        if cleaned.chars().count() < speech.min_text_chars {
            debug!("Skipping speech synthesis for short text");
            return Ok(None);
        }

        let options = RequestOptions::new(Endpoint::Tts)
            .with_timeout(self.config.connection.speech_timeout());
        let body = TtsRequest {
            text: cleaned,
            voice_id: voice_id.unwrap_or(speech.default_voice_id.as_str()).to_string(),
        };

        let mut builder = self.post(&options).json(&body);
        if let Some(token) = &self.config.proxy.auth_token {
            debug!(
                "Authorizing speech request with token {} [request_id: {}]",
                token.partial_redact(),
                options.request_id
            );
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(
                "Speech synthesis failed with status {} [request_id: {}]",
                status, options.request_id
            );
            return Err(SpeechError::from_status(status.as_u16()));
        }

        Ok(Some(response.bytes().await?))
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.config.proxy.base_url)
            .finish()
    }
}
