//! Command-line client for a node's HTTP API.

use chrono::DateTime;
use mural::Message;
use mural_http::dto::{
    LoginRequest, LoginResponse, MessagesResponse, PostMessageRequest, PostMessageResponse,
};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not reach node at {node}: {source}")]
    Unreachable {
        node: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("node answered {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("unexpected response from node: {0}")]
    BadResponse(#[from] reqwest::Error),

    #[error("log in before posting")]
    NotLoggedIn,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// One node's client API. Holds the session token once logged in.
pub struct BoardClient {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
}

impl BoardClient {
    /// `node` is `host:port`, with or without an `http://` prefix.
    pub fn new(node: &str, token: Option<String>) -> Result<Self> {
        let base_url = if node.starts_with("http://") || node.starts_with("https://") {
            node.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", node.trim_end_matches('/'))
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url,
            http,
            token,
        })
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .send(self.http.post(self.url("/login")).json(&request))
            .await?;
        let body: LoginResponse = response.json().await?;
        self.token = Some(body.token.clone());
        Ok(body.token)
    }

    pub async fn post(&self, content: &str) -> Result<Message> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        let request = PostMessageRequest {
            content: Some(content.to_string()),
        };
        let response = self
            .send(
                self.http
                    .post(self.url("/messages"))
                    .bearer_auth(token)
                    .json(&request),
            )
            .await?;
        let body: PostMessageResponse = response.json().await?;
        Ok(body.message)
    }

    pub async fn read(&self) -> Result<Vec<Message>> {
        let response = self.send(self.http.get(self.url("/messages"))).await?;
        let body: MessagesResponse = response.json().await?;
        Ok(body.messages)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|source| {
            if source.is_connect() || source.is_timeout() {
                ClientError::Unreachable {
                    node: self.base_url.clone(),
                    source,
                }
            } else {
                ClientError::BadResponse(source)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // Error bodies are `{error, message, request_id}`; fall back to the raw text
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        Err(ClientError::Rejected { status, message })
    }
}

/// `[YYYY-mm-dd HH:MM:SS] author: content`, one message per line.
pub fn format_message(message: &Message) -> String {
    let when = DateTime::parse_from_rfc3339(&message.timestamp)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| message.timestamp.clone());
    format!("[{}] {}: {}", when, message.author, message.content)
}

pub fn format_board(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "--- board is empty ---\n".to_string();
    }
    let mut out = String::from("--- board ---\n");
    for message in messages {
        out.push_str(&format_message(message));
        out.push('\n');
    }
    out.push_str("-------------\n");
    out
}

const SHELL_HELP: &str = "\
Commands:
  read                   show every message on the board
  post <message>         post a message (login first)
  login <user> <pass>    start a session
  help                   show this help
  quit                   leave the client";

/// Interactive session over stdin. Command failures are printed and the
/// prompt continues.
pub async fn run_shell(mut client: BoardClient) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(format!("Connected to {}. Type 'help' for commands.\n", client.base_url).as_bytes())
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let output = match command.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => format!("{}\n", SHELL_HELP),
            "read" => match client.read().await {
                Ok(messages) => format_board(&messages),
                Err(e) => format!("Read failed: {}\n", e),
            },
            "post" if rest.is_empty() => "Usage: post <message>\n".to_string(),
            "post" => match client.post(rest).await {
                Ok(_) => "Message posted.\n".to_string(),
                Err(e) => format!("Post failed: {}\n", e),
            },
            "login" => match rest.split_once(' ') {
                Some((user, pass)) if !pass.trim().is_empty() => {
                    match client.login(user, pass.trim()).await {
                        Ok(_) => format!("Logged in as {}.\n", user),
                        Err(e) => format!("Login failed: {}\n", e),
                    }
                }
                _ => "Usage: login <user> <pass>\n".to_string(),
            },
            _ => "Unknown command. Type 'help' for the list.\n".to_string(),
        };
        stdout.write_all(output.as_bytes()).await?;
    }
    stdout.flush().await?;
    Ok(())
}
