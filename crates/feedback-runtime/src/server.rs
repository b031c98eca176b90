//! Line-delimited JSON-RPC tool server.
//!
//! Each request is handled on its own task so a `ping` is still answered
//! while a human is busy with an earlier `tools/call`. Feedback requests
//! themselves take turns, since they share one human and one terminal.
//! Responses are written by a single writer task, one JSON document per
//! line.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use feedback_core::FeedbackRequest;

use crate::handler::FeedbackHandler;
use crate::protocol::{
    error_codes, tool_descriptor, tool_failure, tool_success, IncomingMessage, OutgoingResponse,
    RpcError, ToolCallParams, DEFAULT_PROTOCOL_VERSION, JSONRPC_VERSION, TOOL_NAME,
};
use crate::ServerError;

/// Identity reported in the `initialize` response.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "interactive-feedback".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Serves the `interactive_feedback` tool over a line-delimited stream.
///
/// Protocol requests are answered concurrently, but feedback requests are
/// served one at a time.
pub struct ToolServer<H> {
    handler: Arc<H>,
    info: ServerInfo,
    feedback_turn: Mutex<()>,
}

impl<H: FeedbackHandler + 'static> ToolServer<H> {
    /// Create a server around a feedback handler.
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            info: ServerInfo::default(),
            feedback_turn: Mutex::new(()),
        }
    }

    /// Override the reported server identity.
    pub fn with_info(mut self, info: ServerInfo) -> Self {
        self.info = info;
        self
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(self) -> Result<(), ServerError> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve until `reader` reaches end of input.
    ///
    /// Requests still in flight when input ends, or when reading fails, are
    /// allowed to finish and their responses are written before this
    /// returns.
    pub async fn serve<R, W>(self, mut reader: R, writer: W) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::new(self);
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut in_flight = JoinSet::new();
        let mut buf = Vec::new();

        tracing::info!("Tool server started");

        let read_error = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break None,
                Ok(_) => {}
                Err(e) => break Some(e),
            }

            let line = trim_line_ending(&buf);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let line = line.to_vec();
            let server = Arc::clone(&server);
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_bytes(&line).await {
                    match serde_json::to_string(&response) {
                        Ok(text) => {
                            let _ = tx.send(text);
                        }
                        Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
                    }
                }
            });

            while let Some(finished) = in_flight.try_join_next() {
                log_task_result(finished);
            }
        };

        match &read_error {
            None => tracing::info!(in_flight = in_flight.len(), "Input closed, draining requests"),
            Some(e) => tracing::error!(
                error = %e,
                in_flight = in_flight.len(),
                "Input failed, draining requests"
            ),
        }
        while let Some(finished) = in_flight.join_next().await {
            log_task_result(finished);
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| ServerError::Task(e.to_string()))??;

        if let Some(e) = read_error {
            return Err(e.into());
        }

        tracing::info!("Tool server stopped");
        Ok(())
    }

    /// Handle one raw input line, which need not be valid UTF-8.
    pub async fn handle_bytes(&self, line: &[u8]) -> Option<OutgoingResponse> {
        match std::str::from_utf8(line) {
            Ok(line) => self.handle_line(line).await,
            Err(e) => {
                tracing::warn!(error = %e, "Message is not UTF-8");
                Some(OutgoingResponse::failure(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
        }
    }

    /// Handle one raw input line; `None` means nothing is sent back.
    pub async fn handle_line(&self, line: &str) -> Option<OutgoingResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable message");
                return Some(OutgoingResponse::failure(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<IncomingMessage>(value) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => Some(OutgoingResponse::failure(
                id,
                error_codes::INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )),
        }
    }

    /// Dispatch a decoded message.
    pub async fn handle_message(&self, message: IncomingMessage) -> Option<OutgoingResponse> {
        if message.is_notification() {
            tracing::debug!(method = %message.method, "Notification received");
            return None;
        }

        let id = message.id.clone().unwrap_or(Value::Null);
        if message.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return Some(OutgoingResponse::failure(
                id,
                error_codes::INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        tracing::debug!(method = %message.method, "Request received");

        let outcome = match message.method.as_str() {
            "initialize" => Ok(self.initialize(message.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": [tool_descriptor()] })),
            "tools/call" => self.call_tool(message.params).await,
            other => Err(RpcError {
                code: error_codes::METHOD_NOT_FOUND,
                message: format!("Method not found: {}", other),
            }),
        };

        Some(match outcome {
            Ok(result) => OutgoingResponse::success(id, result),
            Err(error) => OutgoingResponse::failure(id, error.code, error.message),
        })
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version
            }
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| RpcError {
                code: error_codes::INVALID_PARAMS,
                message: format!("Invalid tools/call params: {}", e),
            })?;

        if params.name != TOOL_NAME {
            return Ok(tool_failure(format!("Unknown tool: {}", params.name)));
        }

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let request = match FeedbackRequest::from_arguments(&arguments) {
            Ok(request) => request,
            Err(e) => return Ok(tool_failure(e.to_string())),
        };

        // One human, one terminal: feedback requests take turns
        let _turn = self.feedback_turn.lock().await;
        tracing::debug!(prompt_len = request.prompt.len(), "Feedback turn acquired");

        match self.handler.request_feedback(request).await {
            Ok(result) => Ok(tool_success(&result)),
            Err(e) => {
                tracing::warn!(error = %e, "Feedback request failed");
                Ok(tool_failure(e.to_string()))
            }
        }
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    writer.shutdown().await?;
    Ok(())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Request task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use async_trait::async_trait;
    use feedback_core::{merge, FeedbackError, FeedbackResult, SessionError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    // Mock handler: answers by merging the first option with fixed text
    struct MockHandler {
        seen: Mutex<Vec<FeedbackRequest>>,
        fail: bool,
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl MockHandler {
        fn answering() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail: false,
                delay: Duration::ZERO,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::answering()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::answering()
            }
        }
    }

    #[async_trait]
    impl FeedbackHandler for MockHandler {
        async fn request_feedback(
            &self,
            request: FeedbackRequest,
        ) -> Result<FeedbackResult, HandlerError> {
            let selected: Vec<&str> = request
                .predefined_options
                .iter()
                .take(1)
                .map(String::as_str)
                .collect();
            let answer = merge(&selected, "looks good");
            self.seen.lock().unwrap().push(request);

            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(FeedbackError::Session(SessionError::SurfaceExit { code: Some(1) }).into())
            } else {
                Ok(FeedbackResult::new(answer))
            }
        }
    }

    async fn call(server: &ToolServer<MockHandler>, line: &str) -> Value {
        let response = server.handle_line(line).await.expect("expected a response");
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let server = ToolServer::new(MockHandler::answering());
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "interactive-feedback");
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = ToolServer::new(MockHandler::answering());
        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = ToolServer::new(MockHandler::answering());
        let response = call(&server, r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#).await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], TOOL_NAME);
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let server = ToolServer::new(MockHandler::answering());
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"interactive_feedback","arguments":{"message":"Pick one","predefined_options":["No","Yes"]}}}"#,
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(
            result["structuredContent"]["interactive_feedback"],
            "No\n\nlooks good"
        );

        let seen = server.handler.seen.lock().unwrap();
        assert_eq!(seen[0].prompt, "Pick one");
        assert_eq!(seen[0].predefined_options, vec!["No", "Yes"]);
    }

    #[tokio::test]
    async fn test_tools_call_non_list_options() {
        let server = ToolServer::new(MockHandler::answering());
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"interactive_feedback","arguments":{"message":"Confirm","predefined_options":"Yes"}}}"#,
        )
        .await;

        assert_eq!(
            response["result"]["structuredContent"]["interactive_feedback"],
            "looks good"
        );
        assert!(server.handler.seen.lock().unwrap()[0]
            .predefined_options
            .is_empty());
    }

    #[tokio::test]
    async fn test_tools_call_failure_is_error_result() {
        let server = ToolServer::new(MockHandler::failing());
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"interactive_feedback","arguments":{"message":"hi"}}}"#,
        )
        .await;

        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("code 1"));
    }

    #[tokio::test]
    async fn test_tools_call_missing_message() {
        let server = ToolServer::new(MockHandler::answering());
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"interactive_feedback"}}"#,
        )
        .await;

        assert_eq!(response["result"]["isError"], true);
        assert!(server.handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let server = ToolServer::new(MockHandler::answering());

        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"other","arguments":{}}}"#,
        )
        .await;
        assert_eq!(response["result"]["isError"], true);

        let response = call(&server, r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#).await;
        assert_eq!(response["error"]["code"], error_codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = ToolServer::new(MockHandler::answering());

        let response = call(&server, "{not json").await;
        assert_eq!(response["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(response["id"], Value::Null);

        let response = call(&server, r#"{"jsonrpc":"2.0","id":7}"#).await;
        assert_eq!(response["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(response["id"], 7);

        let response = call(&server, r#"{"jsonrpc":"2.0","id":8,"method":"tools/call"}"#).await;
        assert_eq!(response["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_serve_until_eof() {
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"interactive_feedback","arguments":{"message":"Confirm"}}}"#,
        ]
        .join("\n");

        let (mut client, server_end) = tokio::io::duplex(64 * 1024);
        ToolServer::new(MockHandler::answering())
            .serve(input.as_bytes(), server_end)
            .await
            .unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();

        let mut ids: Vec<i64> = output
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].as_i64().unwrap())
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    async fn serve_bytes(handler: MockHandler, input: &[u8]) -> (Result<(), ServerError>, Vec<Value>) {
        let (mut client, server_end) = tokio::io::duplex(64 * 1024);
        let outcome = ToolServer::new(handler).serve(input, server_end).await;

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        let responses = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (outcome, responses)
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_a_parse_error() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
        input.extend_from_slice(b"\xff\xfe garbage\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\r\n");

        let (outcome, responses) = serve_bytes(MockHandler::answering(), &input).await;

        assert!(outcome.is_ok());
        assert_eq!(responses.len(), 3);

        let mut ids: Vec<i64> = responses.iter().filter_map(|r| r["id"].as_i64()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);

        let parse_error = responses.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse_error["error"]["code"], error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_feedback_requests_take_turns() {
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"interactive_feedback","arguments":{"message":"first"}}}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"interactive_feedback","arguments":{"message":"second"}}}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#,
        ]
        .join("\n");

        let (mut client, server_end) = tokio::io::duplex(64 * 1024);
        let server = ToolServer::new(MockHandler::slow(Duration::from_millis(50)));
        let handler = Arc::clone(&server.handler);
        server.serve(input.as_bytes(), server_end).await.unwrap();

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        let ids: Vec<i64> = output
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["id"].as_i64().unwrap())
            .collect();

        assert_eq!(handler.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(handler.seen.lock().unwrap().len(), 2);
        // ping is not held up behind the feedback requests
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], 3);
    }

    #[tokio::test]
    async fn test_null_id_request_is_answered() {
        let server = ToolServer::new(MockHandler::answering());
        let response = call(&server, r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).await;

        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["result"], json!({}));
    }
}
