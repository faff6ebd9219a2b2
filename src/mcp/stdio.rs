//! Line-delimited JSON-RPC over standard streams
//!
//! One request per input line, one response per output line. Responses are
//! flushed as soon as they are written.

use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::mcp::server::{Dispatcher, Outcome};

pub async fn serve_stdio(dispatcher: &Dispatcher) -> io::Result<()> {
    info!("Starting MCP server with stdio transport");
    serve(dispatcher, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Runs the read-dispatch-respond loop until EOF or a `shutdown` request.
pub async fn serve<R, W>(dispatcher: &Dispatcher, mut reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            info!("EOF reached, closing connection");
            break;
        }

        let frame = line.trim_ascii();
        if frame.is_empty() {
            continue;
        }

        match dispatcher.handle_line(frame).await {
            Outcome::Respond(response) => write_frame(&mut writer, &response).await?,
            Outcome::Silent => {}
            Outcome::Shutdown => {
                info!("shutdown requested, closing connection");
                break;
            }
        }
    }

    writer.flush().await
}

async fn write_frame<W>(writer: &mut W, response: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(response)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio::io::BufReader;

    use super::serve;
    use crate::domain::tools::default_registry;
    use crate::mcp::server::{Dispatcher, ServerIdentity};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            ServerIdentity {
                name: "stdio-test".to_string(),
                version: "0.0.1".to_string(),
                description: None,
            },
            default_registry(),
        )
    }

    async fn run(input: &str) -> Vec<Value> {
        let dispatcher = dispatcher();
        let mut output = Vec::new();
        serve(&dispatcher, BufReader::new(input.as_bytes()), &mut output)
            .await
            .expect("stdio loop completes");

        String::from_utf8(output)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("each output line is json"))
            .collect()
    }

    #[tokio::test]
    async fn answers_each_request_on_its_own_line() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"calculator","arguments":{"operation":"add","a":2,"b":3}}}"#,
            "\n",
        ))
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "2 + 3 = 5");
    }

    #[tokio::test]
    async fn malformed_line_is_skipped() {
        let responses = run(concat!(
            "{this is not json\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":"after","method":"ping"}"#,
            "\n",
        ))
        .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "after");
    }

    #[tokio::test]
    async fn notifications_write_nothing() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#,
            "\n",
        ))
        .await;

        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_reading() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"shutdown"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        ))
        .await;

        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn last_line_without_newline_is_processed() {
        let responses = run(r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#).await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error"]["code"], -32002);
    }
}
