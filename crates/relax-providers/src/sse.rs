//! Server-sent events decoding for streamed chat completions.
//!
//! The endpoint answers with lines of the form `data: {json}` separated by
//! blank lines, and terminates with `data: [DONE]`.

use futures_util::{stream, Stream, StreamExt};
use serde::Deserialize;

use crate::traits::FragmentStream;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// What a single SSE line contributes to the answer.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

/// Classify one line of the event stream.
pub(crate) fn parse_line(line: &str) -> anyhow::Result<SseLine> {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    let Some(data) = line.strip_prefix("data:") else {
        // Blank separators, comments and other SSE fields carry no text.
        return Ok(SseLine::Skip);
    };
    let data = data.trim_start();

    if data == DONE_MARKER {
        return Ok(SseLine::Done);
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| anyhow::anyhow!("Error parsing stream chunk: {}", e))?;

    match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(text) if !text.is_empty() => Ok(SseLine::Fragment(text)),
        _ => Ok(SseLine::Skip),
    }
}

struct SseState<S> {
    body: std::pin::Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl<S> SseState<S> {
    fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Turn a raw response body into a stream of text fragments.
///
/// The returned stream ends at `[DONE]` or when the body closes. A transport
/// or decode failure is yielded once as an `Err` and then the stream ends.
pub fn fragments<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        buffer: Vec::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.next_line() {
                match parse_line(&line) {
                    Ok(SseLine::Fragment(text)) => return Some((Ok(text), state)),
                    Ok(SseLine::Done) => return None,
                    Ok(SseLine::Skip) => continue,
                    Err(e) => {
                        state.finished = true;
                        state.buffer.clear();
                        return Some((Err(e), state));
                    }
                }
            }

            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    state.buffer.clear();
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.finished = true;
                    // A final line without trailing newline still counts.
                    if !state.buffer.is_empty() {
                        state.buffer.push(b'\n');
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}, "finish_reason": null}]})
        )
    }

    async fn collect(parts: &[&str]) -> Vec<Result<String, String>> {
        let body = stream::iter(
            parts
                .iter()
                .map(|p| Ok::<_, std::io::Error>(p.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        );
        fragments(body)
            .map(|item| item.map_err(|e| e.to_string()))
            .collect()
            .await
    }

    #[test]
    fn test_parse_line_kinds() {
        assert_eq!(parse_line("").unwrap(), SseLine::Skip);
        assert_eq!(parse_line(": keep-alive").unwrap(), SseLine::Skip);
        assert_eq!(parse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert_eq!(
            parse_line(chunk("hi").trim_end()).unwrap(),
            SseLine::Fragment("hi".into())
        );
        // Role-only opening delta
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            SseLine::Skip
        );
        assert!(parse_line("data: {not json").is_err());
    }

    #[tokio::test]
    async fn test_fragments_in_order() {
        let body = format!("{}{}{}data: [DONE]\n\n", chunk("Hel"), chunk("lo"), chunk("!"));
        let items = collect(&[body.as_str()]).await;
        assert_eq!(
            items,
            vec![Ok("Hel".to_string()), Ok("lo".to_string()), Ok("!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let items = collect(&[
            "data: {\"choices\":[{\"del",
            "ta\":{\"content\":\"ab\"}}]}\r\n\r\nda",
            "ta: {\"choices\":[{\"delta\":{\"content\":\"c\"}}]}\n\n",
        ])
        .await;
        assert_eq!(items, vec![Ok("ab".to_string()), Ok("c".to_string())]);
    }

    #[tokio::test]
    async fn test_stops_at_done() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ])
        .await;
        assert_eq!(items, vec![Ok("x".to_string())]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let items = collect(&["data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"]).await;
        assert_eq!(items, vec![Ok("end".to_string())]);
    }

    #[tokio::test]
    async fn test_bad_chunk_yields_single_error() {
        let items = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
            "data: garbage\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"after\"}}]}\n\n",
        ])
        .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("ok".to_string()));
        assert!(items[1].as_ref().unwrap_err().contains("Error parsing stream chunk"));
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let body = stream::iter(vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n".to_vec()),
        ]);
        let items: Vec<_> = fragments(body).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(items[1].is_err());
    }
}
