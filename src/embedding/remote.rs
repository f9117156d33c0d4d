// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocking client for OpenAI-compatible `/embeddings` endpoints.
//!
//! Failed requests are not retried: a deterministic provider that fails once
//! will fail again, and the run aborts either way.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::provider::{ensure_outputs, ensure_texts, Embedding, EmbeddingProvider};
use super::similarity::l2_normalize;
use crate::errors::{Origin, RankError, RankResult};

pub struct RemoteProvider {
    client: Client,
    endpoint: String,
    model: String,
    batch_size: usize,
    max_concurrency: usize,
}

impl RemoteProvider {
    /// Builds the HTTP client. `api_key` may be omitted for local servers.
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        model: String,
        timeout: Duration,
        batch_size: usize,
        max_concurrency: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        anyhow::ensure!(!base_url.trim().is_empty(), "missing embedding endpoint");

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key)).context("invalid API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embeddings HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            model,
            batch_size: batch_size.max(1),
            max_concurrency: max_concurrency.max(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, inputs: &[&str]) -> RankResult<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| RankError::embedding(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RankError::embedding(format!(
                "embeddings request failed ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .map_err(|e| RankError::embedding(format!("failed to parse embedding response: {}", e)))?;
        parsed.into_ordered(inputs.len())
    }
}

impl EmbeddingProvider for RemoteProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    fn embed_batch(&self, texts: &[&str]) -> RankResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        ensure_texts(texts)?;

        let mut vectors = Vec::with_capacity(texts.len());
        for (i, chunk) in texts.chunks(self.batch_size).enumerate() {
            let offset = i * self.batch_size;
            let batch = self.request(chunk).map_err(|e| shift_position(e, offset))?;
            vectors.extend(batch);
        }
        ensure_outputs(texts.len(), &vectors)?;
        for vector in vectors.iter_mut() {
            l2_normalize(vector);
        }
        Ok(vectors)
    }
}

/// Re-bases a position reported for one HTTP request onto the whole batch.
fn shift_position(err: RankError, offset: usize) -> RankError {
    let shifted = match err.origin() {
        Some(Origin::Batch { index }) => Some(offset + index),
        _ => None,
    };
    match shifted {
        Some(index) => err.with_origin(Origin::Batch { index }),
        None => err,
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl EmbeddingResponse {
    /// Orders entries by `index`, which must cover exactly `0..inputs`.
    fn into_ordered(mut self, inputs: usize) -> RankResult<Vec<Embedding>> {
        if self.data.len() != inputs {
            return Err(RankError::embedding(format!(
                "provider returned {} embeddings for {} inputs",
                self.data.len(),
                inputs
            )));
        }
        self.data.sort_by_key(|entry| entry.index);
        if let Some((expected, entry)) = self
            .data
            .iter()
            .enumerate()
            .find(|(expected, entry)| entry.index != *expected)
        {
            return Err(RankError::embedding_at(
                expected,
                format!("response index {} does not match input #{}", entry.index, expected),
            ));
        }
        Ok(self.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_joined() {
        let provider = RemoteProvider::new(
            None,
            "http://localhost:8080/v1/".to_string(),
            "text-embedding-3-small".to_string(),
            Duration::from_secs(1),
            16,
            2,
        )
        .unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
        assert_eq!(provider.max_concurrency(), 2);
    }

    #[test]
    fn missing_model_is_rejected() {
        let result = RemoteProvider::new(
            Some("key".into()),
            "http://localhost".into(),
            " ".into(),
            Duration::from_secs(1),
            16,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unreachable_server_is_embedding_failure() {
        let provider = RemoteProvider::new(
            None,
            "http://127.0.0.1:9".to_string(),
            "m".to_string(),
            Duration::from_millis(200),
            4,
            1,
        )
        .unwrap();
        assert!(provider.embed("hello").unwrap_err().is_embedding_failure());
    }

    #[test]
    fn positions_are_rebased_onto_the_batch() {
        let err = shift_position(RankError::embedding_at(1, "bad"), 8);
        assert_eq!(err.origin(), Some(&Origin::Batch { index: 9 }));
        let err = shift_position(RankError::embedding("down"), 8);
        assert_eq!(err.origin(), Some(&Origin::Unknown));
    }

    fn parse(raw: &str) -> EmbeddingResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn response_is_reordered_by_index() {
        let vectors = parse(
            r#"{"data": [{"embedding": [0.0, 1.0], "index": 1}, {"embedding": [1.0, 0.0], "index": 0}]}"#,
        )
        .into_ordered(2)
        .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let err = parse(
            r#"{"data": [{"embedding": [0.0, 1.0], "index": 0}, {"embedding": [1.0, 0.0], "index": 0}]}"#,
        )
        .into_ordered(2)
        .unwrap_err();
        assert!(err.is_embedding_failure());
        assert_eq!(err.origin(), Some(&Origin::Batch { index: 1 }));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let err = parse(
            r#"{"data": [{"embedding": [0.0, 1.0], "index": 0}, {"embedding": [1.0, 0.0], "index": 5}]}"#,
        )
        .into_ordered(2)
        .unwrap_err();
        assert!(err.is_embedding_failure());
    }

    #[test]
    fn short_response_is_rejected() {
        let err = parse(r#"{"data": [{"embedding": [1.0], "index": 0}]}"#)
            .into_ordered(2)
            .unwrap_err();
        assert!(err.to_string().contains("1 embeddings for 2 inputs"));
    }

    /// Serves one canned JSON response on a local port and returns its base URL.
    fn serve_once(body: &'static str) -> String {
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .unwrap();
        });
        format!("http://{}", addr)
    }

    fn local_provider(base_url: String) -> RemoteProvider {
        RemoteProvider::new(None, base_url, "m".to_string(), Duration::from_secs(5), 8, 1).unwrap()
    }

    #[test]
    fn request_returns_vectors_in_input_order() {
        let base = serve_once(
            r#"{"data": [{"embedding": [0.0, 2.0], "index": 1}, {"embedding": [3.0, 0.0], "index": 0}]}"#,
        );
        let vectors = local_provider(base).embed_batch(&["first", "second"]).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn request_rejects_duplicate_indices() {
        let base = serve_once(
            r#"{"data": [{"embedding": [0.0, 2.0], "index": 1}, {"embedding": [3.0, 0.0], "index": 1}]}"#,
        );
        let err = local_provider(base)
            .embed_batch(&["first", "second"])
            .unwrap_err();
        assert_eq!(err.origin(), Some(&Origin::Batch { index: 0 }));
    }
}
