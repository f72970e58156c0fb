use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::{
    wire::{self, ChatCompletionsRequest, Message, ResponseFormat},
    ChatParams, OpenAiError,
};

/// Maximum number of characters of a response body kept in errors.
pub const BODY_SNIPPET_LIMIT: usize = 8_000;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub(crate) fn encode_request(
    model: &str,
    params: &ChatParams,
    structured_output: bool,
) -> Result<Vec<u8>, OpenAiError> {
    // serde_json writes NaN and infinities as `null`, which the API rejects.
    if !params.temperature.is_finite() {
        return Err(OpenAiError::Decode(format!(
            "failed to encode request: temperature {} is not a finite number",
            params.temperature
        )));
    }

    let request = ChatCompletionsRequest {
        model,
        messages: [
            Message {
                role: "system",
                content: &params.system,
            },
            Message {
                role: "user",
                content: &params.user,
            },
        ],
        temperature: params.temperature,
        response_format: structured_output.then_some(ResponseFormat::JsonObject),
    };

    serde_json::to_vec(&request)
        .map_err(|err| OpenAiError::Decode(format!("failed to encode request: {err}")))
}

/// Extracts the first choice's text; an answer without choices is empty.
pub(crate) fn decode_completion(body: &[u8]) -> Result<String, OpenAiError> {
    let response =
        serde_json::from_slice::<wire::ChatCompletionsResponse>(body).map_err(|err| {
            OpenAiError::Decode(format!(
                "invalid chat completion JSON: {err}; body: {}",
                body_snippet(body, BODY_SNIPPET_LIMIT)
            ))
        })?;

    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default())
}

pub(crate) fn decode_api_error(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<wire::ApiErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}

pub(crate) fn decode_typed<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, OpenAiError> {
    serde_json::from_str(raw).map_err(|err| {
        OpenAiError::Decode(format!(
            "failed to decode {}: {err}; body: {}",
            std::any::type_name::<T>(),
            body_snippet(raw.as_bytes(), BODY_SNIPPET_LIMIT)
        ))
    })
}

/// Renders raw bytes for an error message.
///
/// Invalid UTF-8 is replaced by a placeholder naming the byte count. Text
/// longer than `limit` characters is cut and suffixed with `…`.
pub fn body_snippet(body: &[u8], limit: usize) -> String {
    let Ok(text) = std::str::from_utf8(body) else {
        return format!("<non-utf8 data {} bytes>", body.len());
    };

    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_owned(),
    }
}

pub(crate) fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Parses `Retry-After` as a number of seconds.
///
/// HTTP-date values and negative or non-finite numbers are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds = value.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
    use serde_json::json;

    use super::{
        body_snippet, decode_api_error, decode_completion, decode_typed, encode_request,
        request_id, retry_after, BODY_SNIPPET_LIMIT,
    };
    use crate::{ChatParams, OpenAiError};

    fn encoded(params: &ChatParams) -> serde_json::Value {
        let bytes = encode_request("gpt-4o-mini", params, params.structured_output).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn request_omits_response_format_in_text_mode() {
        let body = encoded(&ChatParams::new("sys", "usr").with_temperature(0.5));
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "usr" }
                ],
                "temperature": 0.5
            })
        );
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn request_includes_json_object_format_in_structured_mode() {
        let body = encoded(&ChatParams::new("sys", "usr").structured());
        assert_eq!(body["response_format"], json!({ "type": "json_object" }));
    }

    #[test]
    fn non_finite_temperature_is_an_encode_error() {
        let params = ChatParams::new("s", "u").with_temperature(f64::NAN);
        let err = encode_request("m", &params, false).unwrap_err();
        assert!(matches!(err, OpenAiError::Decode(_)));
    }

    #[test]
    fn completion_takes_first_choice() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "first" } },
                { "index": 1, "message": { "role": "assistant", "content": "second" } }
            ]
        });
        let text = decode_completion(body.to_string().as_bytes()).unwrap();
        assert_eq!(text, "first");
    }

    #[test]
    fn completion_without_choices_is_empty() {
        assert_eq!(decode_completion(br#"{"choices":[]}"#).unwrap(), "");
        assert_eq!(
            decode_completion(br#"{"choices":[{"message":{"content":null}}]}"#).unwrap(),
            ""
        );
    }

    #[test]
    fn malformed_completion_is_decode_error() {
        let err = decode_completion(b"<html>oops</html>").unwrap_err();
        match err {
            OpenAiError::Decode(message) => assert!(message.contains("<html>oops</html>")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn api_error_envelope_is_best_effort() {
        let body = br#"{"error":{"message":"Rate limit reached","type":"requests","code":null}}"#;
        assert_eq!(decode_api_error(body).as_deref(), Some("Rate limit reached"));
        assert_eq!(decode_api_error(b"upstream connect error"), None);
        assert_eq!(decode_api_error(br#"{"error":"flat string"}"#), None);
    }

    #[test]
    fn typed_decode_failure_names_target() {
        #[derive(Debug, serde::Deserialize)]
        struct Invoice {
            #[allow(dead_code)]
            total: f64,
        }

        let err = decode_typed::<Invoice>(r#"{"sum": 1}"#).unwrap_err();
        match err {
            OpenAiError::Decode(message) => assert!(message.contains("Invoice")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn snippet_truncates_on_characters() {
        let body = "é".repeat(10_000);
        let snippet = body_snippet(body.as_bytes(), BODY_SNIPPET_LIMIT);
        assert!(snippet.ends_with('…'));
        assert_eq!(snippet.chars().count(), BODY_SNIPPET_LIMIT + 1);
        assert!(snippet.chars().take(BODY_SNIPPET_LIMIT).all(|c| c == 'é'));
    }

    #[test]
    fn snippet_keeps_short_and_exact_bodies() {
        assert_eq!(body_snippet(b"short", BODY_SNIPPET_LIMIT), "short");
        let exact = "a".repeat(BODY_SNIPPET_LIMIT);
        assert_eq!(body_snippet(exact.as_bytes(), BODY_SNIPPET_LIMIT), exact);
    }

    #[test]
    fn snippet_replaces_invalid_utf8() {
        assert_eq!(
            body_snippet(&[0xff, 0xfe, 0x00], BODY_SNIPPET_LIMIT),
            "<non-utf8 data 3 bytes>"
        );
    }

    #[test]
    fn headers_are_read() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), None);
        assert_eq!(retry_after(&headers), None);

        headers.insert("x-request-id", HeaderValue::from_static("req_123"));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(request_id(&headers).as_deref(), Some("req_123"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
        assert_eq!(retry_after(&headers), Some(Duration::from_millis(1_500)));
    }

    #[test]
    fn unparseable_retry_after_is_ignored() {
        let mut headers = HeaderMap::new();
        for value in ["Wed, 21 Oct 2015 07:28:00 GMT", "-1", "NaN", "inf", ""] {
            headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
            assert_eq!(retry_after(&headers), None, "value {value:?}");
        }
    }
}
