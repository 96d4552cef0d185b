use serde_json::Value;
use thiserror::Error;

/// Сообщение, если сервер не объяснил причину ошибки.
pub const REQUEST_FAILED: &str = "Request failed";

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `blog-client`.
pub enum ApiError {
    /// Сервер недоступен или соединение оборвалось.
    #[error("network error: {0}")]
    Network(String),

    /// Сервер ответил статусом вне диапазона 2xx.
    #[error("{message}")]
    Http {
        /// HTTP-статус ответа.
        status: u16,
        /// Нормализованное сообщение из тела ответа.
        message: String,
    },

    /// Успешный ответ не удалось разобрать.
    #[error("decode error: {0}")]
    Decode(String),

    /// Запрос не отправлен: некорректные данные на стороне клиента.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Результат операций `blog-client`.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Строит ошибку по статусу и сырому телу ответа.
    ///
    /// Тело разбирается как JSON, если получится; иначе считается пустым объектом.
    pub(crate) fn from_http_status(status: u16, body: &[u8]) -> Self {
        let body = serde_json::from_slice::<Value>(body)
            .unwrap_or_else(|_| Value::Object(Default::default()));
        Self::Http {
            status,
            message: error_message(&body),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }

    /// HTTP-статус, если ошибка пришла от сервера.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Ошибка транспорта (сервер недоступен).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Первое непустое из полей `message`, `detail`, `error`, иначе [`REQUEST_FAILED`].
pub fn error_message(body: &Value) -> String {
    ["message", "detail", "error"]
        .into_iter()
        .filter_map(|field| body.get(field))
        .find_map(field_text)
        .unwrap_or_else(|| REQUEST_FAILED.to_string())
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        // FastAPI отдаёт ошибки валидации списком объектов с полем `msg`.
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_prefers_message_then_detail_then_error() {
        assert_eq!(
            error_message(&json!({ "error": "e", "detail": "d", "message": "m" })),
            "m"
        );
        assert_eq!(error_message(&json!({ "error": "e", "detail": "d" })), "d");
        assert_eq!(error_message(&json!({ "error": "e" })), "e");
    }

    #[test]
    fn error_message_skips_empty_fields() {
        assert_eq!(error_message(&json!({ "message": "", "error": "e" })), "e");
        assert_eq!(error_message(&json!({ "detail": null })), REQUEST_FAILED);
    }

    #[test]
    fn error_message_reads_validation_detail_list() {
        let body = json!({ "detail": [{ "loc": ["body", "title"], "msg": "field required" }] });
        assert_eq!(error_message(&body), "field required");
    }

    #[test]
    fn from_http_status_handles_non_json_body() {
        let err = ApiError::from_http_status(502, b"<html>bad gateway</html>");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), REQUEST_FAILED);
    }

    #[test]
    fn http_error_displays_server_message() {
        let err = ApiError::from_http_status(404, br#"{"detail":"not found"}"#);
        assert_eq!(err.to_string(), "not found");
        assert!(!err.is_network());
    }
}
