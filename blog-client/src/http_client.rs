use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
pub use reqwest::Method;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Таймаут установки соединения по умолчанию.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Таймаут всего запроса по умолчанию.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
/// Запрос к REST API относительно базового URL.
pub struct ApiRequest {
    /// HTTP-метод.
    pub method: Method,
    /// Путь, например `/blog/api/posts`.
    pub path: String,
    /// Параметры строки запроса.
    pub query: Vec<(String, String)>,
    /// Дополнительные заголовки.
    pub headers: Vec<(String, String)>,
    /// JSON-тело.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Запрос без тела, заголовков и параметров.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Значение заголовка (имя сравнивается без учёта регистра).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Статус и сырое тело ответа.
pub struct ApiResponse {
    /// HTTP-статус.
    pub status: u16,
    /// Тело ответа.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Ответ со статусом 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Транспорт, через который `Api` отправляет запросы.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Отправляет запрос и возвращает ответ с любым статусом.
    ///
    /// Ошибка возвращается только если ответа нет совсем.
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}

#[derive(Clone)]
/// HTTP-транспорт поверх `reqwest`.
pub struct ReqwestTransport {
    base_url: String,
    client: Client,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ReqwestTransport {
    /// Создаёт транспорт с таймаутами по умолчанию.
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Создаёт транспорт с заданными таймаутами.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.endpoint(&request.path);

        let mut builder = self.client.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ApiError::from_reqwest)?;

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}
