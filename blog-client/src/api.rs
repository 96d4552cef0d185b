use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::auth::Session;
use crate::error::{ApiError, ApiResult};
use crate::http_client::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::models::{
    Category, LoginRequestDto, LoginResponse, NewPost, PostDetail, PostPatch, PostSummary,
    SignupRequestDto,
};

const POSTS_PATH: &str = "/blog/api/posts";
const CATEGORIES_PATH: &str = "/blog/api/categories";
const LOGIN_PATH: &str = "/api/login";
/// Путь регистрации по умолчанию.
pub const DEFAULT_SIGNUP_PATH: &str = "/api/users";

/// Клиент REST API блога.
///
/// Все ответы вне 2xx превращаются в [`ApiError::Http`] с сообщением из тела
/// ответа; вызывающему коду не нужно смотреть на статус самому.
#[derive(Clone)]
pub struct Api {
    transport: Arc<dyn HttpTransport>,
    session: Session,
    signup_path: String,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("session", &self.session)
            .field("signup_path", &self.signup_path)
            .finish()
    }
}

impl Api {
    /// Создаёт клиент поверх транспорта и сессии, из которой берётся токен.
    pub fn new(transport: impl HttpTransport + 'static, session: Session) -> Self {
        Self {
            transport: Arc::new(transport),
            session,
            signup_path: DEFAULT_SIGNUP_PATH.to_string(),
        }
    }

    /// Переопределяет путь регистрации (`/api/users` или `/api/register`).
    pub fn with_signup_path(mut self, path: impl Into<String>) -> Self {
        self.signup_path = path.into();
        self
    }

    /// Сессия, из которой берётся заголовок авторизации.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Посты.
    pub fn posts(&self) -> PostsApi<'_> {
        PostsApi { api: self }
    }

    /// Категории.
    pub fn categories(&self) -> CategoriesApi<'_> {
        CategoriesApi { api: self }
    }

    /// Вход и регистрация.
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { api: self }
    }

    /// GET без авторизации.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        self.get_with_query(endpoint, &[]).await
    }

    /// GET с параметрами строки запроса.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let mut request = self.request(Method::GET, endpoint, None, false);
        request.query = query
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        let response = self.execute(request).await?;
        decode(&response, false)
    }

    /// POST с JSON-телом.
    pub async fn post<B, T>(&self, endpoint: &str, data: &B, authenticated: bool) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, endpoint, data, authenticated)
            .await
    }

    /// PATCH с JSON-телом.
    pub async fn patch<B, T>(&self, endpoint: &str, data: &B, authenticated: bool) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, endpoint, data, authenticated)
            .await
    }

    /// DELETE. Для `204 No Content` возвращает `None`.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        authenticated: bool,
    ) -> ApiResult<Option<T>> {
        let request = self.request(Method::DELETE, endpoint, None, authenticated);
        let response = self.execute(request).await?;
        decode(&response, false)
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        data: &B,
        authenticated: bool,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body =
            serde_json::to_value(data).map_err(|err| ApiError::InvalidRequest(err.to_string()))?;
        let request = self.request(method, endpoint, Some(body), authenticated);
        let response = self.execute(request).await?;
        decode(&response, true)
    }

    fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        authenticated: bool,
    ) -> ApiRequest {
        let mut request = ApiRequest::new(method, endpoint);
        if body.is_some() {
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if authenticated {
            let (name, value) = self.session.auth_header();
            request.headers.push((name.to_string(), value));
        }
        request.body = body;
        request
    }

    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let method = request.method.clone();
        let path = request.path.clone();

        let response = self.transport.send(request).await?;
        debug!(%method, %path, status = response.status, "api response");

        if !response.is_success() {
            return Err(ApiError::from_http_status(response.status, &response.body));
        }
        Ok(response)
    }
}

/// Разбирает тело успешного ответа.
///
/// `204` разбирается как `null`. При `lenient` нечитаемое тело считается `{}`.
fn decode<T: DeserializeOwned>(response: &ApiResponse, lenient: bool) -> ApiResult<T> {
    let value = if response.status == 204 {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => value,
            Err(_) if lenient => Value::Object(Default::default()),
            Err(err) => return Err(ApiError::Decode(err.to_string())),
        }
    };

    serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Операции с постами.
#[derive(Debug, Clone, Copy)]
pub struct PostsApi<'a> {
    api: &'a Api,
}

impl PostsApi<'_> {
    /// Все посты, опционально отфильтрованные по slug категории.
    ///
    /// Пагинации на сервере нет: клиент режет список сам.
    pub async fn get_all(&self, category: Option<&str>) -> ApiResult<Vec<PostSummary>> {
        match category.filter(|slug| !slug.is_empty()) {
            Some(slug) => {
                self.api
                    .get_with_query(POSTS_PATH, &[("category", slug)])
                    .await
            }
            None => self.api.get(POSTS_PATH).await,
        }
    }

    /// Пост по идентификатору.
    pub async fn get_by_id(&self, id: impl Display) -> ApiResult<PostDetail> {
        self.api.get(&format!("{POSTS_PATH}/{id}")).await
    }

    /// Создаёт пост. Требует токен.
    pub async fn create(&self, data: &NewPost) -> ApiResult<PostDetail> {
        self.api.post(POSTS_PATH, data, true).await
    }

    /// Частично обновляет пост (PATCH). Требует токен автора.
    pub async fn update(&self, id: impl Display, data: &PostPatch) -> ApiResult<PostDetail> {
        self.api
            .patch(&format!("{POSTS_PATH}/{id}"), data, true)
            .await
    }

    /// Удаляет пост. Требует токен автора, сервер отвечает `204`.
    pub async fn delete(&self, id: impl Display) -> ApiResult<()> {
        self.api
            .delete::<Value>(&format!("{POSTS_PATH}/{id}"), true)
            .await
            .map(|_| ())
    }
}

/// Операции с категориями.
#[derive(Debug, Clone, Copy)]
pub struct CategoriesApi<'a> {
    api: &'a Api,
}

impl CategoriesApi<'_> {
    /// Все категории с цветами и счётчиками постов.
    pub async fn get_all(&self) -> ApiResult<Vec<Category>> {
        self.api.get(CATEGORIES_PATH).await
    }
}

/// Вход и регистрация. Оба запроса без авторизации.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    api: &'a Api,
}

impl AuthApi<'_> {
    /// Вход по логину и паролю.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let payload = LoginRequestDto { username, password };
        self.api.post(LOGIN_PATH, &payload, false).await
    }

    /// Регистрация. Возвращает тело ответа сервера как есть.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> ApiResult<Value> {
        let payload = SignupRequestDto {
            username,
            email,
            password,
        };
        self.api.post(&self.api.signup_path, &payload, false).await
    }
}
