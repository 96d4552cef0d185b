//! Сессия пользователя: хранение токена, разбор JWT payload и проверка авторства.
//!
//! Payload декодируется без проверки подписи: результат нужен только для
//! интерфейса (показывать ли кнопки редактирования). Права проверяет сервер.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

const LOCAL_TEST_TOKEN_PREFIX: &str = "session-token-for-";

/// Имя заголовка авторизации.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Хранилище токена сессии.
pub trait TokenStore: Send + Sync {
    /// Возвращает сохранённый токен, если он есть.
    fn load(&self) -> Option<String>;
    /// Сохраняет токен.
    fn save(&self, token: &str) -> io::Result<()>;
    /// Удаляет токен.
    fn clear(&self) -> io::Result<()>;
}

#[derive(Debug, Clone, Default)]
/// Хранилище в памяти: токен живёт, пока жива вкладка (процесс).
pub struct MemoryTokenStore {
    token: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    /// Создаёт пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| io::Error::other("token store is poisoned"))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| io::Error::other("token store is poisoned"))?;
        *guard = None;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Файловое хранилище токена для одноразовых команд CLI.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Создаёт хранилище, привязанное к файлу `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            return None;
        }
        Some(token.to_string())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
/// Декодированный payload токена.
pub struct TokenPayload {
    /// Логин пользователя (claim `username`). `None`, если claim не строка.
    #[serde(default, deserialize_with = "string_claim")]
    pub username: Option<String>,
    /// Остальные claims как есть.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

fn string_claim<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).map(str::to_string))
}

/// Декодирует payload (второй сегмент) JWT без проверки подписи.
///
/// Возвращает `None` на любом некорректном входе.
pub fn decode_payload(token: &str) -> Option<TokenPayload> {
    let segment = token.split('.').nth(1)?;
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => serde_json::from_value(Value::Object(map)).ok(),
        _ => None,
    }
}

/// Сессия вкладки поверх выбранного хранилища токена.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Session {
    /// Создаёт сессию поверх хранилища.
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Сессия с хранилищем в памяти.
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    /// Возвращает токен или пустую строку.
    pub fn get_token(&self) -> String {
        self.store.load().unwrap_or_default()
    }

    /// Сохраняет токен.
    pub fn set_token(&self, token: &str) -> io::Result<()> {
        self.store.save(token)
    }

    /// Удаляет токен.
    pub fn clear_token(&self) -> io::Result<()> {
        self.store.clear()
    }

    /// Логин из токена или пустая строка, если токена нет или он не разбирается.
    pub fn username_from_token(&self) -> String {
        let token = self.get_token();
        if token.is_empty() {
            return String::new();
        }
        if let Some(username) = token.strip_prefix(LOCAL_TEST_TOKEN_PREFIX) {
            return username.to_string();
        }

        decode_payload(&token)
            .and_then(|payload| payload.username)
            .unwrap_or_default()
    }

    /// `true`, если токен есть и он непустой.
    pub fn is_authenticated(&self) -> bool {
        !self.get_token().is_empty()
    }

    /// Может ли текущий пользователь редактировать пост автора `author`.
    pub fn can_edit(&self, author: &str) -> bool {
        self.is_authenticated() && self.username_from_token() == author
    }

    /// Заголовок `Authorization: Bearer <token>`. Возвращается всегда, даже без токена.
    pub fn auth_header(&self) -> (&'static str, String) {
        (AUTHORIZATION_HEADER, format!("Bearer {}", self.get_token()))
    }
}
