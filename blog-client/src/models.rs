use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Краткая ссылка на категорию внутри поста.
pub struct CategoryRef {
    /// Идентификатор категории (сервер может его не отдавать).
    #[serde(default)]
    pub id: Option<i64>,
    /// Slug категории, используется в фильтре списка.
    pub slug: String,
    /// Отображаемое имя категории.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Элемент списка постов: заголовок, автор и отрывок.
pub struct PostSummary {
    /// Идентификатор поста.
    pub id: i64,
    /// Заголовок.
    pub title: String,
    /// Логин автора.
    pub author: String,
    /// Отрывок содержимого.
    #[serde(default)]
    pub excerpt: String,
    /// Категория поста.
    pub category: CategoryRef,
    /// Время создания в том виде, в каком его вернул сервер.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Полная модель поста.
pub struct PostDetail {
    /// Идентификатор поста.
    pub id: i64,
    /// Заголовок.
    pub title: String,
    /// Содержимое (markdown).
    pub content: String,
    /// Логин автора.
    pub author: String,
    /// Категория поста.
    pub category: CategoryRef,
    /// Время создания в том виде, в каком его вернул сервер.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Категория вместе с цветом и количеством постов.
pub struct Category {
    /// Slug категории.
    pub slug: String,
    /// Отображаемое имя.
    pub name: String,
    /// Цвет в формате `#RRGGBB`.
    #[serde(default)]
    pub color: Option<String>,
    /// Количество постов в категории.
    #[serde(default)]
    pub post_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
/// Тело запроса на создание поста.
pub struct NewPost {
    /// Заголовок, 1..=120 символов.
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    /// Содержимое, 1..=20000 символов.
    #[validate(length(min = 1, max = 20000))]
    pub content: String,
    /// Имя категории; сервер создаёт её, если такой ещё нет.
    #[validate(length(min = 1, max = 50))]
    pub category_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Частичное обновление поста (PATCH): отправляются только заданные поля.
pub struct PostPatch {
    /// Новый заголовок.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Новое содержимое.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Новая категория.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

impl From<NewPost> for PostPatch {
    fn from(value: NewPost) -> Self {
        Self {
            title: Some(value.title),
            content: Some(value.content),
            category_name: Some(value.category_name),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Ответ на успешный вход. Сервер отдаёт токен в `token` или `access_token`.
pub struct LoginResponse {
    /// Токен в основном формате ответа.
    #[serde(default)]
    pub token: Option<String>,
    /// Токен в OAuth-подобном формате ответа.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl LoginResponse {
    /// Возвращает первый непустой токен из ответа.
    pub fn into_token(self) -> Option<String> {
        self.token
            .filter(|token| !token.is_empty())
            .or(self.access_token.filter(|token| !token.is_empty()))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequestDto<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignupRequestDto<'a> {
    pub(crate) username: &'a str,
    pub(crate) email: &'a str,
    pub(crate) password: &'a str,
}
