//! Граница со слоем отображения.
//!
//! Контроллеры готовят готовые к выводу модели и передают их в [`View`];
//! как именно они будут нарисованы (DOM, терминал, тестовый рекордер), решает
//! реализация трейта.

use crate::auth::Session;
use crate::models::{PostDetail, PostSummary};
use crate::state::{ALL_CATEGORIES_KEY, AppState, Pagination, hex_to_rgb};

/// Подпись вкладки "все категории".
pub const ALL_CATEGORIES_LABEL: &str = "Все";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Тип уведомления.
pub enum NoticeLevel {
    /// Успех.
    Success,
    /// Ошибка.
    Error,
    /// Предупреждение.
    Warning,
    /// Информация.
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Форма, рядом с которой показывается ошибка.
pub enum FormKind {
    /// Вход.
    Login,
    /// Регистрация.
    Signup,
    /// Создание или редактирование поста.
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Режим формы поста.
pub enum FormMode {
    /// Новый пост.
    Create,
    /// Редактирование поста с указанным id.
    Edit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Состояние авторизации для шапки.
pub struct AuthStatus {
    /// Есть ли токен.
    pub authenticated: bool,
    /// Логин из токена (может быть пустым).
    pub username: String,
}

impl AuthStatus {
    /// Снимок состояния сессии.
    pub fn from_session(session: &Session) -> Self {
        Self {
            authenticated: session.is_authenticated(),
            username: session.username_from_token(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Вкладка фильтра категорий.
pub struct CategoryTab {
    /// Slug; пустой для вкладки "все".
    pub slug: String,
    /// Подпись.
    pub name: String,
    /// Количество постов.
    pub count: u64,
    /// Цвет категории, если задан.
    pub color: Option<String>,
    /// Выбрана ли вкладка.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Карточка поста в списке.
pub struct PostCard {
    /// Идентификатор поста.
    pub id: i64,
    /// Заголовок.
    pub title: String,
    /// Автор.
    pub author: String,
    /// Отрывок.
    pub excerpt: String,
    /// Имя категории для бейджа.
    pub category_name: String,
    /// Цвет бейджа.
    pub color: String,
    /// Цвет бейджа как `"r, g, b"`.
    pub color_rgb: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Одна страница списка постов.
pub struct PostListPage {
    /// Посты текущей страницы.
    pub posts: Vec<PostCard>,
    /// Пагинация по всему списку.
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Страница поста.
pub struct PostDetailView {
    /// Пост.
    pub post: PostDetail,
    /// Цвет бейджа категории.
    pub color: String,
    /// Цвет бейджа как `"r, g, b"`.
    pub color_rgb: String,
    /// Показывать ли кнопки редактирования и удаления.
    pub can_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Форма создания или редактирования поста.
pub struct PostFormView {
    /// Режим.
    pub mode: FormMode,
    /// Заголовок.
    pub title: String,
    /// Содержимое.
    pub content: String,
    /// Имя категории.
    pub category_name: String,
    /// Подсказки для поля категории.
    pub category_suggestions: Vec<String>,
}

/// Слой отображения.
pub trait View: Send {
    /// Шапка: кнопки входа или "написать"/"выйти".
    fn render_auth_status(&mut self, status: &AuthStatus);
    /// Вкладки категорий.
    fn render_category_tabs(&mut self, tabs: &[CategoryTab]);
    /// Страница списка постов.
    fn render_post_list(&mut self, page: &PostListPage);
    /// Список не загрузился.
    fn render_post_list_error(&mut self, message: &str);
    /// Страница поста.
    fn render_post_detail(&mut self, detail: &PostDetailView);
    /// Пост не загрузился.
    fn render_post_detail_error(&mut self, message: &str);
    /// Форма поста.
    fn render_post_form(&mut self, form: &PostFormView);
    /// Ошибка рядом с формой.
    fn show_form_error(&mut self, form: FormKind, message: &str);
    /// Предложить войти (модальное окно входа).
    fn show_login_prompt(&mut self);
    /// Закрыть модальные окна.
    fn close_dialogs(&mut self);
    /// Всплывающее уведомление.
    fn notify(&mut self, level: NoticeLevel, message: &str);
    /// Подтверждение действия пользователем.
    fn confirm(&mut self, question: &str) -> bool;
    /// Индикатор загрузки списка.
    fn set_loading(&mut self, _loading: bool) {}
}

/// Вкладки категорий: сначала "все", затем категории из кэша.
pub fn category_tabs(state: &AppState) -> Vec<CategoryTab> {
    let current = state.current_category();
    let all = CategoryTab {
        slug: String::new(),
        name: ALL_CATEGORIES_LABEL.to_string(),
        count: state
            .category_counts()
            .get(ALL_CATEGORIES_KEY)
            .copied()
            .unwrap_or(0),
        color: None,
        active: current.is_empty(),
    };

    std::iter::once(all)
        .chain(state.categories().iter().map(|category| CategoryTab {
            slug: category.slug.clone(),
            name: category.name.clone(),
            count: category.post_count,
            color: category.color.clone().filter(|color| !color.is_empty()),
            active: current == category.slug,
        }))
        .collect()
}

/// Страница списка: срез текущей страницы и пагинация по всему списку.
pub fn post_list_page(state: &AppState, posts: &[PostSummary]) -> PostListPage {
    let cards = state
        .page_slice(posts)
        .iter()
        .map(|post| {
            let color = state.category_color(&post.category.slug).to_string();
            PostCard {
                id: post.id,
                title: post.title.clone(),
                author: post.author.clone(),
                excerpt: post.excerpt.clone(),
                category_name: post.category.name.clone(),
                color_rgb: hex_to_rgb(&color),
                color,
            }
        })
        .collect();

    PostListPage {
        posts: cards,
        pagination: state.pagination(posts.len()),
    }
}
