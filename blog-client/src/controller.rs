//! Контроллеры страниц: список, пост, форма, вход и выход.
//!
//! `BlogApp` связывает состояние, API и роутер и отдаёт результат в [`View`].
//! Ни одна ошибка не фатальна: всё заканчивается сообщением рядом с формой или
//! уведомлением.

use async_trait::async_trait;
use tracing::{debug, warn};
use validator::{Validate, ValidationErrors};

use crate::api::Api;
use crate::auth::Session;
use crate::error::ApiError;
use crate::models::{NewPost, PostPatch};
use crate::router::{Location, NavigationTicket, Route, RouteHandler};
use crate::state::{AppState, hex_to_rgb};
use crate::view::{
    AuthStatus, FormKind, FormMode, NoticeLevel, PostDetailView, PostFormView, View,
    category_tabs, post_list_page,
};

/// Тексты, которые контроллеры показывают пользователю.
pub mod messages {
    /// Список постов не загрузился.
    pub const LIST_LOAD_FAILED: &str = "Не удалось загрузить посты.";
    /// Пост не загрузился.
    pub const POST_LOAD_FAILED: &str = "Не удалось загрузить пост.";
    /// Ошибка транспорта.
    pub const SERVER_UNREACHABLE: &str = "Сервер недоступен.";
    /// Действие требует входа.
    pub const LOGIN_REQUIRED: &str = "Требуется авторизация.";
    /// Попытка редактировать чужой пост.
    pub const AUTHOR_ONLY: &str = "Редактировать пост может только автор.";
    /// Вход не удался, а сервер не объяснил почему.
    pub const LOGIN_FAILED: &str = "Не удалось войти.";
    /// Регистрация не удалась, а сервер не объяснил почему.
    pub const SIGNUP_FAILED: &str = "Не удалось зарегистрироваться.";
    /// Регистрация прошла.
    pub const SIGNUP_DONE: &str = "Регистрация завершена. Войдите в аккаунт.";
    /// Выход из аккаунта.
    pub const LOGGED_OUT: &str = "Вы вышли из аккаунта.";
    /// Не указана категория.
    pub const CATEGORY_REQUIRED: &str = "Укажите категорию.";
    /// Пустой заголовок или содержимое.
    pub const TITLE_CONTENT_REQUIRED: &str = "Заполните заголовок и содержимое.";
    /// Слишком длинный заголовок.
    pub const TITLE_TOO_LONG: &str = "Заголовок должен быть не длиннее 120 символов.";
    /// Слишком длинное содержимое.
    pub const CONTENT_TOO_LONG: &str = "Содержимое должно быть не длиннее 20000 символов.";
    /// Слишком длинное имя категории.
    pub const CATEGORY_TOO_LONG: &str = "Категория должна быть не длиннее 50 символов.";
    /// Нет открытой формы поста.
    pub const NO_ACTIVE_FORM: &str = "Форма поста не открыта.";
    /// Пост не сохранился.
    pub const SAVE_FAILED: &str = "Не удалось сохранить пост.";
    /// Вопрос перед удалением.
    pub const DELETE_CONFIRM: &str = "Удалить пост?";
    /// Пост удалён.
    pub const DELETED: &str = "Пост удалён.";
    /// Пост не удалился.
    pub const DELETE_FAILED: &str = "Не удалось удалить пост.";
}

use messages::*;

/// Сообщение для пользователя: текст сервера, "сервер недоступен" или `fallback`.
pub fn user_message(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Network(_) => SERVER_UNREACHABLE.to_string(),
        ApiError::Http { message, .. } => message.clone(),
        ApiError::Decode(_) | ApiError::InvalidRequest(_) => fallback.to_string(),
    }
}

/// Клиентское приложение блога.
pub struct BlogApp<V> {
    api: Api,
    state: AppState,
    location: Location,
    view: V,
    ticket: NavigationTicket,
    posts_total: usize,
    form: Option<FormMode>,
    open_post: Option<String>,
}

impl<V: View> BlogApp<V> {
    /// Создаёт приложение. `location` должна быть той же, что у роутера.
    pub fn new(api: Api, location: Location, view: V) -> Self {
        Self {
            api,
            state: AppState::new(),
            location,
            view,
            ticket: NavigationTicket::detached(),
            posts_total: 0,
            form: None,
            open_post: None,
        }
    }

    /// Состояние клиента.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Состояние клиента (изменяемое), например чтобы выбрать страницу до загрузки.
    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// Сессия.
    pub fn session(&self) -> &Session {
        self.api.session()
    }

    /// Слой отображения.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Слой отображения (изменяемый).
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Открытая форма поста, если есть.
    pub fn active_form(&self) -> Option<&FormMode> {
        self.form.as_ref()
    }

    /// Id открытого поста, если он показан.
    pub fn open_post(&self) -> Option<&str> {
        self.open_post.as_deref()
    }

    /// Загружает категории, обновляет кэш и вкладки. Ошибка только логируется.
    pub async fn load_category_counts(&mut self) {
        let ticket = self.ticket.clone();
        match self.api.categories().get_all().await {
            Ok(categories) => {
                if !ticket.is_current() {
                    return;
                }
                self.state.set_categories_data(categories);
                self.view.render_category_tabs(&category_tabs(&self.state));
            }
            Err(err) => warn!(error = %err, "failed to load categories"),
        }
    }

    /// Загружает посты текущей категории и рисует текущую страницу.
    ///
    /// `true`, если список показан.
    pub async fn load_posts(&mut self) -> bool {
        let ticket = self.ticket.clone();
        self.view.set_loading(true);
        let result = self
            .api
            .posts()
            .get_all(Some(self.state.current_category()))
            .await;
        self.view.set_loading(false);

        if !ticket.is_current() {
            debug!(generation = ticket.generation(), "dropping stale post list");
            return false;
        }

        match result {
            Ok(posts) => {
                self.posts_total = posts.len();
                self.view
                    .render_post_list(&post_list_page(&self.state, &posts));
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to load posts");
                self.view.render_post_list_error(LIST_LOAD_FAILED);
                self.view.notify(NoticeLevel::Error, LIST_LOAD_FAILED);
                false
            }
        }
    }

    /// Переключает фильтр категории. Повторный выбор той же категории ничего не делает.
    pub async fn select_category(&mut self, slug: &str) {
        if slug == self.state.current_category() {
            return;
        }
        self.state.set_category(slug);
        self.view.render_category_tabs(&category_tabs(&self.state));
        self.load_posts().await;
    }

    /// Переход на страницу `page` списка.
    pub async fn go_to_page(&mut self, page: u32) {
        self.state.set_page(page);
        self.load_posts().await;
    }

    /// Следующая страница, если она есть.
    pub async fn next_page(&mut self) -> bool {
        let pagination = self.state.pagination(self.posts_total);
        if !pagination.has_next() {
            return false;
        }
        self.go_to_page(pagination.current + 1).await;
        true
    }

    /// Предыдущая страница, если она есть.
    pub async fn prev_page(&mut self) -> bool {
        let pagination = self.state.pagination(self.posts_total);
        if !pagination.has_prev() {
            return false;
        }
        self.go_to_page(pagination.current - 1).await;
        true
    }

    /// Клик по заголовку блога: на главную со сбросом фильтра.
    ///
    /// Если фрагмент уже `/`, события `hashchange` не будет, поэтому при активном
    /// фильтре список перезагружается сразу.
    pub async fn go_home(&mut self) {
        let changed = self.location.set_hash("/");
        if !changed && !self.state.current_category().is_empty() {
            let ticket = self.ticket.clone();
            self.show_post_list(&ticket).await;
        }
    }

    /// Вход. Токен сохраняется в сессии, затем переход на главную.
    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        let response = match self.api.auth().login(username, password).await {
            Ok(response) => response,
            Err(err) => {
                self.view
                    .show_form_error(FormKind::Login, &user_message(&err, LOGIN_FAILED));
                return false;
            }
        };

        let Some(token) = response.into_token() else {
            self.view.show_form_error(FormKind::Login, LOGIN_FAILED);
            return false;
        };
        if let Err(err) = self.session().set_token(&token) {
            warn!(error = %err, "failed to store token");
            self.view.show_form_error(FormKind::Login, LOGIN_FAILED);
            return false;
        }

        debug!(username, "logged in");
        self.view.close_dialogs();
        self.render_auth_status();
        self.location.set_hash("/");
        true
    }

    /// Регистрация. После успеха предлагает войти.
    pub async fn signup(&mut self, username: &str, email: &str, password: &str) -> bool {
        match self.api.auth().signup(username, email, password).await {
            Ok(_) => {
                self.view.notify(NoticeLevel::Success, SIGNUP_DONE);
                self.view.close_dialogs();
                self.view.show_login_prompt();
                true
            }
            Err(err) => {
                self.view
                    .show_form_error(FormKind::Signup, &user_message(&err, SIGNUP_FAILED));
                false
            }
        }
    }

    /// Выход: токен удаляется, переход на главную.
    pub fn logout(&mut self) {
        if let Err(err) = self.session().clear_token() {
            warn!(error = %err, "failed to clear token");
        }
        self.render_auth_status();
        self.location.set_hash("/");
        self.view.notify(NoticeLevel::Info, LOGGED_OUT);
    }

    /// Отправка формы поста: создание или PATCH, затем переход к посту.
    pub async fn submit_post_form(&mut self, input: NewPost) -> bool {
        let Some(mode) = self.form.clone() else {
            self.view.show_form_error(FormKind::Post, NO_ACTIVE_FORM);
            return false;
        };

        let payload = NewPost {
            title: input.title.trim().to_string(),
            content: input.content.trim().to_string(),
            category_name: input.category_name.trim().to_string(),
        };
        if payload.category_name.is_empty() {
            self.view.show_form_error(FormKind::Post, CATEGORY_REQUIRED);
            return false;
        }
        if payload.title.is_empty() || payload.content.is_empty() {
            self.view
                .show_form_error(FormKind::Post, TITLE_CONTENT_REQUIRED);
            return false;
        }
        if let Err(errors) = payload.validate() {
            self.view
                .show_form_error(FormKind::Post, validation_message(&errors));
            return false;
        }

        let saved = match &mode {
            FormMode::Create => self
                .api
                .posts()
                .create(&payload)
                .await
                .map(|post| post.id.to_string()),
            FormMode::Edit(id) => self
                .api
                .posts()
                .update(id, &PostPatch::from(payload))
                .await
                .map(|_| id.clone()),
        };

        match saved {
            Ok(id) => {
                self.form = None;
                self.location.set_hash(&Route::ViewPost(id).path());
                true
            }
            Err(err) => {
                self.view
                    .show_form_error(FormKind::Post, &user_message(&err, SAVE_FAILED));
                false
            }
        }
    }

    /// Удаление поста после подтверждения.
    pub async fn delete_post(&mut self, id: &str) -> bool {
        if !self.view.confirm(DELETE_CONFIRM) {
            return false;
        }

        match self.api.posts().delete(id).await {
            Ok(()) => {
                self.open_post = None;
                self.view.notify(NoticeLevel::Success, DELETED);
                self.location.set_hash("/");
                true
            }
            Err(err) => {
                warn!(error = %err, id, "failed to delete post");
                self.view.notify(NoticeLevel::Error, DELETE_FAILED);
                false
            }
        }
    }

    /// Отмена формы: шаг назад по истории.
    pub fn cancel_form(&mut self) {
        self.form = None;
        self.location.back();
    }

    fn render_auth_status(&mut self) {
        let status = AuthStatus::from_session(self.api.session());
        self.view.render_auth_status(&status);
    }

    async fn show_post_list(&mut self, ticket: &NavigationTicket) {
        self.ticket = ticket.clone();
        self.state.reset();
        self.form = None;
        self.open_post = None;

        self.load_category_counts().await;
        self.load_posts().await;
    }

    async fn show_post_detail(&mut self, ticket: &NavigationTicket, id: &str) {
        self.ticket = ticket.clone();
        self.form = None;
        self.open_post = None;

        let result = self.api.posts().get_by_id(id).await;
        if !ticket.is_current() {
            debug!(id, "dropping stale post detail");
            return;
        }

        match result {
            Ok(post) => {
                let color = self.state.category_color(&post.category.slug).to_string();
                let can_edit = self.session().can_edit(&post.author);
                if can_edit {
                    self.open_post = Some(id.to_string());
                }
                self.view.render_post_detail(&PostDetailView {
                    color_rgb: hex_to_rgb(&color),
                    color,
                    can_edit,
                    post,
                });
            }
            Err(err) => {
                warn!(error = %err, id, "failed to load post");
                self.view.render_post_detail_error(POST_LOAD_FAILED);
            }
        }
    }

    async fn show_post_form(&mut self, ticket: &NavigationTicket, mode: FormMode) {
        self.ticket = ticket.clone();
        self.form = None;
        self.open_post = None;

        if !self.session().is_authenticated() {
            self.view.notify(NoticeLevel::Warning, LOGIN_REQUIRED);
            self.view.show_login_prompt();
            return;
        }

        if self.state.categories().is_empty() {
            let result = self.api.categories().get_all().await;
            if !ticket.is_current() {
                return;
            }
            match result {
                Ok(categories) => self.state.set_categories_data(categories),
                Err(err) => warn!(error = %err, "failed to load categories for form"),
            }
        }

        let mut form = PostFormView {
            mode: mode.clone(),
            title: String::new(),
            content: String::new(),
            category_name: String::new(),
            category_suggestions: self
                .state
                .categories()
                .iter()
                .map(|category| category.name.clone())
                .collect(),
        };

        if let FormMode::Edit(id) = &mode {
            let result = self.api.posts().get_by_id(id).await;
            if !ticket.is_current() {
                return;
            }
            match result {
                Ok(post) => {
                    if !self.session().can_edit(&post.author) {
                        self.view.notify(NoticeLevel::Warning, AUTHOR_ONLY);
                        self.location
                            .set_hash(&Route::ViewPost(id.clone()).path());
                        return;
                    }
                    form.title = post.title;
                    form.content = post.content;
                    form.category_name = post.category.name;
                }
                Err(err) => {
                    warn!(error = %err, %id, "failed to load post for editing");
                    self.form = Some(mode);
                    self.view.render_post_form(&form);
                    self.view.show_form_error(FormKind::Post, POST_LOAD_FAILED);
                    return;
                }
            }
        }

        self.form = Some(mode);
        self.view.render_post_form(&form);
    }
}

fn validation_message(errors: &ValidationErrors) -> &'static str {
    let fields = errors.field_errors();
    if fields.contains_key("title") {
        TITLE_TOO_LONG
    } else if fields.contains_key("content") {
        CONTENT_TOO_LONG
    } else {
        CATEGORY_TOO_LONG
    }
}

#[async_trait]
impl<V: View> RouteHandler for BlogApp<V> {
    async fn root(&mut self, ticket: &NavigationTicket) {
        self.show_post_list(ticket).await;
    }

    async fn new_post(&mut self, ticket: &NavigationTicket) {
        self.show_post_form(ticket, FormMode::Create).await;
    }

    async fn view_post(&mut self, ticket: &NavigationTicket, id: &str) {
        self.show_post_detail(ticket, id).await;
    }

    async fn edit_post(&mut self, ticket: &NavigationTicket, id: &str) {
        self.show_post_form(ticket, FormMode::Edit(id.to_string()))
            .await;
    }

    fn on_navigate(&mut self, _path: &str) {
        self.render_auth_status();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::api::tests::FakeTransport;
    use crate::http_client::Method;
    use crate::router::Router;
    use crate::view::{CategoryTab, PostListPage};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Auth(AuthStatus),
        Tabs(Vec<CategoryTab>),
        List(PostListPage),
        ListError(String),
        Detail(Box<PostDetailView>),
        DetailError(String),
        Form(PostFormView),
        FormError(FormKind, String),
        LoginPrompt,
        CloseDialogs,
        Notice(NoticeLevel, String),
        Confirm(String),
    }

    #[derive(Debug, Default)]
    struct RecordingView {
        events: Vec<Event>,
        confirm_answer: bool,
    }

    impl RecordingView {
        fn notices(&self) -> Vec<(NoticeLevel, String)> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    Event::Notice(level, message) => Some((*level, message.clone())),
                    _ => None,
                })
                .collect()
        }

        fn last_list(&self) -> Option<&PostListPage> {
            self.events.iter().rev().find_map(|event| match event {
                Event::List(page) => Some(page),
                _ => None,
            })
        }
    }

    impl View for RecordingView {
        fn render_auth_status(&mut self, status: &AuthStatus) {
            self.events.push(Event::Auth(status.clone()));
        }
        fn render_category_tabs(&mut self, tabs: &[CategoryTab]) {
            self.events.push(Event::Tabs(tabs.to_vec()));
        }
        fn render_post_list(&mut self, page: &PostListPage) {
            self.events.push(Event::List(page.clone()));
        }
        fn render_post_list_error(&mut self, message: &str) {
            self.events.push(Event::ListError(message.to_string()));
        }
        fn render_post_detail(&mut self, detail: &PostDetailView) {
            self.events.push(Event::Detail(Box::new(detail.clone())));
        }
        fn render_post_detail_error(&mut self, message: &str) {
            self.events.push(Event::DetailError(message.to_string()));
        }
        fn render_post_form(&mut self, form: &PostFormView) {
            self.events.push(Event::Form(form.clone()));
        }
        fn show_form_error(&mut self, form: FormKind, message: &str) {
            self.events.push(Event::FormError(form, message.to_string()));
        }
        fn show_login_prompt(&mut self) {
            self.events.push(Event::LoginPrompt);
        }
        fn close_dialogs(&mut self) {
            self.events.push(Event::CloseDialogs);
        }
        fn notify(&mut self, level: NoticeLevel, message: &str) {
            self.events.push(Event::Notice(level, message.to_string()));
        }
        fn confirm(&mut self, question: &str) -> bool {
            self.events.push(Event::Confirm(question.to_string()));
            self.confirm_answer
        }
    }

    fn app(transport: &FakeTransport, location: &Location) -> BlogApp<RecordingView> {
        let api = Api::new(transport.clone(), Session::in_memory());
        BlogApp::new(api, location.clone(), RecordingView::default())
    }

    fn login_as(app: &BlogApp<RecordingView>, username: &str) {
        app.session()
            .set_token(&format!("session-token-for-{username}"))
            .expect("token");
    }

    fn summaries(count: i64, slug: &str) -> Value {
        Value::Array(
            (1..=count)
                .map(|id| {
                    json!({
                        "id": id,
                        "title": format!("post {id}"),
                        "author": "alice",
                        "excerpt": "...",
                        "category": { "slug": slug, "name": slug }
                    })
                })
                .collect(),
        )
    }

    fn detail(id: i64, author: &str) -> Value {
        json!({
            "id": id,
            "title": "Hello",
            "content": "Body",
            "author": author,
            "category": { "slug": "dev", "name": "Dev" }
        })
    }

    fn categories() -> Value {
        json!([
            { "slug": "dev", "name": "Dev", "color": "#3B82F6", "post_count": 3 },
            { "slug": "life", "name": "Life", "color": "#10B981", "post_count": 4 }
        ])
    }

    fn new_post(title: &str, content: &str, category: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: content.to_string(),
            category_name: category.to_string(),
        }
    }

    #[tokio::test]
    async fn root_loads_categories_then_posts() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(200, summaries(7, "dev"));
        let location = Location::new();
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);

        router.start(&mut app).await;

        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/blog/api/categories", "/blog/api/posts"]);
        assert_eq!(app.state().category_counts().get("all"), Some(&7));

        let page = app.view().last_list().expect("list rendered");
        assert_eq!(page.posts.len(), 5);
        assert_eq!(page.posts[0].color, "#3B82F6");
        assert_eq!(page.pagination.total_pages, 2);
        assert!(matches!(app.view().events.last(), Some(Event::Auth(_))));
    }

    #[tokio::test]
    async fn root_survives_category_failure() {
        let transport = FakeTransport::default();
        transport.fail_network().respond(200, summaries(1, "dev"));
        let location = Location::new();
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);

        router.start(&mut app).await;

        assert!(app.state().categories().is_empty());
        let page = app.view().last_list().expect("list rendered");
        assert_eq!(page.posts[0].color, crate::state::DEFAULT_CATEGORY_COLOR);
    }

    #[tokio::test]
    async fn root_reports_post_list_failure_inline() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(500, json!({ "detail": "db down" }));
        let location = Location::new();
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);

        router.start(&mut app).await;

        assert!(
            app.view()
                .events
                .contains(&Event::ListError(LIST_LOAD_FAILED.to_string()))
        );
        assert_eq!(
            app.view().notices(),
            vec![(NoticeLevel::Error, LIST_LOAD_FAILED.to_string())]
        );
    }

    #[tokio::test]
    async fn select_category_resets_page_and_filters() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(200, summaries(12, "dev"))
            .respond(200, summaries(12, "dev"))
            .respond(200, summaries(4, "life"));
        let location = Location::new();
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        router.start(&mut app).await;

        app.go_to_page(3).await;
        assert_eq!(app.view().last_list().expect("list").posts.len(), 2);

        app.select_category("life").await;
        assert_eq!(app.state().current_page(), 1);
        assert_eq!(app.state().current_category(), "life");

        let before = transport.requests().len();
        app.select_category("life").await;
        assert_eq!(transport.requests().len(), before);

        let last = transport.last_request();
        assert_eq!(
            last.query,
            vec![("category".to_string(), "life".to_string())]
        );
    }

    #[tokio::test]
    async fn next_and_prev_respect_bounds() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(200, summaries(6, "dev"))
            .respond(200, summaries(6, "dev"))
            .respond(200, summaries(6, "dev"));
        let location = Location::new();
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        router.start(&mut app).await;

        assert!(!app.prev_page().await);
        assert!(app.next_page().await);
        assert_eq!(app.state().current_page(), 2);
        assert!(!app.next_page().await);
        assert!(app.prev_page().await);
        assert_eq!(app.state().current_page(), 1);
    }

    #[tokio::test]
    async fn view_post_shows_edit_controls_only_to_author() {
        let transport = FakeTransport::default();
        transport
            .respond(200, detail(42, "alice"))
            .respond(200, detail(42, "alice"));
        let location = Location::with_hash("#/posts/42");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);

        router.start(&mut app).await;
        let anonymous = app.view().events.iter().find_map(|event| match event {
            Event::Detail(detail) => Some(detail.can_edit),
            _ => None,
        });
        assert_eq!(anonymous, Some(false));
        assert!(app.open_post().is_none());

        login_as(&app, "alice");
        router.navigate(&mut app).await;
        let owner = app.view().events.iter().rev().find_map(|event| match event {
            Event::Detail(detail) => Some(detail.can_edit),
            _ => None,
        });
        assert_eq!(owner, Some(true));
        assert_eq!(app.open_post(), Some("42"));
    }

    #[tokio::test]
    async fn view_post_reports_missing_post() {
        let transport = FakeTransport::default();
        transport.respond(404, json!({ "detail": "not found" }));
        let location = Location::with_hash("#/posts/9");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);

        router.start(&mut app).await;
        assert!(
            app.view()
                .events
                .contains(&Event::DetailError(POST_LOAD_FAILED.to_string()))
        );
    }

    #[tokio::test]
    async fn stale_detail_response_is_dropped() {
        let transport = FakeTransport::default();
        transport.respond(200, detail(1, "alice"));
        let location = Location::new();
        let mut app = app(&transport, &location);

        app.view_post(&NavigationTicket::superseded(), "1").await;

        assert_eq!(transport.requests().len(), 1);
        assert!(app.view().events.is_empty());
    }

    #[tokio::test]
    async fn new_post_requires_login() {
        let transport = FakeTransport::default();
        let location = Location::with_hash("#/posts/new");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);

        router.start(&mut app).await;

        assert!(transport.requests().is_empty());
        assert_eq!(
            app.view().notices(),
            vec![(NoticeLevel::Warning, LOGIN_REQUIRED.to_string())]
        );
        assert!(app.view().events.contains(&Event::LoginPrompt));
        assert!(app.active_form().is_none());
    }

    #[tokio::test]
    async fn stale_form_categories_are_dropped() {
        let transport = FakeTransport::default();
        transport.respond(200, categories());
        let location = Location::new();
        let mut app = app(&transport, &location);
        login_as(&app, "alice");

        app.new_post(&NavigationTicket::superseded()).await;

        assert_eq!(transport.requests().len(), 1);
        assert!(app.state().categories().is_empty());
        assert!(app.view().events.is_empty());
        assert!(app.active_form().is_none());
    }

    #[tokio::test]
    async fn edit_by_non_author_redirects_to_post() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(200, detail(5, "alice"));
        let location = Location::with_hash("#/posts/5/edit");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        login_as(&app, "mallory");

        router.start(&mut app).await;

        assert_eq!(location.fragment(), "/posts/5");
        assert!(location.has_pending_events());
        assert_eq!(
            app.view().notices(),
            vec![(NoticeLevel::Warning, AUTHOR_ONLY.to_string())]
        );
        assert!(app.active_form().is_none());
    }

    #[tokio::test]
    async fn edit_by_author_prefills_form_and_patches() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(200, detail(5, "alice"))
            .respond(200, detail(5, "alice"));
        let location = Location::with_hash("#/posts/5/edit");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        login_as(&app, "alice");

        router.start(&mut app).await;
        let form = app
            .view()
            .events
            .iter()
            .find_map(|event| match event {
                Event::Form(form) => Some(form.clone()),
                _ => None,
            })
            .expect("form rendered");
        assert_eq!(form.mode, FormMode::Edit("5".to_string()));
        assert_eq!(form.title, "Hello");
        assert_eq!(form.category_name, "Dev");
        assert_eq!(form.category_suggestions, vec!["Dev", "Life"]);

        let saved = app
            .submit_post_form(new_post(" New title ", "Body", "Dev"))
            .await;
        assert!(saved);

        let request = transport.last_request();
        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.path, "/blog/api/posts/5");
        assert_eq!(
            request.body,
            Some(json!({ "title": "New title", "content": "Body", "category_name": "Dev" }))
        );
        assert_eq!(location.fragment(), "/posts/5");
    }

    #[tokio::test]
    async fn submit_validates_before_sending() {
        let transport = FakeTransport::default();
        transport.respond(200, categories());
        let location = Location::with_hash("#/posts/new");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        login_as(&app, "alice");
        router.start(&mut app).await;
        let sent = transport.requests().len();

        assert!(!app.submit_post_form(new_post("t", "c", "  ")).await);
        assert!(!app.submit_post_form(new_post("", "c", "dev")).await);
        assert!(!app.submit_post_form(new_post(&"x".repeat(121), "c", "dev")).await);

        assert_eq!(transport.requests().len(), sent);
        let errors: Vec<Event> = app
            .view()
            .events
            .iter()
            .filter(|event| matches!(event, Event::FormError(..)))
            .cloned()
            .collect();
        assert_eq!(
            errors,
            vec![
                Event::FormError(FormKind::Post, CATEGORY_REQUIRED.to_string()),
                Event::FormError(FormKind::Post, TITLE_CONTENT_REQUIRED.to_string()),
                Event::FormError(FormKind::Post, TITLE_TOO_LONG.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn submit_shows_server_error_next_to_form() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(401, json!({ "detail": "Not authenticated" }));
        let location = Location::with_hash("#/posts/new");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        login_as(&app, "alice");
        router.start(&mut app).await;

        assert!(!app.submit_post_form(new_post("t", "c", "dev")).await);
        assert!(app.view().events.contains(&Event::FormError(
            FormKind::Post,
            "Not authenticated".to_string()
        )));
        assert!(app.active_form().is_some());
    }

    #[tokio::test]
    async fn login_create_logout_flow() {
        let transport = FakeTransport::default();
        transport.respond(200, json!({ "token": "session-token-for-alice" }));
        let location = Location::with_hash("#/posts/new");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        router.start(&mut app).await;

        assert!(app.login("alice", "pw").await);
        assert!(app.session().is_authenticated());
        assert_eq!(location.fragment(), "/");
        assert!(app.view().events.contains(&Event::CloseDialogs));

        transport.respond(200, categories());
        router.go("/posts/new");
        router.process_events(&mut app).await;
        assert_eq!(app.active_form(), Some(&FormMode::Create));

        transport.respond(201, detail(78, "alice"));
        assert!(app.submit_post_form(new_post("t", "c", "dev")).await);
        let create = transport.last_request();
        assert_eq!(create.method, Method::POST);
        assert_eq!(
            create.header("Authorization"),
            Some("Bearer session-token-for-alice")
        );
        assert_eq!(location.fragment(), "/posts/78");

        app.logout();
        assert!(!app.session().is_authenticated());
        assert_eq!(location.fragment(), "/");
        assert_eq!(
            app.view().notices().last(),
            Some(&(NoticeLevel::Info, LOGGED_OUT.to_string()))
        );
    }

    #[tokio::test]
    async fn login_errors_are_shown_inline() {
        let transport = FakeTransport::default();
        transport
            .respond(401, json!({ "error": "Invalid credentials" }))
            .fail_network()
            .respond(200, json!({}));
        let location = Location::new();
        let mut app = app(&transport, &location);

        assert!(!app.login("bob", "bad").await);
        assert!(!app.login("bob", "pw").await);
        assert!(!app.login("bob", "pw").await);

        let errors: Vec<Event> = app
            .view()
            .events
            .iter()
            .filter(|event| matches!(event, Event::FormError(..)))
            .cloned()
            .collect();
        assert_eq!(
            errors,
            vec![
                Event::FormError(FormKind::Login, "Invalid credentials".to_string()),
                Event::FormError(FormKind::Login, SERVER_UNREACHABLE.to_string()),
                Event::FormError(FormKind::Login, LOGIN_FAILED.to_string()),
            ]
        );
        assert!(!app.session().is_authenticated());
    }

    #[tokio::test]
    async fn signup_success_opens_login_prompt() {
        let transport = FakeTransport::default();
        transport
            .respond(201, json!({ "id": 1, "username": "bob" }))
            .respond(409, json!({ "detail": "Username already exists" }));
        let location = Location::new();
        let mut app = app(&transport, &location);

        assert!(app.signup("bob", "bob@example.com", "pw").await);
        assert!(app.view().events.contains(&Event::LoginPrompt));
        assert_eq!(
            app.view().notices(),
            vec![(NoticeLevel::Success, SIGNUP_DONE.to_string())]
        );

        assert!(!app.signup("bob", "bob@example.com", "pw").await);
        assert!(app.view().events.contains(&Event::FormError(
            FormKind::Signup,
            "Username already exists".to_string()
        )));
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let transport = FakeTransport::default();
        transport
            .respond(204, Value::Null)
            .respond(403, json!({ "detail": "Forbidden: not the author" }));
        let location = Location::with_hash("#/posts/3");
        let mut app = app(&transport, &location);
        login_as(&app, "alice");

        assert!(!app.delete_post("3").await);
        assert!(transport.requests().is_empty());

        app.view_mut().confirm_answer = true;
        assert!(app.delete_post("3").await);
        assert_eq!(transport.last_request().method, Method::DELETE);
        assert_eq!(location.fragment(), "/");

        assert!(!app.delete_post("3").await);
        assert_eq!(
            app.view().notices(),
            vec![
                (NoticeLevel::Success, DELETED.to_string()),
                (NoticeLevel::Error, DELETE_FAILED.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn go_home_reloads_filtered_list_when_already_at_root() {
        let transport = FakeTransport::default();
        transport
            .respond(200, categories())
            .respond(200, summaries(3, "dev"))
            .respond(200, summaries(1, "life"))
            .respond(200, categories())
            .respond(200, summaries(3, "dev"));
        let location = Location::with_hash("#/");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        router.start(&mut app).await;

        app.select_category("life").await;
        app.go_home().await;

        assert_eq!(app.state().current_category(), "");
        assert_eq!(transport.requests().len(), 5);
        assert!(transport.last_request().query.is_empty());
    }

    #[tokio::test]
    async fn cancel_form_goes_back_in_history() {
        let transport = FakeTransport::default();
        transport
            .respond(200, detail(4, "alice"))
            .respond(200, categories())
            .respond(200, detail(4, "alice"))
            .respond(200, detail(4, "alice"));
        let location = Location::with_hash("#/posts/4");
        let mut router = Router::new(location.clone());
        let mut app = app(&transport, &location);
        login_as(&app, "alice");
        router.start(&mut app).await;

        router.go("/posts/4/edit");
        router.process_events(&mut app).await;
        assert!(app.active_form().is_some());

        app.cancel_form();
        assert!(app.active_form().is_none());
        assert_eq!(location.fragment(), "/posts/4");
        assert_eq!(router.process_events(&mut app).await, 1);
        assert_eq!(app.open_post(), Some("4"));
    }

    #[test]
    fn user_message_maps_error_kinds() {
        assert_eq!(
            user_message(&ApiError::Network("refused".to_string()), "x"),
            SERVER_UNREACHABLE
        );
        assert_eq!(
            user_message(
                &ApiError::Http {
                    status: 400,
                    message: "bad".to_string()
                },
                "x"
            ),
            "bad"
        );
        assert_eq!(user_message(&ApiError::Decode("eof".to_string()), "x"), "x");
    }
}
