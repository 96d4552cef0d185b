//! Hash-роутер: разбор фрагмента URL, диспетчеризация и навигация без перезагрузки.
//!
//! Окружение вкладки моделируется [`Location`]: текущий фрагмент, история и
//! очередь событий `hashchange`. Событие ставится в очередь только если фрагмент
//! действительно изменился.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

const MAX_EVENTS_PER_DRAIN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Маршрут клиента.
pub enum Route {
    /// `/`: список постов.
    Root,
    /// `/posts/new`: форма создания.
    NewPost,
    /// `/posts/<id>`: просмотр поста.
    ViewPost(String),
    /// `/posts/<id>/edit`: форма редактирования.
    EditPost(String),
    /// Всё остальное.
    Unmatched(String),
}

impl Route {
    /// Сопоставляет путь с маршрутами; побеждает первое совпадение.
    pub fn resolve(path: &str) -> Self {
        let path = if path.is_empty() { "/" } else { path };
        if path == "/" {
            return Self::Root;
        }
        if path == "/posts/new" {
            return Self::NewPost;
        }
        if let Some(rest) = path.strip_prefix("/posts/") {
            if is_post_id(rest) {
                return Self::ViewPost(rest.to_string());
            }
            if let Some(id) = rest.strip_suffix("/edit") {
                if is_post_id(id) {
                    return Self::EditPost(id.to_string());
                }
            }
        }
        Self::Unmatched(path.to_string())
    }

    /// Путь маршрута для [`Router::go`].
    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".to_string(),
            Self::NewPost => "/posts/new".to_string(),
            Self::ViewPost(id) => format!("/posts/{id}"),
            Self::EditPost(id) => format!("/posts/{id}/edit"),
            Self::Unmatched(path) => path.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.path())
    }
}

fn is_post_id(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|byte| byte.is_ascii_digit())
}

#[derive(Debug)]
struct LocationInner {
    entries: Vec<String>,
    index: usize,
    pending: usize,
}

#[derive(Debug, Clone)]
/// Адресная строка вкладки: фрагмент, история и очередь событий `hashchange`.
pub struct Location {
    inner: Arc<Mutex<LocationInner>>,
}

impl Default for Location {
    fn default() -> Self {
        Self::new()
    }
}

impl Location {
    /// Пустой фрагмент, пустая история.
    pub fn new() -> Self {
        Self::with_hash("")
    }

    /// Вкладка, открытая сразу на фрагменте `hash` (с `#` или без).
    pub fn with_hash(hash: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LocationInner {
                entries: vec![strip_hash(hash).to_string()],
                index: 0,
                pending: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocationInner> {
        // Состояние не остаётся наполовину изменённым, поэтому отравление игнорируем.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Текущий фрагмент без `#`.
    pub fn fragment(&self) -> String {
        let inner = self.lock();
        inner.entries[inner.index].clone()
    }

    /// Меняет фрагмент. Событие появляется, только если фрагмент изменился.
    pub fn set_hash(&self, hash: &str) -> bool {
        let hash = strip_hash(hash);
        let mut inner = self.lock();
        if inner.entries[inner.index] == hash {
            return false;
        }

        let next = inner.index + 1;
        inner.entries.truncate(next);
        inner.entries.push(hash.to_string());
        inner.index = next;
        inner.pending += 1;
        true
    }

    /// Шаг назад по истории. `false`, если назад некуда.
    pub fn back(&self) -> bool {
        let mut inner = self.lock();
        if inner.index == 0 {
            return false;
        }
        inner.index -= 1;
        inner.pending += 1;
        true
    }

    /// Забирает следующее событие `hashchange`. `false`, если очередь пуста.
    ///
    /// Событие несёт только факт смены: навигация читает текущий фрагмент.
    pub fn take_event(&self) -> bool {
        let mut inner = self.lock();
        if inner.pending == 0 {
            return false;
        }
        inner.pending -= 1;
        true
    }

    /// Есть ли необработанные события.
    pub fn has_pending_events(&self) -> bool {
        self.lock().pending > 0
    }

    fn discard_events(&self) {
        self.lock().pending = 0;
    }
}

fn strip_hash(hash: &str) -> &str {
    hash.strip_prefix('#').unwrap_or(hash)
}

#[derive(Debug, Clone)]
/// Метка одной навигации.
///
/// Ответы, пришедшие после того, как началась следующая навигация, нужно
/// отбрасывать: `is_current()` для них вернёт `false`.
pub struct NavigationTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl NavigationTicket {
    /// Метка, которая всегда актуальна. Для действий вне навигации.
    pub fn detached() -> Self {
        Self {
            generation: 0,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    #[cfg(test)]
    pub(crate) fn superseded() -> Self {
        Self {
            generation: 1,
            latest: Arc::new(AtomicU64::new(2)),
        }
    }

    /// Номер навигации.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Не началась ли после этой навигации следующая.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

/// Обработчики маршрутов.
///
/// Методы по умолчанию ничего не делают: это соответствует незарегистрированному
/// маршруту. `fallback` вызывается для путей, не совпавших ни с одним маршрутом.
#[async_trait]
pub trait RouteHandler: Send {
    /// `/`.
    async fn root(&mut self, _ticket: &NavigationTicket) {}

    /// `/posts/new`.
    async fn new_post(&mut self, _ticket: &NavigationTicket) {}

    /// `/posts/<id>`.
    async fn view_post(&mut self, _ticket: &NavigationTicket, _id: &str) {}

    /// `/posts/<id>/edit`.
    async fn edit_post(&mut self, _ticket: &NavigationTicket, _id: &str) {}

    /// Путь не совпал ни с одним маршрутом.
    async fn fallback(&mut self, _ticket: &NavigationTicket, _path: &str) {}

    /// Вызывается после каждой навигации, совпал маршрут или нет.
    fn on_navigate(&mut self, _path: &str) {}
}

#[derive(Debug)]
/// Hash-роутер поверх [`Location`].
pub struct Router {
    location: Location,
    current_path: String,
    generation: Arc<AtomicU64>,
}

impl Router {
    /// Создаёт роутер для вкладки.
    pub fn new(location: Location) -> Self {
        Self {
            location,
            current_path: String::new(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Адресная строка, которой управляет роутер.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Путь последней навигации.
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Первая навигация по текущему фрагменту. Накопленные события отбрасываются.
    pub async fn start<H: RouteHandler + ?Sized>(&mut self, handler: &mut H) -> Route {
        self.location.discard_events();
        self.navigate(handler).await
    }

    /// Разбирает текущий фрагмент и вызывает подходящий обработчик.
    pub async fn navigate<H: RouteHandler + ?Sized>(&mut self, handler: &mut H) -> Route {
        let fragment = self.location.fragment();
        let path = if fragment.is_empty() {
            "/".to_string()
        } else {
            fragment
        };
        self.current_path = path.clone();

        let ticket = self.next_ticket();
        let route = Route::resolve(&path);
        debug!(%path, ?route, generation = ticket.generation, "navigate");

        match &route {
            Route::Root => handler.root(&ticket).await,
            Route::NewPost => handler.new_post(&ticket).await,
            Route::ViewPost(id) => handler.view_post(&ticket, id).await,
            Route::EditPost(id) => handler.edit_post(&ticket, id).await,
            Route::Unmatched(path) => handler.fallback(&ticket, path).await,
        }

        handler.on_navigate(&path);
        route
    }

    /// Обрабатывает накопленные события `hashchange` по одному.
    ///
    /// Возвращает количество выполненных навигаций.
    pub async fn process_events<H: RouteHandler + ?Sized>(&mut self, handler: &mut H) -> usize {
        let mut handled = 0;
        while self.location.take_event() {
            if handled == MAX_EVENTS_PER_DRAIN {
                warn!(handled, "too many chained navigations, dropping the rest");
                self.location.discard_events();
                break;
            }
            self.navigate(handler).await;
            handled += 1;
        }
        handled
    }

    /// Переход на `path`: меняет фрагмент, навигация произойдёт при обработке события.
    pub fn go(&self, path: &str) -> bool {
        self.location.set_hash(path)
    }

    /// Шаг назад по истории.
    pub fn back(&self) -> bool {
        self.location.back()
    }

    fn next_ticket(&self) -> NavigationTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        NavigationTicket {
            generation,
            latest: Arc::clone(&self.generation),
        }
    }
}
