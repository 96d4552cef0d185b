//! Клиентская часть блога: REST API, сессия, роутер и контроллеры страниц.
//!
//! Библиотека не знает, как рисуется интерфейс. Контроллеры ([`BlogApp`]) готовят
//! модели для вывода и передают их в реализацию [`View`]; браузерная вкладка
//! моделируется [`Location`], а переходы обрабатывает hash-[`Router`].
//!
//! JWT хранится в [`Session`] поверх [`TokenStore`] и автоматически подставляется
//! в защищённые запросы.
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod controller;
pub mod error;
pub mod http_client;
pub mod models;
pub mod router;
pub mod state;
pub mod view;

pub use api::Api;
pub use auth::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use controller::BlogApp;
pub use error::{ApiError, ApiResult};
pub use http_client::{HttpTransport, ReqwestTransport};
pub use models::{Category, NewPost, PostDetail, PostPatch, PostSummary};
pub use router::{Location, Route, RouteHandler, Router};
pub use state::AppState;
pub use view::View;
