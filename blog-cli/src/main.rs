use std::io;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use blog_client::view::category_tabs;
use blog_client::{Api, FileTokenStore, NewPost, ReqwestTransport, Route, Session, View};
use clap::{Parser, Subcommand};

mod logging;
mod settings;
mod shell;
mod terminal_view;

use logging::init_logging;
use settings::Settings;
use shell::{Tab, merge_form};
use terminal_view::{ConfirmMode, TerminalView};

const TOKEN_FILE: &str = ".blog_token";

#[derive(Debug, Parser)]
#[command(name = "blog-cli", version, about = "CLI клиент блога")]
struct Cli {
    /// Адрес API (по умолчанию BLOG_API_URL или http://127.0.0.1:8080).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Вход пользователя.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Регистрация пользователя.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Выход: токен удаляется из .blog_token.
    Logout,
    /// Список постов (по 5 на странице).
    List {
        /// Slug категории.
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Пост по id.
    Show { id: u64 },
    /// Создание поста (требует токен).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Имя категории.
        #[arg(long)]
        category: String,
    },
    /// Обновление поста (требует токен автора).
    ///
    /// Незаданные поля остаются как были.
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Удаление поста (требует токен автора).
    Delete {
        id: u64,
        /// Не спрашивать подтверждение.
        #[arg(long)]
        yes: bool,
    },
    /// Категории и количество постов.
    Categories,
    /// Открыть адрес клиента, например `#/posts/3`.
    Open { hash: String },
    /// Интерактивная вкладка; токен хранится только в памяти.
    Shell {
        #[arg(default_value = "#/")]
        hash: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    match run().await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Ошибка: {err:#}");
            process::exit(1);
        }
    }
}

async fn run() -> Result<bool> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    init_logging(&settings.log_level)?;

    let server = normalize_server(cli.server.unwrap_or_else(|| settings.api_url.clone()));
    let transport = ReqwestTransport::with_timeouts(
        server,
        Duration::from_secs(settings.connect_timeout_secs),
        Duration::from_secs(settings.request_timeout_secs),
    )
    .context("не удалось создать HTTP-клиент")?;

    if let Command::Shell { hash } = &cli.command {
        let api = Api::new(transport, Session::in_memory())
            .with_signup_path(settings.signup_path.clone());
        shell::run(api, hash).await?;
        return Ok(true);
    }

    let session = Session::new(FileTokenStore::new(TOKEN_FILE));
    let api = Api::new(transport, session).with_signup_path(settings.signup_path);
    run_once(api, cli.command).await
}

/// Одна команда в отдельной вкладке. `false`, если была показана ошибка.
async fn run_once(api: Api, command: Command) -> Result<bool> {
    let confirm = match &command {
        Command::Delete { yes: true, .. } => ConfirmMode::AssumeYes,
        _ => ConfirmMode::Ask,
    };
    let view = TerminalView::new(io::stdout(), confirm);

    let tab = match command {
        Command::Login { username, password } => {
            let mut tab = Tab::new(api, "#/", view);
            tab.app_mut().login(&username, &password).await;
            tab
        }
        Command::Signup {
            username,
            email,
            password,
        } => {
            let mut tab = Tab::new(api, "#/", view);
            tab.app_mut().signup(&username, &email, &password).await;
            tab
        }
        Command::Logout => {
            let mut tab = Tab::new(api, "#/", view);
            tab.app_mut().logout();
            tab
        }
        Command::List { category, page } => {
            let mut tab = Tab::new(api, "#/", view);
            let app = tab.app_mut();
            app.state_mut().set_category(category.unwrap_or_default());
            app.state_mut().set_page(page);
            app.load_category_counts().await;
            app.load_posts().await;
            tab
        }
        Command::Show { id } => open(api, &Route::ViewPost(id.to_string()), view).await,
        Command::Create {
            title,
            content,
            category,
        } => {
            let mut tab = open(api, &Route::NewPost, view).await;
            if tab.app().active_form().is_none() {
                return Ok(false);
            }
            let post = NewPost {
                title,
                content,
                category_name: category,
            };
            tab.app_mut().submit_post_form(post).await;
            tab.settle().await;
            tab
        }
        Command::Update {
            id,
            title,
            content,
            category,
        } => {
            let mut tab = open(api, &Route::EditPost(id.to_string()), view).await;
            if tab.app().active_form().is_none() {
                return Ok(false);
            }
            let app = tab.app_mut();
            let post = merge_form(app.view().last_form(), title, content, category);
            app.submit_post_form(post).await;
            tab.settle().await;
            tab
        }
        Command::Delete { id, .. } => {
            let mut tab = Tab::new(api, &Route::ViewPost(id.to_string()).to_string(), view);
            tab.app_mut().delete_post(&id.to_string()).await;
            tab
        }
        Command::Categories => {
            let categories = api
                .categories()
                .get_all()
                .await
                .context("не удалось загрузить категории")?;
            let mut tab = Tab::new(api, "#/", view);
            let app = tab.app_mut();
            app.state_mut().set_categories_data(categories);
            let tabs = category_tabs(app.state());
            app.view_mut().render_category_tabs(&tabs);
            tab
        }
        Command::Open { hash } => {
            let mut tab = Tab::new(api, &hash, view);
            tab.open().await;
            tab
        }
        Command::Shell { .. } => return Ok(true),
    };

    Ok(!tab.app().view().had_failures())
}

async fn open(api: Api, route: &Route, view: TerminalView<io::Stdout>) -> Tab<io::Stdout> {
    let mut tab = Tab::new(api, &route.to_string(), view);
    tab.open().await;
    tab
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}
