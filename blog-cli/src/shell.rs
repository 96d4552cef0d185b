use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow};
use blog_client::models::NewPost;
use blog_client::view::PostFormView;
use blog_client::{Api, BlogApp, Location, Route, Router};
use clap::{Parser, Subcommand};
use tracing::debug;

use crate::terminal_view::{ConfirmMode, TerminalView};

/// Вкладка: роутер и приложение над одной адресной строкой.
pub struct Tab<W> {
    router: Router,
    app: BlogApp<TerminalView<W>>,
}

impl<W: Write + Send> Tab<W> {
    pub fn new(api: Api, hash: &str, view: TerminalView<W>) -> Self {
        let location = Location::with_hash(hash);
        Self {
            router: Router::new(location.clone()),
            app: BlogApp::new(api, location, view),
        }
    }

    pub fn app(&self) -> &BlogApp<TerminalView<W>> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut BlogApp<TerminalView<W>> {
        &mut self.app
    }

    pub fn fragment(&self) -> String {
        self.router.location().fragment()
    }

    /// Первая навигация и все переходы, которые она вызвала.
    pub async fn open(&mut self) -> Route {
        let route = self.router.start(&mut self.app).await;
        self.settle().await;
        route
    }

    /// Обрабатывает накопленные переходы.
    pub async fn settle(&mut self) -> usize {
        self.router.process_events(&mut self.app).await
    }

    pub fn go(&self, hash: &str) -> bool {
        self.router.go(hash)
    }

    pub fn back(&self) -> bool {
        self.router.back()
    }
}

/// Поля формы поста: заданные явно или взятые из последней показанной формы.
pub fn merge_form(
    form: Option<&PostFormView>,
    title: Option<String>,
    content: Option<String>,
    category: Option<String>,
) -> NewPost {
    NewPost {
        title: title
            .or_else(|| form.map(|form| form.title.clone()))
            .unwrap_or_default(),
        content: content
            .or_else(|| form.map(|form| form.content.clone()))
            .unwrap_or_default(),
        category_name: category
            .or_else(|| form.map(|form| form.category_name.clone()))
            .unwrap_or_default(),
    }
}

#[derive(Debug, Parser)]
#[command(
    no_binary_name = true,
    disable_version_flag = true,
    help_template = "{subcommands}"
)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum ShellCommand {
    /// Перейти по адресу, например `go #/posts/3`.
    Go { hash: String },
    /// Назад по истории.
    Back,
    /// Фильтр категории; без аргумента показываются все.
    Tab { slug: Option<String> },
    /// Страница списка.
    Page { number: u32 },
    /// Следующая страница.
    Next,
    /// Предыдущая страница.
    Prev,
    /// На главную со сбросом фильтра.
    Home,
    /// Вход.
    Login { username: String, password: String },
    /// Регистрация.
    Signup {
        username: String,
        email: String,
        password: String,
    },
    /// Выход.
    Logout,
    /// Отправить открытую форму поста.
    Submit {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Удалить открытый пост.
    Delete,
    /// Закрыть форму.
    Cancel,
    /// Выход из shell.
    #[command(alias = "exit")]
    Quit,
}

/// Делит строку на слова; двойные кавычки объединяют слова с пробелами.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_word = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_word = true;
            }
            ch if ch.is_whitespace() && !in_quotes => {
                if has_word {
                    words.push(std::mem::take(&mut current));
                    has_word = false;
                }
            }
            ch => {
                current.push(ch);
                has_word = true;
            }
        }
    }

    if in_quotes {
        return Err(anyhow!("незакрытая кавычка"));
    }
    if has_word {
        words.push(current);
    }
    Ok(words)
}

enum Flow {
    Continue,
    Quit,
}

/// Интерактивная вкладка: токен живёт только до выхода из shell.
pub async fn run(api: Api, hash: &str) -> Result<()> {
    let view = TerminalView::new(io::stdout(), ConfirmMode::Ask);
    let mut tab = Tab::new(api, hash, view);
    tab.open().await;

    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("#{}> ", tab.fragment());
        io::stdout().flush().context("не удалось вывести приглашение")?;

        input.clear();
        let read = stdin
            .lock()
            .read_line(&mut input)
            .context("не удалось прочитать команду")?;
        if read == 0 {
            println!();
            return Ok(());
        }

        let words = match split_line(&input) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        let command = match ShellLine::try_parse_from(words) {
            Ok(line) => line.command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        if let Flow::Quit = execute(&mut tab, command).await {
            return Ok(());
        }
        tab.settle().await;
    }
}

async fn execute<W: Write + Send>(tab: &mut Tab<W>, command: ShellCommand) -> Flow {
    debug!(?command, "shell command");
    match command {
        ShellCommand::Go { hash } => {
            tab.go(&hash);
        }
        ShellCommand::Back => {
            tab.back();
        }
        ShellCommand::Quit => return Flow::Quit,
        command => run_page_command(tab.app_mut(), command).await,
    }
    Flow::Continue
}

async fn run_page_command<W: Write + Send>(
    app: &mut BlogApp<TerminalView<W>>,
    command: ShellCommand,
) {
    match command {
        ShellCommand::Tab { slug } => app.select_category(slug.as_deref().unwrap_or("")).await,
        ShellCommand::Page { number } => app.go_to_page(number).await,
        ShellCommand::Next => {
            app.next_page().await;
        }
        ShellCommand::Prev => {
            app.prev_page().await;
        }
        ShellCommand::Home => app.go_home().await,
        ShellCommand::Login { username, password } => {
            app.login(&username, &password).await;
        }
        ShellCommand::Signup {
            username,
            email,
            password,
        } => {
            app.signup(&username, &email, &password).await;
        }
        ShellCommand::Logout => app.logout(),
        ShellCommand::Submit {
            title,
            content,
            category,
        } => {
            let post = merge_form(app.view().last_form(), title, content, category);
            app.submit_post_form(post).await;
        }
        ShellCommand::Delete => match app.open_post().map(str::to_string) {
            Some(id) => {
                app.delete_post(&id).await;
            }
            None => println!("Нет открытого поста, который можно удалить."),
        },
        ShellCommand::Cancel => app.cancel_form(),
        ShellCommand::Go { .. } | ShellCommand::Back | ShellCommand::Quit => {}
    }
}
