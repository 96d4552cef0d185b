use std::fmt::Display;
use std::io::{self, BufRead, Write};

use blog_client::view::{
    AuthStatus, CategoryTab, FormKind, FormMode, NoticeLevel, PostDetailView, PostFormView,
    PostListPage, View,
};
use tracing::warn;

/// Как отвечать на вопросы `confirm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    /// Спросить в stdin.
    Ask,
    /// Всегда "да" (`--yes`).
    AssumeYes,
}

/// Текстовое отображение страниц блога.
pub struct TerminalView<W> {
    out: W,
    confirm: ConfirmMode,
    last_form: Option<PostFormView>,
    failures: usize,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W, confirm: ConfirmMode) -> Self {
        Self {
            out,
            confirm,
            last_form: None,
            failures: 0,
        }
    }

    /// Последняя показанная форма поста: из неё берутся незаданные поля при отправке.
    pub fn last_form(&self) -> Option<&PostFormView> {
        self.last_form.as_ref()
    }

    /// Показывалась ли ошибка или предупреждение.
    pub fn had_failures(&self) -> bool {
        self.failures > 0
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl Display) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(error = %err, "failed to write output");
        }
    }
}

impl<W: Write + Send> View for TerminalView<W> {
    fn render_auth_status(&mut self, status: &AuthStatus) {
        let line = match (status.authenticated, status.username.is_empty()) {
            (false, _) => "[гость]".to_string(),
            (true, true) => "[вход выполнен]".to_string(),
            (true, false) => format!("[{}]", status.username),
        };
        self.line(line);
    }

    fn render_category_tabs(&mut self, tabs: &[CategoryTab]) {
        let rendered: Vec<String> = tabs
            .iter()
            .map(|tab| {
                let label = if tab.slug.is_empty() {
                    format!("{} ({})", tab.name, tab.count)
                } else {
                    format!("{} [{}] ({})", tab.name, tab.slug, tab.count)
                };
                if tab.active { format!("*{label}*") } else { label }
            })
            .collect();
        self.line(format!("Категории: {}", rendered.join("  ")));
    }

    fn render_post_list(&mut self, page: &PostListPage) {
        if page.posts.is_empty() {
            self.line("Постов нет.");
            return;
        }

        for card in &page.posts {
            self.line(format!(
                "#{}  {}  ({}, {})",
                card.id, card.title, card.author, card.category_name
            ));
            if !card.excerpt.is_empty() {
                self.line(format!("    {}", card.excerpt));
            }
        }

        let pagination = &page.pagination;
        if pagination.total_pages > 1 {
            let mut parts = Vec::new();
            if pagination.has_prev() {
                parts.push("«".to_string());
            }
            for number in pagination.pages() {
                if number == pagination.current {
                    parts.push(format!("[{number}]"));
                } else {
                    parts.push(number.to_string());
                }
            }
            if pagination.has_next() {
                parts.push("»".to_string());
            }
            self.line(format!(
                "Страница {} из {}: {}",
                pagination.current,
                pagination.total_pages,
                parts.join(" ")
            ));
        }
    }

    fn render_post_list_error(&mut self, message: &str) {
        self.failures += 1;
        self.line(message);
    }

    fn render_post_detail(&mut self, detail: &PostDetailView) {
        let post = &detail.post;
        self.line(format!("#{} {}", post.id, post.title));

        let mut meta = format!(
            "автор: {} | категория: {} ({})",
            post.author, post.category.name, detail.color
        );
        if let Some(created_at) = &post.created_at {
            meta.push_str(&format!(" | {created_at}"));
        }
        self.line(meta);
        self.line("");
        self.line(&post.content);

        if detail.can_edit {
            self.line("");
            self.line(format!(
                "Вы автор: edit -> go #/posts/{}/edit, удалить -> delete",
                post.id
            ));
        }
    }

    fn render_post_detail_error(&mut self, message: &str) {
        self.failures += 1;
        self.line(message);
    }

    fn render_post_form(&mut self, form: &PostFormView) {
        match &form.mode {
            FormMode::Create => self.line("Новый пост"),
            FormMode::Edit(id) => self.line(format!("Редактирование поста #{id}")),
        }
        self.line(format!("  заголовок: {}", form.title));
        self.line(format!("  категория: {}", form.category_name));
        self.line(format!("  содержимое: {}", form.content));
        if !form.category_suggestions.is_empty() {
            self.line(format!(
                "  категории: {}",
                form.category_suggestions.join(", ")
            ));
        }
        self.line("Отправить: submit --title .. --content .. --category ..; отмена: cancel");
        self.last_form = Some(form.clone());
    }

    fn show_form_error(&mut self, form: FormKind, message: &str) {
        let label = match form {
            FormKind::Login => "вход",
            FormKind::Signup => "регистрация",
            FormKind::Post => "пост",
        };
        self.failures += 1;
        self.line(format!("Ошибка ({label}): {message}"));
    }

    fn show_login_prompt(&mut self) {
        self.line("Войдите: login <username> <password>");
    }

    fn close_dialogs(&mut self) {
        self.last_form = None;
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        if matches!(level, NoticeLevel::Error | NoticeLevel::Warning) {
            self.failures += 1;
        }
        let tag = match level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "ошибка",
            NoticeLevel::Warning => "внимание",
            NoticeLevel::Info => "инфо",
        };
        self.line(format!("[{tag}] {message}"));
    }

    fn confirm(&mut self, question: &str) -> bool {
        if self.confirm == ConfirmMode::AssumeYes {
            return true;
        }

        if let Err(err) = write!(self.out, "{question} [y/N] ").and_then(|()| self.out.flush()) {
            warn!(error = %err, "failed to write prompt");
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes" | "д" | "да"),
            Err(err) => {
                warn!(error = %err, "failed to read confirmation");
                false
            }
        }
    }
}
