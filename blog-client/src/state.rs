use std::collections::BTreeMap;

use crate::models::Category;

/// Количество постов на одной странице списка.
pub const POSTS_PER_PAGE: usize = 5;
/// Цвет категории, если он неизвестен.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";
/// RGB-компоненты цвета по умолчанию.
pub const DEFAULT_CATEGORY_RGB: &str = "107, 114, 128";
/// Ключ суммарного счётчика в `category_counts`.
pub const ALL_CATEGORIES_KEY: &str = "all";

const PAGE_BLOCK: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Состояние клиента: страница, фильтр категории и кэш категорий.
///
/// Передаётся обработчикам явно, глобального экземпляра нет.
pub struct AppState {
    current_page: u32,
    current_category: String,
    categories: Vec<Category>,
    category_counts: BTreeMap<String, u64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            current_page: 1,
            current_category: String::new(),
            categories: Vec::new(),
            category_counts: BTreeMap::new(),
        }
    }
}

impl AppState {
    /// Создаёт состояние: первая страница, все категории.
    pub fn new() -> Self {
        Self::default()
    }

    /// Текущая страница (всегда >= 1).
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Текущий фильтр категории, пустая строка означает "все".
    pub fn current_category(&self) -> &str {
        &self.current_category
    }

    /// Кэш категорий из последней загрузки.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Счётчики постов по slug плюс `all`.
    pub fn category_counts(&self) -> &BTreeMap<String, u64> {
        &self.category_counts
    }

    /// Выбирает категорию и сбрасывает страницу на первую.
    pub fn set_category(&mut self, slug: impl Into<String>) {
        self.current_category = slug.into();
        self.current_page = 1;
    }

    /// Устанавливает страницу. Верхняя граница не проверяется, `0` превращается в `1`.
    pub fn set_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    /// Полностью заменяет кэш категорий и пересчитывает счётчики.
    pub fn set_categories_data(&mut self, categories: Vec<Category>) {
        let mut counts: BTreeMap<String, u64> = categories
            .iter()
            .map(|category| (category.slug.clone(), category.post_count))
            .collect();
        let total = categories.iter().map(|category| category.post_count).sum();
        counts.insert(ALL_CATEGORIES_KEY.to_string(), total);

        self.categories = categories;
        self.category_counts = counts;
    }

    /// Цвет категории или [`DEFAULT_CATEGORY_COLOR`].
    pub fn category_color(&self, slug: &str) -> &str {
        self.categories
            .iter()
            .find(|category| category.slug == slug)
            .and_then(|category| category.color.as_deref())
            .filter(|color| !color.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_COLOR)
    }

    /// Возвращает первую страницу и фильтр "все". Кэш категорий не трогает.
    pub fn reset(&mut self) {
        self.current_page = 1;
        self.current_category.clear();
    }

    /// Срез полного списка, попадающий на текущую страницу.
    pub fn page_slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.current_page as usize - 1).saturating_mul(POSTS_PER_PAGE);
        if start >= items.len() {
            return &[];
        }
        let end = (start + POSTS_PER_PAGE).min(items.len());
        &items[start..end]
    }

    /// Параметры пагинации для списка из `total_items` элементов.
    pub fn pagination(&self, total_items: usize) -> Pagination {
        Pagination::new(self.current_page, total_items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Параметры блока пагинации: номера страниц выводятся блоками по 10.
pub struct Pagination {
    /// Текущая страница.
    pub current: u32,
    /// Всего страниц (0 для пустого списка).
    pub total_pages: u32,
    /// Первый номер в текущем блоке.
    pub first_shown: u32,
    /// Последний номер в текущем блоке (меньше `first_shown`, если страниц нет).
    pub last_shown: u32,
}

impl Pagination {
    /// Считает пагинацию для страницы `current` и `total_items` элементов.
    pub fn new(current: u32, total_items: usize) -> Self {
        let current = current.max(1);
        let total_pages = u32::try_from(total_items.div_ceil(POSTS_PER_PAGE)).unwrap_or(u32::MAX);
        let first_shown = (current - 1) / PAGE_BLOCK * PAGE_BLOCK + 1;
        let last_shown = first_shown.saturating_add(PAGE_BLOCK - 1).min(total_pages);

        Self {
            current,
            total_pages,
            first_shown,
            last_shown,
        }
    }

    /// Есть ли предыдущая страница.
    pub fn has_prev(&self) -> bool {
        self.current > 1
    }

    /// Есть ли следующая страница.
    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }

    /// Номера страниц текущего блока.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.first_shown..=self.last_shown
    }
}

/// `#RRGGBB` -> `"r, g, b"`; для некорректного цвета возвращает [`DEFAULT_CATEGORY_RGB`].
pub fn hex_to_rgb(color: &str) -> String {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return DEFAULT_CATEGORY_RGB.to_string();
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => format!("{r}, {g}, {b}"),
        _ => DEFAULT_CATEGORY_RGB.to_string(),
    }
}
