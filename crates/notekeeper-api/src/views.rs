//! Server-rendered HTML pages.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::FixedOffset;

use notekeeper_core::temporal::{format_date, format_datetime};
use notekeeper_core::{Account, Category, Note, Tag};

/// Escape text for safe embedding in HTML content and attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn layout(title: &str, account: Option<&Account>, body: &str) -> String {
    let nav = match account {
        Some(a) => format!(
            r#"<a href="/">Заметки</a> <a href="/notes/new/">Новая заметка</a> <a href="/notes/export/">Экспорт</a>
    <span class="user">{}</span>
    <form method="post" action="/accounts/logout/" class="inline"><button type="submit">Выйти</button></form>"#,
            html_escape(&a.display_name())
        ),
        None => r#"<a href="/accounts/login/">Войти</a> <a href="/accounts/register/">Регистрация</a> <a href="/auth/telegram/">Войти через Telegram</a>"#
            .to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title} | Notekeeper</title>
  <style>
    body {{ font-family: sans-serif; max-width: 52rem; margin: 0 auto; padding: 1rem; }}
    nav {{ display: flex; gap: 1rem; align-items: center; border-bottom: 1px solid #ddd; padding-bottom: .5rem; }}
    .inline {{ display: inline; }}
    .error {{ color: #b00020; }}
    .overdue {{ color: #b00020; }}
    .note {{ border-bottom: 1px solid #eee; padding: .5rem 0; }}
    .meta {{ color: #666; font-size: .9rem; }}
    label {{ display: block; margin-top: .75rem; }}
    input[type=text], input[type=password], input[type=date], textarea {{ width: 100%; }}
  </style>
</head>
<body>
  <nav>{nav}</nav>
  <main>
    <h1>{title}</h1>
{body}
  </main>
</body>
</html>
"#,
        title = html_escape(title),
        nav = nav,
        body = body,
    )
}

fn error_block(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"    <p class="error">{}</p>"#, html_escape(e)))
        .unwrap_or_default()
}

fn note_meta(note: &Note, offset: FixedOffset) -> String {
    let mut meta = format!("Создано: {}", format_datetime(note.created_at, offset));
    if let Some(deadline) = note.deadline {
        let class = if note.is_overdue() { " class=\"overdue\"" } else { "" };
        meta.push_str(&format!(
            " | <span{}>Срок: {}</span>",
            class,
            format_date(deadline, offset)
        ));
    }
    if let Some(category) = &note.category {
        meta.push_str(&format!(" | Категория: {}", html_escape(&category.name)));
    }
    if !note.tags.is_empty() {
        meta.push_str(&format!(" | Теги: {}", html_escape(&note.tag_names())));
    }
    meta
}

/// Note list with the account's categories and tags.
pub fn note_list(
    account: &Account,
    notes: &[Note],
    categories: &[Category],
    tags: &[Tag],
    offset: FixedOffset,
) -> String {
    let mut body = String::new();
    if notes.is_empty() {
        body.push_str(r#"    <p>У вас пока нет заметок. <a href="/notes/new/">Создать первую</a></p>"#);
        body.push('\n');
    }
    for note in notes {
        body.push_str(&format!(
            r#"    <div class="note"><a href="/notes/{}/">{}</a><div class="meta">{}</div></div>
"#,
            note.id,
            html_escape(&note.title),
            note_meta(note, offset)
        ));
    }
    let names = |items: Vec<&str>| {
        items
            .into_iter()
            .map(html_escape)
            .collect::<Vec<_>>()
            .join(", ")
    };
    if !categories.is_empty() {
        body.push_str(&format!(
            "    <p class=\"meta\">Категории: {}</p>\n",
            names(categories.iter().map(|c| c.name.as_str()).collect())
        ));
    }
    if !tags.is_empty() {
        body.push_str(&format!(
            "    <p class=\"meta\">Теги: {}</p>\n",
            names(tags.iter().map(|t| t.name.as_str()).collect())
        ));
    }
    layout("Мои заметки", Some(account), &body)
}

pub fn note_detail(account: &Account, note: &Note, offset: FixedOffset) -> String {
    let body = format!(
        r#"    <p class="meta">{meta}</p>
    <div class="content">{content}</div>
    <p><a href="/notes/{id}/edit/">Редактировать</a> <a href="/notes/{id}/delete/">Удалить</a></p>
"#,
        meta = note_meta(note, offset),
        content = html_escape(&note.content).replace('\n', "<br>"),
        id = note.id,
    );
    layout(&note.title, Some(account), &body)
}

/// Raw values of the note form, as typed by the user.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct NoteFormValues {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// `YYYY-MM-DD` or empty.
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub category: String,
    /// Comma-separated tag names.
    #[serde(default)]
    pub tags: String,
}

impl NoteFormValues {
    pub fn from_note(note: &Note, offset: FixedOffset) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            deadline: note
                .deadline
                .map(|d| format_date(d, offset))
                .unwrap_or_default(),
            category: note
                .category
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            tags: note.tag_names(),
        }
    }
}

pub fn note_form(
    account: &Account,
    heading: &str,
    action: &str,
    values: &NoteFormValues,
    error: Option<&str>,
) -> String {
    let body = format!(
        r#"{error}
    <form method="post" action="{action}">
      <label>Заголовок
        <input type="text" name="title" value="{title}" placeholder="Введите заголовок..." required maxlength="200">
      </label>
      <label>Содержание
        <textarea name="content" rows="8" placeholder="Введите текст заметки...">{content}</textarea>
      </label>
      <label>Срок выполнения
        <input type="date" name="deadline" value="{deadline}">
      </label>
      <label>Категория
        <input type="text" name="category" value="{category}">
      </label>
      <label>Теги
        <input type="text" name="tags" value="{tags}" placeholder="через запятую">
      </label>
      <p><button type="submit">Сохранить</button></p>
    </form>
"#,
        error = error_block(error),
        action = html_escape(action),
        title = html_escape(&values.title),
        content = html_escape(&values.content),
        deadline = html_escape(&values.deadline),
        category = html_escape(&values.category),
        tags = html_escape(&values.tags),
    );
    layout(heading, Some(account), &body)
}

pub fn confirm_delete(account: &Account, note: &Note) -> String {
    let body = format!(
        r#"    <p>Удалить заметку «{title}»?</p>
    <form method="post" action="/notes/{id}/delete/">
      <button type="submit">Удалить</button> <a href="/notes/{id}/">Отмена</a>
    </form>
"#,
        title = html_escape(&note.title),
        id = note.id,
    );
    layout("Удаление заметки", Some(account), &body)
}

pub fn login_form(error: Option<&str>, username: &str, next: &str) -> String {
    let body = format!(
        r#"{error}
    <form method="post" action="/accounts/login/">
      <input type="hidden" name="next" value="{next}">
      <label>Имя пользователя <input type="text" name="username" value="{username}" required></label>
      <label>Пароль <input type="password" name="password" required></label>
      <p><button type="submit">Войти</button></p>
    </form>
    <p><a href="/auth/telegram/">Войти через Telegram</a></p>
"#,
        error = error_block(error),
        next = html_escape(next),
        username = html_escape(username),
    );
    layout("Вход", None, &body)
}

pub fn register_form(error: Option<&str>, username: &str) -> String {
    let body = format!(
        r#"{error}
    <form method="post" action="/accounts/register/">
      <label>Имя пользователя <input type="text" name="username" value="{username}" required></label>
      <label>Пароль <input type="password" name="password1" required></label>
      <label>Подтверждение пароля <input type="password" name="password2" required></label>
      <p><button type="submit">Зарегистрироваться</button></p>
    </form>
"#,
        error = error_block(error),
        username = html_escape(username),
    );
    layout("Регистрация", None, &body)
}

/// Login page embedding the Telegram login widget.
///
/// The widget hands the signed profile to `onTelegramAuth`, which posts it
/// to the widget endpoint and follows the returned redirect.
pub fn telegram_login(bot_username: &str, error: Option<&str>) -> String {
    let body = format!(
        r#"{error}
    <p id="auth-error" class="error" hidden></p>
    <script async src="https://telegram.org/js/telegram-widget.js?22"
            data-telegram-login="{bot}"
            data-size="large"
            data-request-access="write"
            data-onauth="onTelegramAuth(user)"></script>
    <script>
      function onTelegramAuth(user) {{
        fetch("/auth/telegram/widget/", {{
          method: "POST",
          headers: {{ "Content-Type": "application/json" }},
          credentials: "same-origin",
          body: JSON.stringify(user)
        }})
          .then(function (r) {{ return r.json(); }})
          .then(function (data) {{
            if (data.status === "success") {{
              window.location.href = data.redirect_url;
            }} else {{
              var el = document.getElementById("auth-error");
              el.textContent = data.message || "Ошибка входа";
              el.hidden = false;
            }}
          }});
      }}
    </script>
    <p><a href="/accounts/login/">Войти по паролю</a></p>
"#,
        error = error_block(error),
        bot = html_escape(bot_username),
    );
    layout("Вход через Telegram", None, &body)
}

/// Full error page with the given status.
pub fn error_page(status: StatusCode, message: &str, account: Option<&Account>) -> Response {
    let body = format!(
        "    <p>{}</p>\n    <p><a href=\"/\">На главную</a></p>\n",
        html_escape(message)
    );
    let title = status.canonical_reason().unwrap_or("Error");
    (status, Html(layout(title, account, &body))).into_response()
}
