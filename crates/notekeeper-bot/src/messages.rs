//! Reply texts.

use chrono::{DateTime, FixedOffset, Utc};

use notekeeper_core::temporal::{format_date, format_datetime};
use notekeeper_core::Note;

pub const HELP: &str = "Доступные команды:
/start - Начать работу с ботом
/help - Показать это сообщение
/web_login - Получить ссылку для входа в веб-интерфейс
/new - Создать новую заметку
/recent - Показать последние 5 заметок
/search [текст] - Поиск заметок
/set_reminder [ID] [дата] - Установить напоминание";

pub const APOLOGY: &str =
    "Произошла ошибка. Пожалуйста, попробуйте еще раз или обратитесь к администратору.";

pub const NEED_START: &str =
    "Я вас пока не знаю. Отправьте /start, чтобы начать работу с ботом.";

pub const UNKNOWN_COMMAND: &str = "Неизвестная команда. Используйте /help для списка команд.";

pub const NO_NOTES: &str = "У вас пока нет заметок.";
pub const NOTHING_FOUND: &str = "Ничего не найдено.";
pub const SEARCH_USAGE: &str = "Пожалуйста, укажите текст для поиска: /search [текст]";

pub const REMINDER_USAGE: &str =
    "Использование: /set_reminder [ID заметки] [дата в формате ГГГГ-ММ-ДД]";
pub const NOTE_NOT_FOUND: &str = "Заметка не найдена.";
pub const BAD_DATE: &str = "Неверный формат даты. Используйте ГГГГ-ММ-ДД.";

pub const ASK_TITLE: &str = "Введите заголовок заметки:";
pub const ASK_CONTENT: &str = "Введите текст заметки:";

pub fn greeting(first_name: &str, created: bool) -> String {
    let opener = if created {
        format!(
            "Привет, {}! Я бот для управления заметками.",
            first_name
        )
    } else {
        format!("С возвращением, {}! Чем могу помочь?", first_name)
    };
    format!(
        "{}\nИспользуй /help для списка команд.\nДля доступа к веб-интерфейсу используй /web_login",
        opener
    )
}

pub fn note_created(title: &str) -> String {
    format!("Заметка '{}' успешно создана!", title)
}

pub fn bad_title(reason: &str) -> String {
    format!("{}. Введите заголовок заметки:", reason.trim_end_matches('.'))
}

pub fn reminder_set(title: &str, date: &str) -> String {
    format!("Напоминание для заметки '{}' установлено на {}", title, date)
}

/// HTML message with the one-click web login link.
pub fn web_login(url: &str) -> String {
    format!(
        "🔐 <b>Ссылка для входа в веб-интерфейс:</b>\n<a href='{}'>Нажмите здесь</a>\n\n⚠️ Ссылка действительна 5 минут",
        url.replace('&', "&amp;").replace('\'', "%27")
    )
}

fn tags_line(note: &Note) -> String {
    if note.tags.is_empty() {
        String::new()
    } else {
        format!("Теги: {}\n", note.tag_names())
    }
}

/// `/recent` listing: creation time, deadline status, and tags.
pub fn recent(notes: &[Note], now: DateTime<Utc>, offset: FixedOffset) -> String {
    if notes.is_empty() {
        return NO_NOTES.to_string();
    }
    let mut out = String::from("Последние 5 заметок:\n\n");
    for note in notes {
        out.push_str(&format!("*{}*\n", note.title));
        out.push_str(&format!(
            "Создано: {}\n",
            format_datetime(note.created_at, offset)
        ));
        if let Some(deadline) = note.deadline {
            let status = if note.is_overdue_at(now) {
                "⚠️ ПРОСРОЧЕНО"
            } else {
                "✅ Активно"
            };
            out.push_str(&format!(
                "Срок: {} {}\n",
                format_date(deadline, offset),
                status
            ));
        }
        out.push_str(&tags_line(note));
        out.push('\n');
    }
    out
}

/// `/search` results: creation time, category, and tags.
pub fn search_results(query: &str, notes: &[Note], offset: FixedOffset) -> String {
    if notes.is_empty() {
        return NOTHING_FOUND.to_string();
    }
    let mut out = format!("Результаты поиска по запросу '{}':\n\n", query);
    for note in notes {
        out.push_str(&format!("*{}*\n", note.title));
        out.push_str(&format!(
            "Создано: {}\n",
            format_datetime(note.created_at, offset)
        ));
        if let Some(category) = &note.category {
            out.push_str(&format!("Категория: {}\n", category.name));
        }
        out.push_str(&tags_line(note));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use notekeeper_core::temporal::offset_from_hours;
    use notekeeper_core::{Category, Tag};

    fn note(title: &str, deadline: Option<DateTime<Utc>>) -> Note {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        Note {
            id: 1,
            title: title.to_string(),
            content: String::new(),
            created_at: created,
            updated_at: created,
            deadline,
            category: None,
            tags: vec![],
        }
    }

    #[test]
    fn test_recent_marks_deadline_status() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let mut tagged = note("Later", Some(now + Duration::days(5)));
        tagged.tags = vec![Tag {
            id: 1,
            name: "work".to_string(),
        }];
        let notes = vec![note("Late", Some(now - Duration::days(1))), tagged];

        let text = recent(&notes, now, offset_from_hours(3));
        assert!(text.starts_with("Последние 5 заметок:\n\n*Late*\nСоздано: 2026-03-01 12:30\n"));
        assert!(text.contains("Срок: 2026-03-09 ⚠️ ПРОСРОЧЕНО\n"));
        assert!(text.contains("Срок: 2026-03-15 ✅ Активно\nТеги: work\n"));
    }

    #[test]
    fn test_empty_listings() {
        let offset = offset_from_hours(3);
        assert_eq!(recent(&[], Utc::now(), offset), NO_NOTES);
        assert_eq!(search_results("foo", &[], offset), NOTHING_FOUND);
    }

    #[test]
    fn test_search_results_show_category() {
        let mut n = note("Trip", None);
        n.category = Some(Category {
            id: 1,
            name: "Travel".to_string(),
        });
        let text = search_results("trip", &[n], offset_from_hours(3));
        assert!(text.starts_with("Результаты поиска по запросу 'trip':\n\n*Trip*\n"));
        assert!(text.contains("Категория: Travel\n"));
    }

    #[test]
    fn test_web_login_escapes_url() {
        let text = web_login("http://x/auth/telegram/link?telegram_id=1&timestamp=2&token=ab");
        assert!(text.contains("<a href='http://x/auth/telegram/link?telegram_id=1&amp;timestamp=2&amp;token=ab'>"));
        assert!(text.ends_with("⚠️ Ссылка действительна 5 минут"));
    }

    #[test]
    fn test_greeting_differs_for_new_users() {
        assert!(greeting("Ann", true).starts_with("Привет, Ann!"));
        assert!(greeting("Ann", false).starts_with("С возвращением, Ann!"));
    }
}
