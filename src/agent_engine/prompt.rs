use chrono::{Datelike, NaiveDate, Weekday};

use crate::config::Lang;

const SYSTEM_CN: &str = include_str!("../../prompts/system_cn.md");
const SYSTEM_EN: &str = include_str!("../../prompts/system_en.md");

const SCREEN_INFO_HEADER: &str = "** Screen Info **";

/// System prompt for today's date in the local timezone.
pub fn system_prompt(lang: Lang) -> String {
    system_prompt_for_date(lang, chrono::Local::now().date_naive())
}

pub fn system_prompt_for_date(lang: Lang, date: NaiveDate) -> String {
    match lang {
        Lang::Cn => format!("今天的日期是: {}\n{}", format_date_cn(date), SYSTEM_CN),
        Lang::En => format!(
            "Today's date is: {}\n{}",
            date.format("%A, %B %-d, %Y"),
            SYSTEM_EN
        ),
    }
}

fn format_date_cn(date: NaiveDate) -> String {
    let weekday = match date.weekday() {
        Weekday::Mon => "星期一",
        Weekday::Tue => "星期二",
        Weekday::Wed => "星期三",
        Weekday::Thu => "星期四",
        Weekday::Fri => "星期五",
        Weekday::Sat => "星期六",
        Weekday::Sun => "星期日",
    };
    format!("{} {}", date.format("%Y年%m月%d日"), weekday)
}

/// Pretty JSON block describing the foreground app.
pub fn build_screen_info(current_app: &str) -> String {
    let info = serde_json::json!({ "current_app": current_app });
    serde_json::to_string_pretty(&info)
        .unwrap_or_else(|_| format!("{{\"current_app\": \"{current_app}\"}}"))
}

/// Text of a step's user turn; the first step also carries the task.
pub fn observation_text(task: Option<&str>, current_app: &str) -> String {
    let screen_info = build_screen_info(current_app);
    match task {
        Some(task) => format!("{task}\n\n{SCREEN_INFO_HEADER}\n\n{screen_info}"),
        None => format!("{SCREEN_INFO_HEADER}\n\n{screen_info}"),
    }
}
