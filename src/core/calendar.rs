use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::config::FirstWeekday;
use crate::models::Entry;

const MONDAY_FIRST: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const SUNDAY_FIRST: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub title: String,
    pub path: String,
}

/// 日历中的一天
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub date: String,
    pub count: usize,
    pub entries: Vec<CalendarEntry>,
    /// 有文章时指向按日归档
    pub url: Option<String>,
    pub today: bool,
}

/// 上一个或下一个有文章的月份
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthLink {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub url: String,
}

/// 某个月份的文章日历
#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub weekdays: Vec<&'static str>,
    /// 每周七天，不属于本月的位置为空
    pub weeks: Vec<Vec<Option<CalendarDay>>>,
    pub count: usize,
    pub previous_month: Option<MonthLink>,
    pub next_month: Option<MonthLink>,
}

impl CalendarMonth {
    /// 根据已发布文章生成日历，年月无效时返回 None
    pub fn build(
        entries: &[&Entry],
        year: i32,
        month: u32,
        first_weekday: FirstWeekday,
        today: NaiveDate,
        archive_root: &str,
    ) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next_first = first_of_next_month(first)?;
        let days_in_month = (next_first - first).num_days() as u32;

        let (offset, weekdays) = match first_weekday {
            FirstWeekday::Monday => (first.weekday().num_days_from_monday(), MONDAY_FIRST),
            FirstWeekday::Sunday => (first.weekday().num_days_from_sunday(), SUNDAY_FIRST),
        };

        let archive_root = archive_root.trim_end_matches('/');
        let mut cells: Vec<Option<CalendarDay>> = vec![None; offset as usize];
        let mut total = 0;
        for day in 1..=days_in_month {
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            let day_entries: Vec<CalendarEntry> = entries
                .iter()
                .filter(|e| e.date.date_naive() == date)
                .map(|e| CalendarEntry {
                    title: e.title.clone(),
                    path: e.path.clone(),
                })
                .collect();
            total += day_entries.len();
            cells.push(Some(CalendarDay {
                day,
                date: date.format("%Y-%m-%d").to_string(),
                count: day_entries.len(),
                url: (!day_entries.is_empty())
                    .then(|| format!("{}/{}/", archive_root, date.format("%Y/%m/%d"))),
                entries: day_entries,
                today: date == today,
            }));
        }
        while cells.len() % 7 != 0 {
            cells.push(None);
        }
        let weeks = cells.chunks(7).map(|w| w.to_vec()).collect();

        let previous_month = entries
            .iter()
            .map(|e| e.date.date_naive())
            .filter(|d| *d < first)
            .max()
            .map(|d| month_link(d, archive_root));
        let next_month = entries
            .iter()
            .map(|e| e.date.date_naive())
            .filter(|d| *d >= next_first)
            .min()
            .map(|d| month_link(d, archive_root));

        Some(Self {
            year,
            month,
            label: first.format("%B %Y").to_string(),
            weekdays: weekdays.to_vec(),
            weeks,
            count: total,
            previous_month,
            next_month,
        })
    }
}

fn first_of_next_month(first: NaiveDate) -> Option<NaiveDate> {
    if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
}

fn month_link(date: NaiveDate, archive_root: &str) -> MonthLink {
    MonthLink {
        year: date.year(),
        month: date.month(),
        label: date.format("%B %Y").to_string(),
        url: format!("{}/{}/", archive_root, date.format("%Y/%m")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(slug: &str, y: i32, m: u32, d: u32) -> Entry {
        Entry::new(slug, slug, Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_grid_layout_monday_first() {
        // 2024-02-01 是星期四
        let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let cal = CalendarMonth::build(&[], 2024, 2, FirstWeekday::Monday, today, "/archives").unwrap();
        assert_eq!(cal.label, "February 2024");
        assert_eq!(cal.weekdays[0], "Mon");
        assert!(cal.weeks[0][..3].iter().all(Option::is_none));
        assert_eq!(cal.weeks[0][3].as_ref().unwrap().day, 1);
        assert!(cal.weeks.iter().all(|w| w.len() == 7));
        let days: usize = cal.weeks.iter().flatten().filter(|d| d.is_some()).count();
        assert_eq!(days, 29);
        assert!(cal.weeks[1][5].as_ref().unwrap().today);
    }

    #[test]
    fn test_sunday_first_offset() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        // 2024-09-01 是星期日
        let cal = CalendarMonth::build(&[], 2024, 9, FirstWeekday::Sunday, today, "/archives").unwrap();
        assert_eq!(cal.weeks[0][0].as_ref().unwrap().day, 1);
    }

    #[test]
    fn test_days_and_navigation() {
        let entries = vec![
            entry("late", 2024, 5, 20),
            entry("a", 2024, 3, 5),
            entry("b", 2024, 3, 5),
            entry("early", 2023, 11, 2),
            entry("earliest", 2023, 1, 2),
        ];
        let refs: Vec<&Entry> = entries.iter().collect();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let cal = CalendarMonth::build(&refs, 2024, 3, FirstWeekday::Monday, today, "/archives/").unwrap();

        assert_eq!(cal.count, 2);
        let day5 = cal.weeks.iter().flatten().flatten().find(|d| d.day == 5).unwrap();
        assert_eq!(day5.count, 2);
        assert_eq!(day5.url.as_deref(), Some("/archives/2024/03/05/"));
        let day6 = cal.weeks.iter().flatten().flatten().find(|d| d.day == 6).unwrap();
        assert_eq!(day6.url, None);

        let previous = cal.previous_month.unwrap();
        assert_eq!((previous.year, previous.month), (2023, 11));
        assert_eq!(previous.url, "/archives/2023/11/");
        let next = cal.next_month.unwrap();
        assert_eq!((next.year, next.month), (2024, 5));
    }

    #[test]
    fn test_invalid_month() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(CalendarMonth::build(&[], 2024, 13, FirstWeekday::Monday, today, "/").is_none());
        assert!(CalendarMonth::build(&[], 2024, 12, FirstWeekday::Monday, today, "/").is_some());
    }
}
