//! Human-readable sentences for shift change notifications.
//!
//! ```text
//! * Your detail on Thursday, 31st March (10:00:00 - 11:00:00) has been added.
//! ```
//!
//! Everything here is a pure function of the change, the delivery channel
//! and the current date (only used to decide whether to print the year).

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::kinds::{Channel, NotifiableChange, ParentKind};
use crate::notification::ShiftChange;
use crate::types::LocalTimestamp;

/// Render a one-line description of `change` for delivery over `channel`.
pub fn render(change: &ShiftChange, channel: Channel, today: NaiveDate) -> String {
    let bullet = bullet_point(channel);
    let subject = subject_noun(change.parent_kind, change.activity_label.is_none());
    let date = date_phrase(change.window_start, today);
    let window = time_window(
        change.window_start,
        change.window_end,
        change.activity_label.as_deref(),
    );
    let action = change.change_kind.action_phrase();
    let trailing = trailing_clause(
        change.activity_label.as_deref(),
        channel,
        change.change_kind,
    );

    format!("{bullet}Your {subject} on {date} {window}has {action}{trailing}.")
}

/// Title line for a delivered batch, naming the oldest modification in it.
pub fn changes_since_title(earliest_modified: LocalTimestamp, today: NaiveDate) -> String {
    format!("Changes since {}", date_phrase(earliest_modified, today))
}

/// `Sunday, 3rd May`, with `, 2021` appended when the date falls in a
/// later year than `today`.
pub fn date_phrase(at: LocalTimestamp, today: NaiveDate) -> String {
    let day = at.day();
    let mut phrase = format!(
        "{}, {}{} {}",
        at.format("%A"),
        day,
        ordinal_suffix(day),
        at.format("%B")
    );
    if at.year() > today.year() {
        phrase.push_str(&format!(", {}", at.year()));
    }
    phrase
}

fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

// Email templates render markdown bullets; SMS and in-app do not.
fn bullet_point(channel: Channel) -> &'static str {
    match channel {
        Channel::Email => "* ",
        Channel::Sms | Channel::None => "",
    }
}

fn subject_noun(parent: ParentKind, shift_level: bool) -> &'static str {
    match (parent, shift_level) {
        (ParentKind::Shift, true) => "shift",
        (ParentKind::Shift, false) => "detail",
        (ParentKind::Overtime, true) => "overtime shift",
        (ParentKind::Overtime, false) => "overtime detail",
    }
}

/// Includes its own trailing space when non-empty.
fn time_window(start: LocalTimestamp, end: LocalTimestamp, activity: Option<&str>) -> String {
    if activity.is_none() {
        return String::new();
    }
    let (start, end) = (start.time(), end.time());
    if !is_midnight(start) && !is_midnight(end) {
        format!("({} - {}) ", start.format("%H:%M:%S"), end.format("%H:%M:%S"))
    } else if is_midnight(start) && is_midnight(end) {
        "(full day) ".to_string()
    } else {
        String::new()
    }
}

fn is_midnight(time: NaiveTime) -> bool {
    time.num_seconds_from_midnight() == 0 && time.nanosecond() == 0
}

fn trailing_clause(activity: Option<&str>, channel: Channel, change: NotifiableChange) -> String {
    match (channel, activity) {
        (Channel::None, Some(activity)) if !activity.is_empty() => match change {
            NotifiableChange::Add => format!(" as {activity}"),
            NotifiableChange::Edit => format!(" to {activity}"),
            NotifiableChange::Delete => format!(" (was {activity})"),
        },
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> LocalTimestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 5, 3).unwrap()
    }

    fn change(
        parent_kind: ParentKind,
        activity: Option<&str>,
        change_kind: NotifiableChange,
        start: LocalTimestamp,
        end: LocalTimestamp,
    ) -> ShiftChange {
        ShiftChange {
            user_id: "CSTRIFE".into(),
            shift_modified_at: at(2020, 5, 1, 12, 0, 0),
            window_start: start,
            window_end: end,
            activity_label: activity.map(str::to_string),
            parent_kind,
            change_kind,
        }
    }

    // -----------------------------------------------------------------------
    // Whole sentences
    // -----------------------------------------------------------------------

    #[test]
    fn shift_added_by_email() {
        let c = change(
            ParentKind::Shift,
            None,
            NotifiableChange::Add,
            at(2020, 5, 3, 0, 0, 0),
            at(2020, 5, 3, 23, 59, 59),
        );
        assert_eq!(
            render(&c, Channel::Email, today()),
            "* Your shift on Sunday, 3rd May has been added."
        );
    }

    #[test]
    fn next_year_shift_includes_year() {
        let c = change(
            ParentKind::Shift,
            None,
            NotifiableChange::Add,
            at(2021, 5, 3, 0, 0, 0),
            at(2021, 5, 3, 23, 59, 59),
        );
        assert_eq!(
            render(&c, Channel::Email, today()),
            "* Your shift on Monday, 3rd May, 2021 has been added."
        );
    }

    #[test]
    fn past_year_shift_omits_year() {
        let c = change(
            ParentKind::Shift,
            None,
            NotifiableChange::Delete,
            at(2019, 12, 25, 0, 0, 0),
            at(2019, 12, 25, 0, 0, 0),
        );
        assert_eq!(
            render(&c, Channel::Sms, today()),
            "Your shift on Wednesday, 25th December has been removed."
        );
    }

    #[test]
    fn timed_detail_by_sms() {
        let c = change(
            ParentKind::Shift,
            Some("Guard Duty"),
            NotifiableChange::Edit,
            at(2020, 5, 12, 9, 15, 0),
            at(2020, 5, 12, 17, 30, 45),
        );
        assert_eq!(
            render(&c, Channel::Sms, today()),
            "Your detail on Tuesday, 12th May (09:15:00 - 17:30:45) has changed."
        );
    }

    #[test]
    fn full_day_overtime_detail_in_app() {
        let c = change(
            ParentKind::Overtime,
            Some("Training"),
            NotifiableChange::Add,
            at(2020, 5, 21, 0, 0, 0),
            at(2020, 5, 22, 0, 0, 0),
        );
        assert_eq!(
            render(&c, Channel::None, today()),
            "Your overtime detail on Thursday, 21st May (full day) has been added as Training."
        );
    }

    #[test]
    fn half_midnight_window_renders_no_time() {
        let c = change(
            ParentKind::Overtime,
            Some("Escort"),
            NotifiableChange::Delete,
            at(2020, 5, 22, 0, 0, 0),
            at(2020, 5, 22, 14, 0, 0),
        );
        assert_eq!(
            render(&c, Channel::None, today()),
            "Your overtime detail on Friday, 22nd May has been removed (was Escort)."
        );
    }

    #[test]
    fn overtime_shift_edit() {
        let c = change(
            ParentKind::Overtime,
            None,
            NotifiableChange::Edit,
            at(2020, 5, 23, 7, 0, 0),
            at(2020, 5, 23, 19, 0, 0),
        );
        assert_eq!(
            render(&c, Channel::Email, today()),
            "* Your overtime shift on Saturday, 23rd May has changed."
        );
    }

    #[test]
    fn in_app_edit_names_new_activity() {
        let c = change(
            ParentKind::Shift,
            Some("Visits"),
            NotifiableChange::Edit,
            at(2020, 5, 11, 8, 0, 0),
            at(2020, 5, 11, 12, 0, 0),
        );
        assert_eq!(
            render(&c, Channel::None, today()),
            "Your detail on Monday, 11th May (08:00:00 - 12:00:00) has changed to Visits."
        );
    }

    #[test]
    fn email_never_carries_trailing_clause() {
        let c = change(
            ParentKind::Shift,
            Some("Visits"),
            NotifiableChange::Add,
            at(2020, 5, 11, 8, 0, 0),
            at(2020, 5, 11, 12, 0, 0),
        );
        assert!(render(&c, Channel::Email, today()).ends_with("has been added."));
    }

    // -----------------------------------------------------------------------
    // Fragments
    // -----------------------------------------------------------------------

    #[test]
    fn ordinals() {
        let expected = [
            (1, "st"),
            (2, "nd"),
            (3, "rd"),
            (4, "th"),
            (11, "th"),
            (12, "th"),
            (13, "th"),
            (21, "st"),
            (22, "nd"),
            (23, "rd"),
            (30, "th"),
            (31, "st"),
        ];
        for (day, suffix) in expected {
            assert_eq!(ordinal_suffix(day), suffix, "day {day}");
        }
    }

    #[test]
    fn title_names_earliest_modification() {
        assert_eq!(
            changes_since_title(at(2020, 5, 1, 16, 45, 0), today()),
            "Changes since Friday, 1st May"
        );
    }
}
