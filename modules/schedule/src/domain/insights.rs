//! Dashboard statistics over one user's schedule.
//!
//! Everything here is pure: the same courses, exams and `today` always give
//! the same report. Stored values are not trusted to be well formed, so bad
//! times and dates degrade to neutral values instead of failing.

use chrono::{Days, NaiveDate};

use crate::contract::model::{Course, Exam, ExamKind, Mode, StatsReport, Weekday};

/// Days ahead of `today` (inclusive) that count as "upcoming".
pub const DEFAULT_UPCOMING_WINDOW_DAYS: u32 = 30;

/// Maximum number of conflict descriptions carried in a report.
pub const MAX_REPORTED_CONFLICTS: usize = 5;

/// Minutes since midnight for an `H:MM`/`HH:MM` string.
pub fn parse_minutes(t: &str) -> Option<u32> {
    let (h, m) = t.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

/// `max(0, end - start)` in minutes; zero when either side is malformed.
pub fn duration_minutes(start: &str, end: &str) -> u32 {
    match (parse_minutes(start), parse_minutes(end)) {
        (Some(s), Some(e)) => e.saturating_sub(s),
        _ => 0,
    }
}

/// Half-open overlap on the same day. Touching boundaries do not overlap.
pub fn courses_overlap(a: &Course, b: &Course) -> bool {
    if a.day != b.day {
        return false;
    }
    let spans = (
        parse_minutes(&a.start),
        parse_minutes(&a.end),
        parse_minutes(&b.start),
        parse_minutes(&b.end),
    );
    match spans {
        (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) => {
            a_start < b_end && b_start < a_end
        }
        _ => false,
    }
}

pub fn compute_schedule_insights(
    courses: &[Course],
    exams: &[Exam],
    today: NaiveDate,
) -> StatsReport {
    compute_schedule_insights_with_window(courses, exams, today, DEFAULT_UPCOMING_WINDOW_DAYS)
}

pub fn compute_schedule_insights_with_window(
    courses: &[Course],
    exams: &[Exam],
    today: NaiveDate,
    window_days: u32,
) -> StatsReport {
    let per_day_counts: Vec<(Weekday, usize)> = Weekday::ALL
        .into_iter()
        .map(|d| (d, courses.iter().filter(|c| c.day == d).count()))
        .collect();

    let per_mode_counts: Vec<(Mode, usize)> = Mode::ALL
        .into_iter()
        .map(|m| (m, courses.iter().filter(|c| c.mode == m).count()))
        .collect();

    let total_minutes: u64 = courses
        .iter()
        .map(|c| u64::from(duration_minutes(&c.start, &c.end)))
        .sum();
    let weekly_hours = round_one_decimal(total_minutes as f64 / 60.0);

    // First strictly greater count wins, so ties keep the earliest weekday.
    let mut busiest_day: Option<(Weekday, usize)> = None;
    for &(day, n) in &per_day_counts {
        let best = busiest_day.map_or(0, |(_, best)| best);
        if n > best {
            busiest_day = Some((day, n));
        }
    }

    let remote = courses.iter().filter(|c| c.mode == Mode::Remote).count();
    let remote_percentage = if courses.is_empty() {
        0
    } else {
        (remote as f64 * 100.0 / courses.len() as f64).round() as u32
    };

    let (conflicts, conflict_total) = detect_conflicts(courses);

    let window_end = today
        .checked_add_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MAX);
    let upcoming_exam_count = exams
        .iter()
        .filter_map(|e| NaiveDate::parse_from_str(e.date.trim(), "%Y-%m-%d").ok())
        .filter(|d| *d >= today && *d <= window_end)
        .count();

    let midterm_count = exams.iter().filter(|e| e.kind == ExamKind::Midterm).count();
    let final_count = exams.iter().filter(|e| e.kind == ExamKind::Final).count();

    let mut report = StatsReport {
        per_day_counts,
        per_mode_counts,
        weekly_hours,
        sessions_per_week: courses.len(),
        exam_count: exams.len(),
        midterm_count,
        final_count,
        upcoming_exam_count,
        busiest_day: busiest_day.map(|(d, _)| d),
        remote_percentage,
        conflicts,
        insights: Vec::new(),
    };
    report.insights = describe(&report, conflict_total, window_days);
    report
}

/// Pairs `i < j` in input order; returns the first few descriptions and the
/// total number of overlapping pairs.
fn detect_conflicts(courses: &[Course]) -> (Vec<String>, usize) {
    let mut described = Vec::new();
    let mut total = 0;
    for (i, a) in courses.iter().enumerate() {
        for b in &courses[i + 1..] {
            if courses_overlap(a, b) {
                total += 1;
                if described.len() < MAX_REPORTED_CONFLICTS {
                    described.push(format!(
                        "{} ({} {}-{}) overlaps with {} ({}-{})",
                        a.title, a.day, a.start, a.end, b.title, b.start, b.end
                    ));
                }
            }
        }
    }
    (described, total)
}

fn describe(report: &StatsReport, conflict_total: usize, window_days: u32) -> Vec<String> {
    let mut out = Vec::new();

    match report.busiest_day {
        Some(day) => {
            let n = report.day_count(day);
            out.push(format!(
                "{day} is your busiest day with {n} {}.",
                plural(n, "class", "classes")
            ));
            out.push(format!(
                "You spend {} hours in class each week across {} {}.",
                report.weekly_hours,
                report.sessions_per_week,
                plural(report.sessions_per_week, "session", "sessions")
            ));
            out.push(format!(
                "{}% of your classes are remote.",
                report.remote_percentage
            ));
        }
        None => out.push("No classes scheduled yet.".to_string()),
    }

    if conflict_total > 0 {
        out.push(format!(
            "{conflict_total} scheduling {} detected.",
            plural(conflict_total, "conflict", "conflicts")
        ));
    }

    if report.upcoming_exam_count > 0 {
        out.push(format!(
            "{} {} in the next {window_days} days.",
            report.upcoming_exam_count,
            plural(report.upcoming_exam_count, "exam", "exams")
        ));
    } else if report.exam_count > 0 {
        out.push(format!("No exams in the next {window_days} days."));
    }

    out
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn course(title: &str, day: Weekday, start: &str, end: &str, mode: Mode) -> Course {
        Course {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: title.to_string(),
            day,
            start: start.to_string(),
            end: end.to_string(),
            mode,
        }
    }

    fn exam(title: &str, kind: ExamKind, date: &str) -> Exam {
        Exam {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: title.to_string(),
            kind,
            date: date.to_string(),
            start: "09:00".to_string(),
            end: "11:00".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn minutes_parsing() {
        assert_eq!(parse_minutes("09:30"), Some(570));
        assert_eq!(parse_minutes("9:05"), Some(545));
        assert_eq!(parse_minutes(" 23:59 "), Some(1439));
        assert_eq!(parse_minutes("24:00"), None);
        assert_eq!(parse_minutes("10:7"), None);
        assert_eq!(parse_minutes("ten"), None);
        assert_eq!(parse_minutes(""), None);
    }

    #[test]
    fn durations_clamp_and_degrade() {
        assert_eq!(duration_minutes("09:00", "10:30"), 90);
        assert_eq!(duration_minutes("11:00", "10:00"), 0);
        assert_eq!(duration_minutes("xx", "10:00"), 0);
    }

    #[test]
    fn touching_sessions_do_not_conflict() {
        let a = course("A", Weekday::Monday, "09:00", "10:00", Mode::Onsite);
        let b = course("B", Weekday::Monday, "10:00", "11:00", Mode::Onsite);
        assert!(!courses_overlap(&a, &b));
        let c = course("C", Weekday::Monday, "09:00", "10:30", Mode::Onsite);
        assert!(courses_overlap(&c, &b));
        let d = course("D", Weekday::Tuesday, "09:00", "10:30", Mode::Onsite);
        assert!(!courses_overlap(&c, &d));
    }

    #[test]
    fn malformed_course_never_conflicts() {
        let a = course("A", Weekday::Monday, "nine", "10:00", Mode::Onsite);
        let b = course("B", Weekday::Monday, "09:00", "10:00", Mode::Onsite);
        assert!(!courses_overlap(&a, &b));
        assert!(!courses_overlap(&b, &a));
    }

    #[test]
    fn empty_schedule() {
        let r = compute_schedule_insights(&[], &[], today());
        assert_eq!(r.per_day_counts.len(), 7);
        assert!(r.per_day_counts.iter().all(|(_, n)| *n == 0));
        assert_eq!(r.mode_count(Mode::Onsite), 0);
        assert_eq!(r.mode_count(Mode::Remote), 0);
        assert_eq!(r.weekly_hours, 0.0);
        assert_eq!(r.busiest_day, None);
        assert_eq!(r.remote_percentage, 0);
        assert!(r.conflicts.is_empty());
        assert_eq!(r.insights, vec!["No classes scheduled yet.".to_string()]);
    }

    #[test]
    fn math_and_physics_overlap_on_sunday() {
        let courses = vec![
            course("Math", Weekday::Sunday, "09:00", "10:00", Mode::Onsite),
            course("Physics", Weekday::Sunday, "09:30", "10:30", Mode::Remote),
        ];
        let r = compute_schedule_insights(&courses, &[], today());
        assert_eq!(r.day_count(Weekday::Sunday), 2);
        assert_eq!(r.weekly_hours, 2.0);
        assert_eq!(r.remote_percentage, 50);
        assert_eq!(r.busiest_day, Some(Weekday::Sunday));
        assert_eq!(r.conflicts.len(), 1);
        assert!(r.conflicts[0].contains("Math"));
        assert!(r.conflicts[0].contains("Physics"));
        assert!(r
            .insights
            .iter()
            .any(|s| s == "1 scheduling conflict detected."));
    }

    #[test]
    fn busiest_day_ties_go_to_the_earlier_weekday() {
        let courses = vec![
            course("A", Weekday::Wednesday, "09:00", "10:00", Mode::Onsite),
            course("B", Weekday::Monday, "09:00", "10:00", Mode::Onsite),
        ];
        let r = compute_schedule_insights(&courses, &[], today());
        assert_eq!(r.busiest_day, Some(Weekday::Monday));
    }

    #[test]
    fn weekly_hours_round_to_one_decimal() {
        let courses = vec![course("A", Weekday::Monday, "09:00", "09:50", Mode::Onsite)];
        let r = compute_schedule_insights(&courses, &[], today());
        assert_eq!(r.weekly_hours, 0.8);
    }

    #[test]
    fn remote_percentage_rounds() {
        let courses = vec![
            course("A", Weekday::Monday, "09:00", "10:00", Mode::Remote),
            course("B", Weekday::Tuesday, "09:00", "10:00", Mode::Onsite),
            course("C", Weekday::Friday, "09:00", "10:00", Mode::Onsite),
        ];
        let r = compute_schedule_insights(&courses, &[], today());
        assert_eq!(r.remote_percentage, 33);
    }

    #[test]
    fn at_most_five_conflicts_are_described() {
        let courses: Vec<Course> = (0..4)
            .map(|i| course(&format!("C{i}"), Weekday::Monday, "09:00", "10:00", Mode::Onsite))
            .collect();
        let r = compute_schedule_insights(&courses, &[], today());
        assert_eq!(r.conflicts.len(), MAX_REPORTED_CONFLICTS);
        assert!(r.conflicts[0].starts_with("C0"));
        assert!(r.insights.iter().any(|s| s == "6 scheduling conflicts detected."));
    }

    #[test]
    fn upcoming_window_is_inclusive_and_skips_bad_dates() {
        let exams = vec![
            exam("Yesterday", ExamKind::Midterm, "2025-02-28"),
            exam("Today", ExamKind::Midterm, "2025-03-01"),
            exam("Edge", ExamKind::Final, "2025-03-31"),
            exam("Late", ExamKind::Final, "2025-04-01"),
            exam("Garbage", ExamKind::Final, "someday"),
        ];
        let r = compute_schedule_insights(&[], &exams, today());
        assert_eq!(r.upcoming_exam_count, 2);
        assert_eq!(r.exam_count, 5);
        assert_eq!(r.midterm_count, 2);
        assert_eq!(r.final_count, 3);
        assert!(r.insights.iter().any(|s| s == "2 exams in the next 30 days."));
    }

    #[test]
    fn custom_window() {
        let exams = vec![exam("Soon", ExamKind::Final, "2025-03-05")];
        let r = compute_schedule_insights_with_window(&[], &exams, today(), 2);
        assert_eq!(r.upcoming_exam_count, 0);
        assert!(r.insights.iter().any(|s| s == "No exams in the next 2 days."));
    }

    #[test]
    fn window_past_the_calendar_end_is_clamped() {
        let exams = vec![
            exam("Soon", ExamKind::Final, "2025-03-05"),
            exam("Far", ExamKind::Midterm, "9999-12-31"),
            exam("Past", ExamKind::Midterm, "2024-12-31"),
        ];
        let r = compute_schedule_insights_with_window(&[], &exams, today(), u32::MAX);
        assert_eq!(r.upcoming_exam_count, 2);
    }

    fn arb_time() -> impl Strategy<Value = String> {
        prop_oneof![
            9 => (0u32..24, 0u32..60).prop_map(|(h, m)| format!("{h:02}:{m:02}")),
            1 => Just("bad".to_string()),
        ]
    }

    fn arb_course() -> impl Strategy<Value = Course> {
        (0usize..7, arb_time(), arb_time(), any::<bool>()).prop_map(|(d, s, e, remote)| {
            let mode = if remote { Mode::Remote } else { Mode::Onsite };
            course("P", Weekday::ALL[d], &s, &e, mode)
        })
    }

    proptest! {
        #[test]
        fn weekly_hours_ignore_order(mut courses in prop::collection::vec(arb_course(), 0..12)) {
            let before = compute_schedule_insights(&courses, &[], today());
            courses.reverse();
            let after = compute_schedule_insights(&courses, &[], today());
            prop_assert_eq!(before.weekly_hours, after.weekly_hours);
            prop_assert_eq!(before.per_day_counts, after.per_day_counts);
            prop_assert_eq!(before.remote_percentage, after.remote_percentage);
        }

        #[test]
        fn overlap_is_symmetric_and_irreflexive(a in arb_course(), b in arb_course()) {
            prop_assert_eq!(courses_overlap(&a, &b), courses_overlap(&b, &a));
            let single = compute_schedule_insights(std::slice::from_ref(&a), &[], today());
            prop_assert!(single.conflicts.is_empty());
        }

        #[test]
        fn each_pair_reported_once(a in arb_course(), b in arb_course()) {
            let r = compute_schedule_insights(&[a.clone(), b.clone()], &[], today());
            let expected = usize::from(courses_overlap(&a, &b));
            prop_assert_eq!(r.conflicts.len(), expected);
        }

        #[test]
        fn duration_never_negative(s in arb_time(), e in arb_time()) {
            let d = duration_minutes(&s, &e);
            match (parse_minutes(&s), parse_minutes(&e)) {
                (Some(s), Some(e)) => prop_assert_eq!(d, e.saturating_sub(s)),
                _ => prop_assert_eq!(d, 0),
            }
        }
    }
}
