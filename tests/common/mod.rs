//! Common test utilities

use chrono::NaiveDate;
use onduty::scheduler::{Person, Roster};

/// Date in January 2024 (the 15th is a Monday)
pub fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// Roster with orders following the slice and the default shadow
pub fn roster(codes: &[&str]) -> Roster {
    let people = codes
        .iter()
        .enumerate()
        .map(|(order, code)| Person::new(order, *code).with_email(format!("{code}@example.com")))
        .collect();
    Roster::new(people, "xx").unwrap()
}

/// Reminder fixture person
#[allow(dead_code)]
pub fn person(code: &str) -> Person {
    Person::new(0, code)
        .with_email(format!("{code}@example.com"))
        .with_slack_id(code.to_string())
}
