// Dweve Bulkload - Streaming Bulk-Insertion Benchmark Engine
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Property tests for the date normalizer.

use bulkload_core::date::{format_rfc3339, normalize, validate, DateShape};
use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (1970i32..2099, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day <= 28 is always valid"))
}

fn expected(date: NaiveDate) -> String {
    format_rfc3339(&Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()))
}

proptest! {
    #[test]
    fn iso_dates_normalize_to_midnight_utc(date in any_date()) {
        let text = date.format("%Y-%m-%d").to_string();
        prop_assert_eq!(normalize(&text).unwrap(), Some(expected(date)));
    }

    #[test]
    fn us_slash_dates_normalize(date in any_date()) {
        let text = date.format("%m/%d/%Y").to_string();
        prop_assert_eq!(normalize(&text).unwrap(), Some(expected(date)));
    }

    #[test]
    fn european_dates_with_unambiguous_day_normalize(date in any_date()) {
        prop_assume!(date.day() > 12);
        let text = date.format("%d/%m/%Y").to_string();
        let parsed = validate(&text).unwrap().unwrap();
        prop_assert_eq!(parsed.shape, DateShape::EuropeanSlash);
        prop_assert_eq!(parsed.to_rfc3339(), expected(date));
    }

    #[test]
    fn long_month_dates_normalize(date in any_date()) {
        let text = date.format("%B %d, %Y").to_string();
        prop_assert_eq!(normalize(&text).unwrap(), Some(expected(date)));
    }

    #[test]
    fn epoch_seconds_normalize(secs in 0i64..4_102_444_800) {
        let instant = Utc.timestamp_opt(secs, 0).unwrap();
        prop_assert_eq!(normalize(&secs.to_string()).unwrap(), Some(format_rfc3339(&instant)));
    }

    #[test]
    fn output_is_always_rfc3339_utc(text in "\\PC{0,24}") {
        if let Ok(Some(date)) = validate(&text) {
            let rendered = date.to_rfc3339();
            prop_assert!(rendered.ends_with('Z'));
            prop_assert!(chrono::DateTime::parse_from_rfc3339(&rendered).is_ok());
        }
    }
}

#[test]
fn test_ambiguous_dates_prefer_month_first() {
    let parsed = validate("02/03/2021").unwrap().unwrap();
    assert_eq!(parsed.shape, DateShape::UsSlash);
    assert_eq!(parsed.instant.month(), 2);
    assert_eq!(parsed.instant.day(), 3);
}
