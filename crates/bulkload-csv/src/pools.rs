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

//! Finite value pools for synthetic cells.
//!
//! Pools are drawn once per dataset (with the dataset's RNG, so seeded runs
//! are reproducible) and every cell then picks uniformly from its pool.
//! Dates are rendered in one of several accepted text shapes so that the
//! parser exercises the normalizer on realistic, mixed input.

use bulkload_core::Column;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName};
use fake::faker::company::en::{CompanyName, Profession};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;

/// Entries drawn per faker-backed pool.
const POOL_SIZE: usize = 64;

const GENDERS: &[&str] = &["female", "male", "non-binary", "undisclosed"];
const ETHNICITIES: &[&str] = &[
    "Asian",
    "Black",
    "Hispanic",
    "White",
    "Native American",
    "Pacific Islander",
    "Two or more",
    "Undisclosed",
];
const MARITAL_STATUSES: &[&str] = &["single", "married", "divorced", "widowed", "partnered"];
const COUNTRIES: &[&str] = &[
    "United States",
    "Canada",
    "Netherlands",
    "Germany",
    "United Kingdom",
    "Ireland",
];
const DEPARTMENTS: &[&str] = &[
    "Engineering",
    "Finance",
    "Human Resources",
    "Legal",
    "Marketing",
    "Operations",
    "Sales",
    "Support",
];
const EMPLOYMENT_TYPES: &[&str] = &["full-time", "part-time", "contractor", "intern", "temporary"];
const EDUCATION_LEVELS: &[&str] = &[
    "High School",
    "Associate",
    "Bachelor",
    "Master",
    "Doctorate",
];

/// Text shapes used for generated date cells.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y-%m-%dT%H:%M:%SZ",
    "%B %d, %Y",
    "%a, %d %b %Y %H:%M:%S GMT",
];

/// Generated dates fall in 1975-01-01 + 50 years; epoch renderings stay nine digits or more.
const DATE_SPAN_DAYS: i64 = 50 * 365;

/// Per-dataset value pools.
#[derive(Debug, Clone)]
pub struct ValuePools {
    first_names: Vec<String>,
    last_names: Vec<String>,
    full_names: Vec<String>,
    emails: Vec<String>,
    phones: Vec<String>,
    streets: Vec<String>,
    cities: Vec<String>,
    states: Vec<String>,
    employers: Vec<String>,
    job_titles: Vec<String>,
    date_origin: NaiveDateTime,
}

fn draw<R: Rng, F: FnMut(&mut R) -> String>(rng: &mut R, mut f: F) -> Vec<String> {
    (0..POOL_SIZE).map(|_| f(rng)).collect()
}

fn pick<'a, R: Rng>(rng: &mut R, pool: &'a [String]) -> &'a str {
    pool.choose(rng).map(String::as_str).unwrap_or_default()
}

fn pick_static<R: Rng>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}

impl ValuePools {
    /// Draws fresh pools.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        Self {
            first_names: draw(rng, |r| FirstName().fake_with_rng(r)),
            last_names: draw(rng, |r| LastName().fake_with_rng(r)),
            full_names: draw(rng, |r| Name().fake_with_rng(r)),
            emails: draw(rng, |r| SafeEmail().fake_with_rng(r)),
            phones: draw(rng, |r| PhoneNumber().fake_with_rng(r)),
            streets: draw(rng, |r| {
                let number: String = BuildingNumber().fake_with_rng(r);
                let street: String = StreetName().fake_with_rng(r);
                format!("{number} {street}")
            }),
            cities: draw(rng, |r| CityName().fake_with_rng(r)),
            states: draw(rng, |r| StateAbbr().fake_with_rng(r)),
            employers: draw(rng, |r| CompanyName().fake_with_rng(r)),
            job_titles: draw(rng, |r| Profession().fake_with_rng(r)),
            date_origin: NaiveDate::from_ymd_opt(1975, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
        }
    }

    /// A plausible value for a text column.
    ///
    /// Date columns go through [`ValuePools::date_cell`] instead.
    pub fn text_cell<R: Rng>(&self, column: Column, rng: &mut R) -> String {
        match column {
            Column::EmployeeId => rng.gen_range(100_000u32..1_000_000).to_string(),
            Column::FirstName => pick(rng, &self.first_names).to_owned(),
            Column::LastName => pick(rng, &self.last_names).to_owned(),
            Column::Email => pick(rng, &self.emails).to_owned(),
            Column::Phone => pick(rng, &self.phones).to_owned(),
            Column::Gender => pick_static(rng, GENDERS).to_owned(),
            Column::Ethnicity => pick_static(rng, ETHNICITIES).to_owned(),
            Column::MaritalStatus => pick_static(rng, MARITAL_STATUSES).to_owned(),
            Column::StreetAddress => pick(rng, &self.streets).to_owned(),
            Column::City => pick(rng, &self.cities).to_owned(),
            Column::State => pick(rng, &self.states).to_owned(),
            Column::ZipCode => rng.gen_range(10_000u32..100_000).to_string(),
            Column::Country => pick_static(rng, COUNTRIES).to_owned(),
            Column::Employer => pick(rng, &self.employers).to_owned(),
            Column::Department => pick_static(rng, DEPARTMENTS).to_owned(),
            Column::JobTitle => pick(rng, &self.job_titles).to_owned(),
            Column::EmploymentType => pick_static(rng, EMPLOYMENT_TYPES).to_owned(),
            Column::EducationLevel => pick_static(rng, EDUCATION_LEVELS).to_owned(),
            Column::Salary => (rng.gen_range(30u32..250) * 1000).to_string(),
            Column::YearsExperience => rng.gen_range(0u32..41).to_string(),
            Column::ManagerName | Column::EmergencyContact => {
                pick(rng, &self.full_names).to_owned()
            }
            Column::BirthDate | Column::HireDate | Column::LastReviewDate => {
                self.date_cell(rng)
            }
        }
    }

    /// A random date rendered in a random accepted shape.
    pub fn date_cell<R: Rng>(&self, rng: &mut R) -> String {
        let offset = Duration::days(rng.gen_range(0..DATE_SPAN_DAYS))
            + Duration::seconds(rng.gen_range(0..86_400));
        let at = self.date_origin + offset;
        // One slot past the formats renders as epoch seconds.
        let slot = rng.gen_range(0..=DATE_FORMATS.len());
        match DATE_FORMATS.get(slot) {
            Some(fmt) => at.format(fmt).to_string(),
            None => at.and_utc().timestamp().to_string(),
        }
    }
}

/// Applies a small change to a numeric-looking cell.
///
/// Used on duplication passes so copied rows are not byte-identical.
/// Returns `None` when the column is not perturbed or the cell is not an integer.
pub fn perturb<R: Rng>(column: Column, cell: &str, pass: u32, rng: &mut R) -> Option<String> {
    let value: u64 = cell.parse().ok()?;
    let changed = match column {
        Column::EmployeeId => value + u64::from(pass) * 1_000_000,
        Column::Salary => {
            let delta = value / 50;
            value
                .saturating_sub(delta)
                .saturating_add(rng.gen_range(0..=delta * 2))
        }
        Column::YearsExperience => (value + rng.gen_range(0..=2)).saturating_sub(1),
        _ => return None,
    };
    Some(changed.to_string())
}
