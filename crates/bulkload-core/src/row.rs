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

//! The column catalog and the typed [`Row`] record.
//!
//! The catalog is fixed: three date columns and twenty-two demographic or
//! employment text columns. [`Column::ALL`] is the canonical order used by
//! every store; generated files shuffle it per run.
//!
//! Each column owns a [`FieldSetter`], a plain function pointer that writes
//! one cell into a row. Readers build a header-position to setter table once
//! and never compare column names in their hot loop.

use crate::date;
use crate::error::DateError;
use crate::model::RunId;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt;

/// Writes one non-empty cell into a row.
///
/// Date setters return the normalizer's error and leave the field null.
pub type FieldSetter = fn(&mut Row, &str) -> Result<(), DateError>;

fn ignore_cell(_: &mut Row, _: &str) -> Result<(), DateError> {
    Ok(())
}

/// Setter for header names outside the catalog.
pub const NOOP_SETTER: FieldSetter = ignore_cell;

macro_rules! catalog {
    (
        dates { $($dv:ident => $df:ident),+ $(,)? }
        text { $($tv:ident => $tf:ident),+ $(,)? }
    ) => {
        /// A column of the fixed catalog.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Column {
            $(
                #[allow(missing_docs)]
                $dv,
            )+
            $(
                #[allow(missing_docs)]
                $tv,
            )+
        }

        impl Column {
            /// Every column in canonical order.
            pub const ALL: [Column; COLUMN_COUNT] = [$(Column::$dv,)+ $(Column::$tv,)+];

            /// Header name.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Column::$dv => stringify!($df),)+
                    $(Column::$tv => stringify!($tf),)+
                }
            }

            /// Whether the column holds a date.
            pub fn is_date(&self) -> bool {
                matches!(self, $(Column::$dv)|+)
            }

            /// Function that stores a cell of this column into a row.
            pub fn setter(&self) -> FieldSetter {
                match self {
                    $(Column::$dv => |row: &mut Row, text: &str| -> Result<(), DateError> {
                        row.$df = date::validate(text)?.map(|d| d.instant);
                        Ok(())
                    },)+
                    $(Column::$tv => |row: &mut Row, text: &str| -> Result<(), DateError> {
                        row.$tf = Some(text.to_owned());
                        Ok(())
                    },)+
                }
            }
        }

        /// One synthetic record belonging to a run.
        ///
        /// Every field is nullable; date fields hold normalized UTC instants.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct Row {
            /// Owning run.
            pub run_id: RunId,
            $(
                #[allow(missing_docs)]
                pub $df: Option<DateTime<Utc>>,
            )+
            $(
                #[allow(missing_docs)]
                pub $tf: Option<String>,
            )+
        }

        impl Row {
            /// Date value of a date column; `None` for text columns.
            pub fn date(&self, column: Column) -> Option<&DateTime<Utc>> {
                match column {
                    $(Column::$dv => self.$df.as_ref(),)+
                    _ => None,
                }
            }

            /// Text value of a text column; `None` for date columns.
            pub fn text(&self, column: Column) -> Option<&str> {
                match column {
                    $(Column::$tv => self.$tf.as_deref(),)+
                    _ => None,
                }
            }
        }
    };
}

/// Number of catalog columns.
pub const COLUMN_COUNT: usize = 25;

catalog! {
    dates {
        BirthDate => birth_date,
        HireDate => hire_date,
        LastReviewDate => last_review_date,
    }
    text {
        EmployeeId => employee_id,
        FirstName => first_name,
        LastName => last_name,
        Email => email,
        Phone => phone,
        Gender => gender,
        Ethnicity => ethnicity,
        MaritalStatus => marital_status,
        StreetAddress => street_address,
        City => city,
        State => state,
        ZipCode => zip_code,
        Country => country,
        Employer => employer,
        Department => department,
        JobTitle => job_title,
        EmploymentType => employment_type,
        EducationLevel => education_level,
        Salary => salary,
        YearsExperience => years_experience,
        ManagerName => manager_name,
        EmergencyContact => emergency_contact,
    }
}

/// The date columns, in canonical order.
pub const DATE_COLUMNS: [Column; 3] = [Column::BirthDate, Column::HireDate, Column::LastReviewDate];

impl Column {
    /// Looks up a header name (case-insensitive, surrounding whitespace ignored).
    pub fn from_name(name: &str) -> Option<Column> {
        let name = name.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Position in [`Column::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Columns whose generated values are plain integers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Column::EmployeeId | Column::Salary | Column::YearsExperience | Column::ZipCode
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Row {
    /// An empty row for a run.
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            ..Default::default()
        }
    }

    /// Cell value as text; dates render as RFC 3339.
    pub fn value(&self, column: Column) -> Option<Cow<'_, str>> {
        if column.is_date() {
            self.date(column)
                .map(|d| Cow::Owned(date::format_rfc3339(d)))
        } else {
            self.text(column).map(Cow::Borrowed)
        }
    }

    /// Number of non-null cells.
    pub fn populated(&self) -> usize {
        Column::ALL
            .iter()
            .filter(|c| self.date(**c).is_some() || self.text(**c).is_some())
            .count()
    }
}
