// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Ledger configuration.
//!
//! Settings are read from TOML. Every field is optional and falls back to
//! its default:
//!
//! ```toml
//! default_loan_period_days = 14
//! max_loan_period_days = 90
//! max_page_limit = 100
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for loan periods and listing pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Loan period applied when the caller does not supply one.
    pub default_loan_period_days: i64,
    /// Upper bound on a requested loan period. `None` accepts any positive value.
    pub max_loan_period_days: Option<i64>,
    /// Largest page a listing query may request.
    pub max_page_limit: usize,
}

impl LedgerConfig {
    pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;
    pub const DEFAULT_PAGE_LIMIT: usize = 100;

    /// Parses and validates a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_loan_period_days <= 0 {
            return Err(ConfigError::Invalid(format!(
                "default_loan_period_days must be positive, got {}",
                self.default_loan_period_days
            )));
        }
        if let Some(max) = self.max_loan_period_days {
            if max < self.default_loan_period_days {
                return Err(ConfigError::Invalid(format!(
                    "max_loan_period_days ({max}) is below default_loan_period_days ({})",
                    self.default_loan_period_days
                )));
            }
        }
        if self.max_page_limit == 0 {
            return Err(ConfigError::Invalid("max_page_limit must be positive".into()));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_loan_period_days: Self::DEFAULT_LOAN_PERIOD_DAYS,
            max_loan_period_days: None,
            max_page_limit: Self::DEFAULT_PAGE_LIMIT,
        }
    }
}
