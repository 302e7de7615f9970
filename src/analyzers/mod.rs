//! Underemployment analyses over a College Scorecard table.
//!
//! Columns are resolved once into an [`institutions::Institutions`] view,
//! then each analysis aggregates over it. Unavailable inputs never fail a
//! run: they surface as [`types::Stat::Unavailable`] metrics and
//! [`types::Annotation`]s on the result bundle.

pub mod analyzer;
pub mod causal_export;
pub mod completion;
pub mod earnings;
pub mod field_risk;
pub mod institution_type;
pub mod institutions;
pub mod resolver;
pub mod scarring;
pub mod socioeconomic;
pub mod types;
pub mod utility;
