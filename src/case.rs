use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Errors raised while building cases
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaseError {
    #[error("model name must not be empty")]
    EmptyModelName,

    #[error("model {0}: members must not be empty")]
    NoMembers(String),

    #[error("model {model}: {field} must be at least 1")]
    NonPositive { model: String, field: &'static str },

    #[error("model {0}: has_clim=false but clim_years is set")]
    ClimYearsWithoutClim(String),

    #[error("model {0}: clim_years must be [first, last] with first <= last")]
    BadClimYears(String),

    #[error("no cases given")]
    NoCases,

    #[error("duplicated case name \"{0}\"")]
    DuplicateName(String),
}

/// One ensemble realisation of a model run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "i64")]
pub enum Member {
    /// Unperturbed control run (member 0)
    Control,
    /// Perturbed member n (n >= 1)
    Member(u32),
    /// Pre-computed ensemble mean stored as its own member
    EnsembleMean,
}

impl From<i64> for Member {
    fn from(value: i64) -> Self {
        match value {
            0 => Member::Control,
            n if n > 0 => Member::Member(n as u32),
            _ => Member::EnsembleMean,
        }
    }
}

impl Member {
    /// Short label used in file names and logs
    pub fn label(&self) -> String {
        match self {
            Member::Control => "ctl".to_string(),
            Member::Member(n) => format!("m{:02}", n),
            Member::EnsembleMean => "ensmean".to_string(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelConfig {
    name: String,
    init_time0: NaiveDate,
    #[serde(default = "default_one")]
    num_init_times: u32,
    members: Vec<Member>,
    num_leads: u32,
    #[serde(default)]
    has_clim: bool,
    #[serde(default)]
    clim_years: Option<[i32; 2]>,
}

fn default_one() -> u32 {
    1
}

/// Forecast system under comparison
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ModelConfig")]
pub struct Model {
    pub name: String,
    pub init_time0: NaiveDate,
    pub num_init_times: u32,
    pub members: Vec<Member>,
    pub num_leads: u32,
    pub has_clim: bool,
    pub clim_years: Option<[i32; 2]>,
}

impl TryFrom<ModelConfig> for Model {
    type Error = CaseError;

    fn try_from(raw: ModelConfig) -> Result<Self, Self::Error> {
        Model::new(
            raw.name,
            raw.init_time0,
            raw.num_init_times,
            raw.members,
            raw.num_leads,
            raw.clim_years,
            raw.has_clim,
        )
    }
}

impl Model {
    /// Validate and build a model descriptor
    pub fn new(
        name: impl Into<String>,
        init_time0: NaiveDate,
        num_init_times: u32,
        members: Vec<Member>,
        num_leads: u32,
        clim_years: Option<[i32; 2]>,
        has_clim: bool,
    ) -> Result<Self, CaseError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CaseError::EmptyModelName);
        }
        if members.is_empty() {
            return Err(CaseError::NoMembers(name));
        }
        if num_init_times == 0 {
            return Err(CaseError::NonPositive { model: name, field: "num_init_times" });
        }
        if num_leads == 0 {
            return Err(CaseError::NonPositive { model: name, field: "num_leads" });
        }
        if !has_clim && clim_years.is_some() {
            return Err(CaseError::ClimYearsWithoutClim(name));
        }
        if let Some([first, last]) = clim_years {
            if first > last {
                return Err(CaseError::BadClimYears(name));
            }
        }

        Ok(Self {
            name,
            init_time0,
            num_init_times,
            members,
            num_leads,
            has_clim,
            clim_years,
        })
    }

    /// Daily initialisation dates starting at `init_time0`
    pub fn init_times(&self) -> Vec<NaiveDate> {
        (0..self.num_init_times)
            .map(|i| self.init_time0 + Duration::days(i as i64))
            .collect()
    }
}

/// A named model configuration under comparison
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    pub name: String,
    pub model: Model,
}

impl Case {
    pub fn new(name: impl Into<String>, model: Model) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

/// Cases must be non-empty and uniquely named
pub fn validate_cases(cases: &[Case]) -> Result<(), CaseError> {
    if cases.is_empty() {
        return Err(CaseError::NoCases);
    }
    for (i, case) in cases.iter().enumerate() {
        if cases[..i].iter().any(|c| c.name == case.name) {
            return Err(CaseError::DuplicateName(case.name.clone()));
        }
    }
    Ok(())
}
