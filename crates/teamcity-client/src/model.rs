//! TeamCity REST wire types.
//!
//! Only the fields the decision logic reads are modelled; TeamCity sends
//! many more and they are ignored.

use branchgate_core::{Build, BuildId, BuildParameters, BuildStatus, Change, ChangeId};
use serde::{Deserialize, Serialize};

/// `build` element of `/builds`, `/buildQueue` and `/builds/id:<id>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDto {
    pub id: u64,
    pub build_type_id: String,
    /// Absent for queued and running builds
    #[serde(default)]
    pub status: BuildStatus,
    #[serde(default)]
    pub status_text: Option<String>,
    /// Absent for builds of the default branch
    #[serde(default)]
    pub branch_name: Option<String>,
    /// Only present on build detail
    #[serde(default)]
    pub last_changes: Option<ChangesDto>,
}

impl From<BuildDto> for Build {
    fn from(dto: BuildDto) -> Self {
        let last_change = dto
            .last_changes
            .and_then(|changes| changes.change.into_iter().next())
            .map(|change| ChangeId(change.id));
        Build {
            id: BuildId(dto.id),
            build_type_id: dto.build_type_id,
            status: dto.status,
            status_text: dto.status_text,
            branch_name: dto.branch_name,
            last_change,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildsDto {
    #[serde(default)]
    pub build: Vec<BuildDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeDto {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangesDto {
    #[serde(default)]
    pub change: Vec<ChangeDto>,
}

impl ChangesDto {
    pub fn into_changes(self) -> Vec<Change> {
        self.change
            .into_iter()
            .map(|c| Change { id: ChangeId(c.id) })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Enqueue request body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BuildTypeRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDto {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertiesDto {
    pub count: usize,
    pub property: Vec<PropertyDto>,
}

impl From<&BuildParameters> for PropertiesDto {
    fn from(params: &BuildParameters) -> Self {
        let property: Vec<PropertyDto> = params
            .namespaced()
            .map(|(name, value)| PropertyDto {
                name,
                value: value.to_string(),
            })
            .collect();
        PropertiesDto {
            count: property.len(),
            property,
        }
    }
}

/// Body of `POST /buildQueue`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequestDto<'a> {
    pub build_type: BuildTypeRef<'a>,
    pub branch_name: &'a str,
    pub properties: PropertiesDto,
}
