//! CSV lead import.

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::NewLead;

/// Columns every upload must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "name",
    "role",
    "company",
    "industry",
    "location",
    "linkedin_bio",
];

/// Leads parsed from one upload.
#[derive(Debug, Default)]
pub struct LeadImport {
    pub leads: Vec<NewLead>,
    /// Per-row problems, e.g. `Row 3: Name is required`. Rows are numbered from 2 (after the
    /// header line).
    pub warnings: Vec<String>,
}

/// Tag grouping the leads of one upload: `batch_<8 hex chars>_<unix seconds>`.
pub fn new_batch_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("batch_{}_{}", &id[..8], Utc::now().timestamp())
}

#[derive(Debug, Deserialize)]
struct LeadRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    role: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    company: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    industry: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    linkedin_bio: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

/// Parses an uploaded CSV into leads tagged with `batch_id`.
///
/// Rows with neither name nor company are skipped silently; rows with a company but no name
/// are skipped with a warning. Parsing stops once `max_leads` leads were collected. An upload
/// that yields no leads at all is rejected.
pub fn parse_leads(bytes: &[u8], batch_id: &str, max_leads: usize) -> Result<LeadImport, AppError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        AppError::BadRequest(format!("Failed to process CSV file: {}", e))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required CSV columns: {}",
            missing.join(", ")
        )));
    }

    let mut import = LeadImport::default();

    for (index, record) in reader.deserialize::<LeadRow>().enumerate() {
        let row_num = index + 2;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                import.warnings.push(format!("Row {}: {}", row_num, e));
                continue;
            }
        };

        if row.name.is_none() && row.company.is_none() {
            continue;
        }
        if row.name.is_none() {
            import
                .warnings
                .push(format!("Row {}: Name is required", row_num));
            continue;
        }

        import.leads.push(NewLead {
            name: row.name,
            role: row.role,
            company: row.company,
            industry: row.industry,
            location: row.location,
            linkedin_bio: row.linkedin_bio,
            batch_id: batch_id.to_string(),
        });

        if import.leads.len() >= max_leads {
            tracing::warn!(
                "Upload {} reached the limit of {} leads, remaining rows ignored",
                batch_id,
                max_leads
            );
            break;
        }
    }

    if import.leads.is_empty() {
        return Err(AppError::Validation {
            message: "No valid leads found in CSV".to_string(),
            details: import.warnings,
        });
    }

    Ok(import)
}
