//! Claims (`siniestros`) table
//!
//! Every query is scoped to the configured user. Writes notify the
//! registered [`InvalidationHook`]s so cached searches see the change.

use crate::client::{Page, TajyClient};
use crate::error::{ApiError, ApiResult};
use crate::query::RestQuery;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tajy_core::config::BackendSettings;
use tajy_search::{Candidate, CandidateSource, InvalidationHook, SearchError};
use tracing::{debug, info, instrument};

/// State given to every new claim
pub const INITIAL_STATE: &str = "pendiente";

/// `monto` when the form leaves it blank
pub const DEFAULT_AMOUNT: &str = "No";

/// States that still need someone to act on them
pub const FOLLOW_UP_STATES: [&str; 2] = ["pendiente", "proceso"];

/// Paraguay stays on UTC-3 all year
const ASUNCION_OFFSET_SECS: i32 = -3 * 3600;

/// A claim row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claim {
    /// Primary key
    pub id: i64,
    /// Claim number, unique per user
    pub numero: String,
    /// Policy holder
    pub asegurado: String,
    /// Policy holder sex
    pub sexo: Option<String>,
    /// Contact phone
    pub telefono: Option<String>,
    /// Date the claim was filed (Asunción local date)
    pub fecha: Option<NaiveDate>,
    /// Claim type
    pub tipo: Option<String>,
    /// Processing state
    pub estado: Option<String>,
    /// Amount flag
    pub monto: Option<String>,
    /// Policy number
    pub poliza: Option<String>,
    /// Assigned repair shop
    pub taller: Option<String>,
    /// Free-form notes
    pub observaciones: Option<String>,
    /// Owning user
    pub user_id: Option<String>,
    /// Row creation time
    pub created_at: Option<DateTime<Utc>>,
}

impl Claim {
    /// Whole days from filing to `today`, if the claim has a date
    #[must_use]
    pub fn days_elapsed(&self, today: NaiveDate) -> Option<i64> {
        self.fecha.map(|fecha| (today - fecha).num_days())
    }

    /// Open claim filed at least `after_days` ago
    #[must_use]
    pub fn needs_follow_up(&self, today: NaiveDate, after_days: u32) -> bool {
        let open = self
            .estado
            .as_deref()
            .is_some_and(|estado| FOLLOW_UP_STATES.contains(&estado));
        open && self
            .days_elapsed(today)
            .is_some_and(|days| days >= i64::from(after_days))
    }
}

/// Fields supplied when filing a claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    /// Claim number
    pub numero: String,
    /// Policy holder
    pub asegurado: String,
    /// Policy holder sex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sexo: Option<String>,
    /// Contact phone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    /// Claim type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    /// Amount flag, [`DEFAULT_AMOUNT`] when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto: Option<String>,
    /// Policy number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poliza: Option<String>,
    /// Assigned repair shop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taller: Option<String>,
    /// Free-form notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
}

impl NewClaim {
    /// Claim with only the required fields
    pub fn new(numero: impl Into<String>, asegurado: impl Into<String>) -> Self {
        Self {
            numero: numero.into(),
            asegurado: asegurado.into(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct InsertRow<'a> {
    #[serde(flatten)]
    claim: &'a NewClaim,
    fecha: NaiveDate,
    estado: &'static str,
    user_id: &'a str,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ClaimUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asegurado: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sexo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poliza: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taller: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
}

/// Today's date in Asunción
#[must_use]
pub fn local_date(now: DateTime<Utc>) -> NaiveDate {
    FixedOffset::east_opt(ASUNCION_OFFSET_SECS)
        .map_or_else(|| now.date_naive(), |tz| now.with_timezone(&tz).date_naive())
}

/// Claims API interface
#[derive(Clone)]
pub struct ClaimsApi {
    client: TajyClient,
    settings: BackendSettings,
    hooks: Vec<Arc<dyn InvalidationHook>>,
}

impl fmt::Debug for ClaimsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsApi")
            .field("table", &self.settings.table)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl ClaimsApi {
    pub(crate) fn new(client: TajyClient, settings: BackendSettings) -> Self {
        Self {
            client,
            settings,
            hooks: Vec::new(),
        }
    }

    /// Notify `hook` after every successful write
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn InvalidationHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Table mapping in use
    #[must_use]
    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    fn scoped(&self) -> ApiResult<RestQuery> {
        Ok(RestQuery::new().eq("user_id", self.client.user_id()?))
    }

    /// Name and number of every claim, ordered by name
    #[instrument(skip(self))]
    pub async fn candidates(&self) -> ApiResult<Vec<Candidate>> {
        let name_col = self.settings.name_column.as_str();
        let ref_col = self.settings.ref_column.as_str();
        let query = self
            .scoped()?
            .select(&format!("{name_col},{ref_col}"))
            .order(name_col, true);

        let rows: Vec<Map<String, Value>> =
            self.client.get_rows(&self.settings.table, &query).await?;
        let total = rows.len();

        let candidates: Vec<Candidate> = rows
            .iter()
            .filter_map(|row| {
                let name = column_text(row, name_col)?;
                Some(Candidate::new(name, column_text(row, ref_col).unwrap_or_default()))
            })
            .collect();

        debug!(rows = total, candidates = candidates.len(), "Fetched candidates");
        Ok(candidates)
    }

    /// One page of claims matching `query`, with the exact total
    ///
    /// A page whose offset does not fit in `usize` is empty.
    pub async fn page(&self, query: RestQuery, page: usize) -> ApiResult<Page<Claim>> {
        let size = self.settings.page_size;
        let query = query.pairs().iter().fold(self.scoped()?, |q, (k, v)| q.param(k, v.clone()));
        let Some(offset) = page.checked_mul(size) else {
            debug!(page, size, "Page offset out of range");
            return Ok(Page {
                rows: Vec::new(),
                total: None,
            });
        };
        self.client
            .get_page(&self.settings.table, &query, offset, size)
            .await
    }

    /// Every claim, optionally in one state, ordered by name
    pub async fn all(&self, estado: Option<&str>) -> ApiResult<Vec<Claim>> {
        let mut query = self.scoped()?;
        if let Some(estado) = estado {
            query = query.eq("estado", estado);
        }
        let query = query.order(&self.settings.name_column, true);
        self.client.get_rows(&self.settings.table, &query).await
    }

    /// A single claim
    pub async fn get(&self, id: i64) -> ApiResult<Claim> {
        let query = self.scoped()?.eq("id", id).limit(1);
        let rows: Vec<Claim> = self.client.get_rows(&self.settings.table, &query).await?;
        rows.into_iter().next().ok_or(ApiError::NotFound(id))
    }

    /// Whether the user already has a claim with this number
    pub async fn exists(&self, numero: &str) -> ApiResult<bool> {
        let query = self
            .scoped()?
            .select("id")
            .eq(&self.settings.ref_column, numero)
            .limit(1);
        let rows: Vec<Value> = self.client.get_rows(&self.settings.table, &query).await?;
        Ok(!rows.is_empty())
    }

    /// File a new claim dated today, in the initial state
    #[instrument(skip(self, claim), fields(numero = %claim.numero))]
    pub async fn create(&self, claim: &NewClaim) -> ApiResult<Claim> {
        let user_id = self.client.user_id()?;

        if self.exists(&claim.numero).await? {
            return Err(ApiError::Duplicate(claim.numero.clone()));
        }

        let mut filled = claim.clone();
        if filled.monto.as_deref().is_none_or(|m| m.trim().is_empty()) {
            filled.monto = Some(DEFAULT_AMOUNT.to_string());
        }

        let row = InsertRow {
            claim: &filled,
            fecha: local_date(Utc::now()),
            estado: INITIAL_STATE,
            user_id,
        };

        let created: Vec<Claim> = self
            .client
            .insert(&self.settings.table, &row)
            .await
            .map_err(|e| duplicate_or(e, &claim.numero))?;
        let created = created
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::api_response(500, "insert returned no row"))?;

        info!(id = created.id, "Claim created");
        self.notify();
        Ok(created)
    }

    /// Apply `changes` to claim `id`
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: i64, changes: &ClaimUpdate) -> ApiResult<Claim> {
        let query = self.scoped()?.eq("id", id);
        let updated: Vec<Claim> = self
            .client
            .patch(&self.settings.table, &query, changes)
            .await
            .map_err(|e| duplicate_or(e, changes.numero.as_deref().unwrap_or_default()))?;
        let updated = updated.into_iter().next().ok_or(ApiError::NotFound(id))?;

        info!(id, "Claim updated");
        self.notify();
        Ok(updated)
    }

    /// Delete claim `id`
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        let query = self.scoped()?.eq("id", id);
        self.client.delete(&self.settings.table, &query).await?;

        info!(id, "Claim deleted");
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        debug!(hooks = self.hooks.len(), "Claims changed");
        for hook in &self.hooks {
            hook.records_changed();
        }
    }
}

impl CandidateSource for ClaimsApi {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>, SearchError> {
        Ok(self.candidates().await?)
    }
}

fn duplicate_or(err: ApiError, numero: &str) -> ApiError {
    if err.is_unique_violation() {
        ApiError::Duplicate(numero.to_string())
    } else {
        err
    }
}

/// Text of a column that may hold a string or a number
fn column_text(row: &Map<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_date_crosses_midnight() {
        let late_utc = Utc.with_ymd_and_hms(2025, 3, 10, 2, 30, 0).unwrap();
        assert_eq!(local_date(late_utc), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());

        let noon_utc = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(local_date(noon_utc), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn test_claim_row_deserializes() {
        let json = r#"{
            "id": 7, "numero": "S-7", "asegurado": "Ana Díaz", "estado": "pendiente",
            "fecha": "2025-03-09", "created_at": "2025-03-09T15:04:05.123456+00:00",
            "taller": null
        }"#;
        let claim: Claim = serde_json::from_str(json).unwrap();

        assert_eq!(claim.id, 7);
        assert_eq!(claim.fecha, NaiveDate::from_ymd_opt(2025, 3, 9));
        assert!(claim.created_at.is_some());
        assert!(claim.taller.is_none());
    }

    #[test]
    fn test_insert_row_defaults() {
        let claim = NewClaim {
            monto: Some(DEFAULT_AMOUNT.to_string()),
            ..NewClaim::new("S-1", "Ana Díaz")
        };
        let row = InsertRow {
            claim: &claim,
            fecha: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            estado: INITIAL_STATE,
            user_id: "u-1",
        };
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["numero"], "S-1");
        assert_eq!(json["monto"], "No");
        assert_eq!(json["estado"], "pendiente");
        assert_eq!(json["fecha"], "2025-01-02");
        assert!(json.get("sexo").is_none());
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = ClaimUpdate {
            estado: Some("cerrado".into()),
            ..ClaimUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"estado":"cerrado"}"#);
    }

    fn filed(estado: &str, fecha: NaiveDate) -> Claim {
        Claim {
            estado: Some(estado.to_string()),
            fecha: Some(fecha),
            ..Claim::default()
        }
    }

    #[test]
    fn test_days_elapsed() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let claim = filed("pendiente", NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(claim.days_elapsed(today), Some(10));
        assert_eq!(Claim::default().days_elapsed(today), None);
    }

    #[test]
    fn test_follow_up_starts_on_third_day() {
        let fecha = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let claim = filed("pendiente", fecha);

        assert!(!claim.needs_follow_up(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(), 3));
        assert!(claim.needs_follow_up(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), 3));
        assert!(claim.needs_follow_up(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(), 3));
    }

    #[test]
    fn test_follow_up_only_for_open_states() {
        let fecha = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        assert!(filed("pendiente", fecha).needs_follow_up(today, 3));
        assert!(filed("proceso", fecha).needs_follow_up(today, 3));
        assert!(!filed("cerrado", fecha).needs_follow_up(today, 3));
        assert!(!filed("Pendiente", fecha).needs_follow_up(today, 3));

        let undated = Claim {
            estado: Some("pendiente".into()),
            ..Claim::default()
        };
        assert!(!undated.needs_follow_up(today, 0));
    }

    #[test]
    fn test_column_text() {
        let row: Map<String, Value> =
            serde_json::from_str(r#"{"asegurado": "Ana", "numero": 15, "poliza": null}"#).unwrap();
        assert_eq!(column_text(&row, "asegurado").as_deref(), Some("Ana"));
        assert_eq!(column_text(&row, "numero").as_deref(), Some("15"));
        assert_eq!(column_text(&row, "poliza"), None);
        assert_eq!(column_text(&row, "missing"), None);
    }
}
