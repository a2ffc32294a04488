use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::repo::{now_rfc3339, User};
use crate::store::{decode_rows, RemoteStore, StoreError};

/// Plot review state. Transitions out of `Pending` belong to an external
/// admin surface, not to this service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Typed view over a raw `plots` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plot {
    pub id: String,
    pub plot_name: String,
    pub user_id: String,
    #[serde(default)]
    pub owner_phone: Option<String>,
    pub points: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_acres: Option<f64>,
    #[serde(default)]
    pub status: PlotStatus,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewPlot {
    pub plot_name: String,
    pub points: Vec<[f64; 2]>,
    pub area_acres: Option<f64>,
}

impl Plot {
    /// Zero-padded sequence id derived from the current row count. Two
    /// concurrent creations can observe the same count and collide; the
    /// count and the insert are separate round trips.
    pub async fn next_id(store: &RemoteStore) -> Result<String, StoreError> {
        let rows = store.select("plots", "id", &[], None).await?;
        Ok(format!("PL{:04}", rows.len() + 1))
    }

    pub async fn create(
        store: &RemoteStore,
        owner: &User,
        new: NewPlot,
    ) -> Result<Plot, StoreError> {
        let id = Self::next_id(store).await?;
        let now = now_rfc3339();
        let rows = json!([{
            "id": id,
            "plot_name": new.plot_name,
            "user_id": owner.id,
            "owner_phone": owner.phone,
            "points": new.points,
            "area_acres": new.area_acres,
            "status": PlotStatus::Pending,
            "created_at": now,
            "updated_at": now,
        }]);
        let inserted = store.insert("plots", &rows).await?;
        decode_rows(inserted)?.into_iter().next().ok_or(StoreError::NoRows)
    }

    pub async fn list_by_owner(
        store: &RemoteStore,
        user_id: &str,
    ) -> Result<Vec<Plot>, StoreError> {
        let rows = store
            .select("plots", "*", &[("user_id", user_id)], Some("created_at.desc"))
            .await?;
        decode_rows(rows)
    }
}

#[cfg(test)]
pub(crate) fn plot_row(id: &str, user_id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "plot_name": "north field",
        "user_id": user_id,
        "owner_phone": "555-0100",
        "points": [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
        "area_acres": 2.5,
        "status": "pending",
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_decodes_from_store_row() {
        let plot: Plot = serde_json::from_value(plot_row("PL0001", "u1")).expect("decodes");
        assert_eq!(plot.id, "PL0001");
        assert_eq!(plot.points.len(), 3);
        assert_eq!(plot.status, PlotStatus::Pending);
        assert_eq!(plot.area_acres, Some(2.5));
    }

    #[test]
    fn status_defaults_to_pending_when_absent() {
        let mut row = plot_row("PL0001", "u1");
        row.as_object_mut().unwrap().remove("status");
        let plot: Plot = serde_json::from_value(row).expect("decodes");
        assert_eq!(plot.status, PlotStatus::Pending);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(PlotStatus::Approved).unwrap(),
            serde_json::json!("approved")
        );
    }

    #[test]
    fn sequence_ids_are_zero_padded() {
        assert_eq!(format!("PL{:04}", 1), "PL0001");
        assert_eq!(format!("PL{:04}", 42), "PL0042");
        assert_eq!(format!("PL{:04}", 12345), "PL12345");
    }
}
