use serde::Deserialize;

/// Request body for plot registration. Required fields are optional here so
/// absence maps to a 400, not a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct CreatePlotRequest {
    pub plot_name: Option<String>,
    pub points: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub area_acres: Option<f64>,
}
