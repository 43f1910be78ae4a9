use crate::client::PrinterClient;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Analytic metric ids and the snapshot field each one fills.
pub const ANALYTIC_METRICS: [(u8, &str); 28] = [
    (0, "layer_height"),
    (1, "solid_area"),
    (2, "area_count"),
    (3, "largest_area"),
    (4, "speed"),
    (5, "cure"),
    (6, "pressure"),
    (7, "temperature_inside"),
    (8, "temperature_outside"),
    (9, "layer_time_analytic"),
    (10, "lift_height"),
    (11, "temperature_mcu_analytic"),
    (12, "temperature_inside_target"),
    (13, "temperature_outside_target"),
    (14, "temperature_mcu_target"),
    (15, "mcu_fan_rpm_analytic"),
    (16, "uv_fan_rpm_analytic"),
    (17, "dynamic_wait"),
    (18, "temperature_vat"),
    (19, "temperature_vat_target"),
    (20, "ptc_fan_rpm"),
    (21, "aegis_fan_rpm"),
    (22, "temperature_chamber"),
    (23, "temperature_chamber_target"),
    (24, "temperature_ptc"),
    (25, "temperature_ptc_target"),
    (26, "voc_inlet"),
    (27, "voc_outlet"),
];

/// Field name for a metric id
pub fn metric_field(metric_id: u8) -> Option<&'static str> {
    ANALYTIC_METRICS
        .iter()
        .find(|(id, _)| *id == metric_id)
        .map(|(_, field)| *field)
}

/// Fans out one small request per analytic metric.
///
/// Each request is time-boxed on its own; a metric that fails for any
/// reason is left out of the result instead of failing the batch.
pub struct AnalyticFetcher {
    client: PrinterClient,
    timeout: Duration,
    concurrency: usize,
}

impl AnalyticFetcher {
    pub fn new(client: PrinterClient, timeout: Duration, concurrency: usize) -> Self {
        Self {
            client,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn fetch_all(&self) -> BTreeMap<String, f64> {
        let results: Vec<(&'static str, Option<f64>)> = stream::iter(ANALYTIC_METRICS)
            .map(|(metric_id, field)| async move {
                match self.client.fetch_analytic(metric_id, self.timeout).await {
                    Ok(value) => (field, Some(value)),
                    Err(e) => {
                        debug!("Error fetching analytic metric {} ({}): {}", field, metric_id, e);
                        (field, None)
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .boxed()
            .collect()
            .await;

        let values: BTreeMap<String, f64> = results
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field.to_string(), v)))
            .collect();

        debug!(
            "Fetched {}/{} analytic metrics",
            values.len(),
            ANALYTIC_METRICS.len()
        );

        values
    }
}
