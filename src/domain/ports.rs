use crate::domain::model::MetricsSnapshot;
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait MetricExporter: Send + Sync {
    fn name(&self) -> &'static str;
    async fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}
