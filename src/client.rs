use crate::config::Configuration;
use crate::core::api::{
    ClearCompletedQuery, JobGroupQuery, JobGroupResponse, QdelRequest, QdelResponse,
    QpriorityRequest, QpriorityResponse, QstatQuery, QstatResponse, QsubRequest, QsubResponse,
    QsummaryResponse, ReallyQuery, WorkersRequest, WorkersResponse,
};
use anyhow::Context;
use reqwest::Client as ReqwestClient;

/// Thin reqwest wrapper, one method per `lqtsd` HTTP endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    client: ReqwestClient,
    base_url: String,
}

impl Client {
    pub fn build(config: &Configuration) -> anyhow::Result<Self> {
        let base_url = format!("http://{}:{}", config.ip_address, config.port);
        Ok(Self {
            client: ReqwestClient::new(),
            base_url,
        })
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: ReqwestClient::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn qsub(&self, request: QsubRequest) -> anyhow::Result<QsubResponse> {
        self.client
            .post(format!("{}/qsub", self.base_url))
            .json(&request)
            .send()
            .await
            .context("failed to send qsub request")?
            .error_for_status()
            .context("lqtsd rejected qsub request")?
            .json()
            .await
            .context("failed to parse qsub response")
    }

    pub async fn qstat(&self, query: QstatQuery) -> anyhow::Result<QstatResponse> {
        self.client
            .get(format!("{}/qstat", self.base_url))
            .query(&query)
            .send()
            .await
            .context("failed to send qstat request")?
            .error_for_status()
            .context("lqtsd rejected qstat request")?
            .json()
            .await
            .context("failed to parse qstat response")
    }

    pub async fn qsummary(&self) -> anyhow::Result<QsummaryResponse> {
        self.client
            .get(format!("{}/qsummary", self.base_url))
            .send()
            .await
            .context("failed to send qsummary request")?
            .error_for_status()
            .context("lqtsd rejected qsummary request")?
            .json()
            .await
            .context("failed to parse qsummary response")
    }

    pub async fn get_workers(&self) -> anyhow::Result<WorkersResponse> {
        self.client
            .get(format!("{}/workers", self.base_url))
            .send()
            .await
            .context("failed to send workers request")?
            .error_for_status()
            .context("lqtsd rejected workers request")?
            .json()
            .await
            .context("failed to parse workers response")
    }

    pub async fn set_workers(&self, nworkers: u32) -> anyhow::Result<WorkersResponse> {
        self.client
            .post(format!("{}/workers", self.base_url))
            .json(&WorkersRequest { nworkers })
            .send()
            .await
            .context("failed to send set-workers request")?
            .error_for_status()
            .context("lqtsd rejected set-workers request")?
            .json()
            .await
            .context("failed to parse set-workers response")
    }

    pub async fn jobgroup(&self, group_number: u32) -> anyhow::Result<JobGroupResponse> {
        self.client
            .get(format!("{}/jobgroup", self.base_url))
            .query(&JobGroupQuery { group_number })
            .send()
            .await
            .context("failed to send jobgroup request")?
            .error_for_status()
            .context("lqtsd rejected jobgroup request")?
            .json()
            .await
            .context("failed to parse jobgroup response")
    }

    pub async fn qdel(&self, ids: Vec<String>) -> anyhow::Result<QdelResponse> {
        self.client
            .post(format!("{}/qdel", self.base_url))
            .json(&QdelRequest { ids })
            .send()
            .await
            .context("failed to send qdel request")?
            .error_for_status()
            .context("lqtsd rejected qdel request")?
            .json()
            .await
            .context("failed to parse qdel response")
    }

    pub async fn qpriority(&self, ids: Vec<String>, priority: i32) -> anyhow::Result<QpriorityResponse> {
        self.client
            .post(format!("{}/qpriority", self.base_url))
            .json(&QpriorityRequest { ids, priority })
            .send()
            .await
            .context("failed to send qpriority request")?
            .error_for_status()
            .context("lqtsd rejected qpriority request")?
            .json()
            .await
            .context("failed to parse qpriority response")
    }

    pub async fn qclear(&self, really: bool) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/qclear", self.base_url))
            .query(&ReallyQuery { really })
            .send()
            .await
            .context("failed to send qclear request")?
            .error_for_status()
            .context("lqtsd rejected qclear request")?;
        Ok(())
    }

    pub async fn clear_completed(&self, really: bool, group: Option<u32>) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/clear_completed", self.base_url))
            .query(&ClearCompletedQuery { really, group })
            .send()
            .await
            .context("failed to send clear_completed request")?
            .error_for_status()
            .context("lqtsd rejected clear_completed request")?;
        Ok(())
    }

    pub async fn resume(&self) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/resume", self.base_url))
            .send()
            .await
            .context("failed to send resume request")?
            .error_for_status()
            .context("lqtsd rejected resume request")?;
        Ok(())
    }
}
